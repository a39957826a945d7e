use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::ansi::{pad_to_width, strip_ansi, truncate_to_width, visible_width};
use crate::log_store::{self, LineFormat, LogLine, StreamKind};
use crate::ui::theme::Painter;

const EMPTY_PLACEHOLDER: &str = "(no output yet)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    Combined,
    Stdout,
    Stderr,
}

impl StreamFilter {
    pub fn next(self) -> Self {
        match self {
            StreamFilter::Combined => StreamFilter::Stdout,
            StreamFilter::Stdout => StreamFilter::Stderr,
            StreamFilter::Stderr => StreamFilter::Combined,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamFilter::Combined => "combined",
            StreamFilter::Stdout => "stdout",
            StreamFilter::Stderr => "stderr",
        }
    }

    fn keeps(self, kind: StreamKind) -> bool {
        match self {
            StreamFilter::Combined => true,
            StreamFilter::Stdout => kind == StreamKind::Stdout,
            StreamFilter::Stderr => kind == StreamKind::Stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchInfo {
    pub query: String,
    /// 1-based position of the selected match; 0 when nothing is selected.
    pub current: usize,
    pub total: usize,
}

/// Scroll/search/follow cursor over one log file for one consumer.
///
/// Every render re-reads the whole file, so the viewer is safe to use while
/// the owning process is still appending. Viewers never share state.
#[derive(Debug, Clone)]
pub struct LogFileViewer {
    path: PathBuf,
    format: LineFormat,
    painter: Painter,
    follow: bool,
    /// Absolute end (exclusive) of the visible window; `None` tracks the tail.
    anchor_end: Option<usize>,
    stream_filter: StreamFilter,
    search_query: String,
    search_matches: Vec<usize>,
    current_match: Option<usize>,
    /// Line to center on the next render.
    center_target: Option<usize>,
    last_window: usize,
}

impl LogFileViewer {
    pub fn new(path: impl Into<PathBuf>, format: LineFormat) -> Self {
        Self {
            path: path.into(),
            format,
            painter: Painter::plain(),
            follow: false,
            anchor_end: None,
            stream_filter: StreamFilter::Combined,
            search_query: String::new(),
            search_matches: Vec::new(),
            current_match: None,
            center_target: None,
            last_window: 0,
        }
    }

    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn with_painter(mut self, painter: Painter) -> Self {
        self.painter = painter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn filtered_lines(&self) -> Vec<LogLine> {
        let mut lines = log_store::read_lines(&self.path, self.format);
        if self.stream_filter != StreamFilter::Combined {
            lines.retain(|line| self.stream_filter.keeps(line.kind));
        }
        lines
    }

    fn compute_matches(&self, lines: &[LogLine]) -> Vec<usize> {
        if self.search_query.is_empty() {
            return Vec::new();
        }
        let needle = self.search_query.to_lowercase();
        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| strip_ansi(&line.text).to_lowercase().contains(&needle))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Window end actually shown for `raw_end`: a frozen end smaller than one
    /// window still shows a full window from the top.
    fn effective_end(&self, raw_end: usize, total: usize, window: usize) -> usize {
        total.min(raw_end.max(window.min(total)))
    }

    pub fn scroll_to_top(&mut self) {
        self.anchor_end = Some(0);
        self.center_target = None;
        self.follow = false;
    }

    /// Jumps to the current tail. A following view keeps following; a frozen
    /// view freezes at the new tail.
    pub fn scroll_to_bottom(&mut self) {
        self.center_target = None;
        if self.follow {
            self.anchor_end = None;
            return;
        }
        self.anchor_end = Some(self.filtered_lines().len());
    }

    /// Moves the window by `delta` lines; positive scrolls toward older output.
    pub fn scroll_by(&mut self, delta: isize) {
        let total = self.filtered_lines().len();
        let raw_end = self.anchor_end.unwrap_or(total);
        let current = self.effective_end(raw_end, total, self.last_window);
        let moved = if delta >= 0 {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current.saturating_add(delta.unsigned_abs())
        };
        self.anchor_end = Some(moved.min(total));
        self.center_target = None;
        self.follow = false;
    }

    pub fn toggle_follow(&mut self) -> bool {
        self.follow = !self.follow;
        self.center_target = None;
        self.anchor_end = if self.follow {
            None
        } else {
            Some(self.filtered_lines().len())
        };
        self.follow
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn cycle_stream_filter(&mut self) -> StreamFilter {
        self.stream_filter = self.stream_filter.next();
        self.search_matches.clear();
        self.current_match = None;
        self.center_target = None;
        if !self.follow {
            self.anchor_end = Some(self.filtered_lines().len());
        }
        self.stream_filter
    }

    pub fn stream_filter(&self) -> StreamFilter {
        self.stream_filter
    }

    /// Case-insensitive substring search; selects the match nearest the tail.
    pub fn set_search(&mut self, query: &str) {
        if query.is_empty() {
            self.clear_search();
            return;
        }
        self.search_query = query.to_owned();
        let lines = self.filtered_lines();
        self.search_matches = self.compute_matches(&lines);
        self.current_match = self.search_matches.len().checked_sub(1);
        if let Some(current) = self.current_match {
            self.jump_to_line(self.search_matches[current]);
        }
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.search_matches.clear();
        self.current_match = None;
    }

    fn jump_to_line(&mut self, line: usize) {
        self.center_target = Some(line);
        self.follow = false;
    }

    pub fn next_match(&mut self) {
        let count = self.search_matches.len();
        if count == 0 {
            return;
        }
        let next = self.current_match.map_or(0, |current| (current + 1) % count);
        self.current_match = Some(next);
        self.jump_to_line(self.search_matches[next]);
    }

    pub fn prev_match(&mut self) {
        let count = self.search_matches.len();
        if count == 0 {
            return;
        }
        let prev = self
            .current_match
            .map_or(count - 1, |current| (current + count - 1) % count);
        self.current_match = Some(prev);
        self.jump_to_line(self.search_matches[prev]);
    }

    pub fn search_info(&self) -> Option<SearchInfo> {
        if self.search_query.is_empty() {
            return None;
        }
        Some(SearchInfo {
            query: self.search_query.clone(),
            current: self.current_match.map_or(0, |current| current + 1),
            total: self.search_matches.len(),
        })
    }

    /// Line index of the selected match within the filtered set.
    pub fn current_match_line(&self) -> Option<usize> {
        self.current_match
            .and_then(|current| self.search_matches.get(current).copied())
    }

    /// Renders at most `max_lines` lines, each cut to `width` columns.
    pub fn render_lines(&mut self, width: usize, max_lines: usize) -> Vec<String> {
        if max_lines == 0 {
            return Vec::new();
        }
        self.last_window = max_lines;
        let lines = self.filtered_lines();

        if !self.search_query.is_empty() {
            self.search_matches = self.compute_matches(&lines);
            let count = self.search_matches.len();
            self.current_match = match self.current_match {
                Some(current) if current >= count => count.checked_sub(1),
                other => other,
            };
        }

        let total = lines.len();
        if total == 0 {
            return vec![self.painter.muted(&truncate_to_width(EMPTY_PLACEHOLDER, width))];
        }

        if let Some(target) = self.center_target.take() {
            self.anchor_end = Some(total.min(target + max_lines / 2 + 1));
        }
        if !self.follow && self.anchor_end.is_none() {
            self.anchor_end = Some(total);
        }

        let raw_end = self.anchor_end.unwrap_or(total);
        let end = self.effective_end(raw_end, total, max_lines);
        let start = end.saturating_sub(max_lines);

        let current = self.current_match_line();
        let matches = self.search_matches.iter().copied().collect::<HashSet<usize>>();

        lines[start..end]
            .iter()
            .enumerate()
            .map(|(offset, line)| {
                let idx = start + offset;
                let text = truncate_to_width(&strip_ansi(&line.text), width);
                if Some(idx) == current {
                    self.painter.highlight(&text)
                } else if matches.contains(&idx) || line.kind == StreamKind::Stderr {
                    self.painter.warning(&text)
                } else {
                    text
                }
            })
            .collect()
    }

    /// One line of exactly `width` visible columns: search state on the left,
    /// position and active filter on the right.
    pub fn render_status_bar(&self, width: usize) -> String {
        let total = self.filtered_lines().len();
        let painter = &self.painter;

        let mut right_parts = Vec::<String>::new();
        if self.follow {
            right_parts.push(painter.accent("following"));
        } else if total == 0 {
            right_parts.push(painter.muted("empty"));
        } else {
            let raw_end = self.anchor_end.unwrap_or(total);
            let end = self.effective_end(raw_end, total, self.last_window);
            let pct = (end * 100 + total / 2) / total;
            right_parts.push(painter.muted(&format!("{pct}%  L{end}/{total}")));
        }
        if self.stream_filter != StreamFilter::Combined {
            right_parts.push(painter.muted(&format!("[{}]", self.stream_filter.label())));
        }
        let right = right_parts.join("  ");

        let left = match self.search_info() {
            None => String::new(),
            Some(info) if info.total == 0 => {
                painter.error(&format!("no matches: \"{}\"", info.query))
            }
            Some(info) => format!(
                "{}{}  {}",
                painter.muted("/"),
                info.query,
                painter.muted(&format!("{}/{}", info.current, info.total))
            ),
        };

        let gap = width
            .saturating_sub(visible_width(&left) + visible_width(&right))
            .max(1);
        let bar = format!("{left}{}{right}", " ".repeat(gap));
        pad_to_width(&truncate_to_width(&bar, width), width)
    }
}

#[cfg(test)]
#[path = "tests/viewer_tests.rs"]
mod tests;

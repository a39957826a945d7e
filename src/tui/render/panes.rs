use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::process_manager::ProcessRecord;

use super::super::terminal_text::ansi_line;
use super::header::panel_block;

fn pane_title(focused: Option<&ProcessRecord>) -> String {
    match focused {
        Some(record) => format!(" {} ({}) {} ", record.name, record.id, record.status),
        None => " no process focused ".to_owned(),
    }
}

/// Log pane for the focused process. `log_lines` are already windowed and
/// clipped by the viewer, so they are drawn as-is.
pub(super) fn render_output_pane(
    frame: &mut Frame<'_>,
    area: Rect,
    focused: Option<&ProcessRecord>,
    log_lines: &[String],
) {
    let title = pane_title(focused);
    let border = if focused.is_some_and(ProcessRecord::is_live) {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let lines = if focused.is_some() {
        log_lines
            .iter()
            .map(|line| ansi_line(line, Style::default()))
            .collect::<Vec<Line>>()
    } else {
        vec![Line::styled(
            "press l / h to focus a process",
            Style::default().fg(Color::DarkGray),
        )]
    };
    let pane = Paragraph::new(lines).block(panel_block(Some(&title), false, border));
    frame.render_widget(pane, area);
}

use std::collections::HashMap;

use crate::log_store::LineFormat;
use crate::notify::Notification;
use crate::process_manager::ProcessRecord;
use crate::ui::theme::Painter;
use crate::viewer::LogFileViewer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum InputMode {
    Command,
    /// Typing a search query for the focused viewer.
    Search(String),
    /// Typing a line for the focused process's stdin.
    Insert(String),
}

pub(super) struct SessionState {
    pub(super) viewers: HashMap<String, LogFileViewer>,
    pub(super) input_mode: InputMode,
    pub(super) notice: Option<Notification>,
    pub(super) show_help: bool,
    follow_default: bool,
}

impl SessionState {
    pub(super) fn new(follow_default: bool) -> Self {
        Self {
            viewers: HashMap::new(),
            input_mode: InputMode::Command,
            notice: None,
            show_help: false,
            follow_default,
        }
    }

    /// Viewer for `record`, created on first use so each process keeps its own
    /// scroll and search position.
    pub(super) fn viewer_for(&mut self, record: &ProcessRecord) -> &mut LogFileViewer {
        let follow = self.follow_default;
        self.viewers.entry(record.id.clone()).or_insert_with(|| {
            LogFileViewer::new(&record.log_files.combined_file, LineFormat::Combined)
                .with_follow(follow)
                .with_painter(Painter::new(true))
        })
    }

    /// Drops viewers whose process is no longer registered.
    pub(super) fn retain_viewers(&mut self, records: &[ProcessRecord]) {
        self.viewers
            .retain(|id, _| records.iter().any(|record| &record.id == id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::LogFiles;
    use crate::process_manager::{NotifyPrefs, ProcessStatus};
    use std::path::{Path, PathBuf};
    use std::time::SystemTime;

    fn record(id: &str) -> ProcessRecord {
        ProcessRecord {
            id: id.to_owned(),
            name: id.to_owned(),
            pid: None,
            command: "true".to_owned(),
            cwd: PathBuf::from("/tmp"),
            start_time: SystemTime::now(),
            end_time: None,
            status: ProcessStatus::Running,
            exit_code: None,
            success: None,
            log_files: LogFiles::for_process(Path::new("/tmp/procdock-state"), id),
            notify: NotifyPrefs::default(),
        }
    }

    #[test]
    fn viewers_are_created_once_per_process_and_pruned() {
        let mut state = SessionState::new(true);
        let first = record("proc_1");
        let second = record("proc_2");

        state.viewer_for(&first).scroll_to_top();
        assert!(!state.viewer_for(&first).is_following());
        assert!(state.viewer_for(&second).is_following());
        assert_eq!(state.viewers.len(), 2);

        state.retain_viewers(&[second]);
        assert_eq!(state.viewers.len(), 1);
        assert!(state.viewers.contains_key("proc_2"));
    }

    #[test]
    fn new_viewers_take_the_configured_follow_default() {
        let mut state = SessionState::new(false);
        assert!(!state.viewer_for(&record("proc_1")).is_following());
    }
}

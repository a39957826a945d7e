use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::process_manager::{ProcessRecord, ProcessStatus};
use crate::ui::theme::Painter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub process_id: String,
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn render(&self, painter: &Painter) -> String {
        match self.level {
            NotificationLevel::Info => painter.success(&self.message),
            NotificationLevel::Warning => painter.warning(&self.message),
            NotificationLevel::Error => painter.error(&self.message),
        }
    }
}

/// `Ns`, `Mm Ss`, or `Hh Mm`; sub-second remainders are dropped.
pub fn format_runtime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Message for a process that just ended, or `None` when the record is still
/// live or its preferences mute this kind of ending.
pub fn end_notification(record: &ProcessRecord, now: SystemTime) -> Option<Notification> {
    if record.is_live() {
        return None;
    }
    let runtime = format_runtime(record.runtime(now));
    let prefs = record.notify;
    let (level, message) = if record.status == ProcessStatus::Killed {
        if !prefs.notify_on_kill {
            return None;
        }
        (
            NotificationLevel::Warning,
            format!("Process '{}' was terminated ({runtime})", record.name),
        )
    } else if record.success == Some(true) {
        if !prefs.notify_on_success {
            return None;
        }
        (
            NotificationLevel::Info,
            format!("Process '{}' completed successfully ({runtime})", record.name),
        )
    } else {
        if !prefs.notify_on_failure {
            return None;
        }
        let code = record
            .exit_code
            .map_or_else(|| "?".to_owned(), |code| code.to_string());
        (
            NotificationLevel::Error,
            format!(
                "Process '{}' crashed with exit code {code} ({runtime})",
                record.name
            ),
        )
    };
    Some(Notification {
        process_id: record.id.clone(),
        level,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::LogFiles;
    use crate::process_manager::NotifyPrefs;
    use std::path::{Path, PathBuf};

    fn record(status: ProcessStatus, exit_code: Option<i32>, notify: NotifyPrefs) -> ProcessRecord {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        ProcessRecord {
            id: "proc_7".to_owned(),
            name: "tests".to_owned(),
            pid: Some(4242),
            command: "cargo test".to_owned(),
            cwd: PathBuf::from("/tmp"),
            start_time: start,
            end_time: status.is_terminal().then(|| start + Duration::from_secs(75)),
            status,
            exit_code,
            success: status.is_terminal().then_some(exit_code == Some(0)),
            log_files: LogFiles::for_process(Path::new("/tmp/logs"), "proc_7"),
            notify,
        }
    }

    fn all_enabled() -> NotifyPrefs {
        NotifyPrefs {
            notify_on_success: true,
            notify_on_failure: true,
            notify_on_kill: true,
        }
    }

    #[test]
    fn runtime_formats_by_magnitude() {
        assert_eq!(format_runtime(Duration::from_millis(999)), "0s");
        assert_eq!(format_runtime(Duration::from_secs(42)), "42s");
        assert_eq!(format_runtime(Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_runtime(Duration::from_secs(3_600 + 125)), "1h 2m");
    }

    #[test]
    fn defaults_only_report_failures() {
        let now = SystemTime::now();
        let ok = record(ProcessStatus::Exited, Some(0), NotifyPrefs::default());
        assert_eq!(end_notification(&ok, now), None);

        let killed = record(ProcessStatus::Killed, None, NotifyPrefs::default());
        assert_eq!(end_notification(&killed, now), None);

        let failed = record(ProcessStatus::Exited, Some(2), NotifyPrefs::default());
        let notification = end_notification(&failed, now).expect("failure notification");
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(
            notification.message,
            "Process 'tests' crashed with exit code 2 (1m 15s)"
        );
    }

    #[test]
    fn kill_and_success_messages() {
        let now = SystemTime::now();
        let killed = record(ProcessStatus::Killed, None, all_enabled());
        let notification = end_notification(&killed, now).expect("kill notification");
        assert_eq!(notification.level, NotificationLevel::Warning);
        assert_eq!(notification.message, "Process 'tests' was terminated (1m 15s)");

        let ok = record(ProcessStatus::Exited, Some(0), all_enabled());
        let notification = end_notification(&ok, now).expect("success notification");
        assert_eq!(notification.level, NotificationLevel::Info);
        assert_eq!(
            notification.message,
            "Process 'tests' completed successfully (1m 15s)"
        );
    }

    #[test]
    fn unknown_exit_code_and_live_records() {
        let now = SystemTime::now();
        let odd = record(ProcessStatus::Exited, None, all_enabled());
        let notification = end_notification(&odd, now).expect("notification");
        assert!(notification.message.contains("exit code ?"));

        let running = record(ProcessStatus::Running, None, all_enabled());
        assert_eq!(end_notification(&running, now), None);
    }
}

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::log_store::LogFiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Terminating,
    TerminateTimeout,
    Killed,
    Exited,
}

impl ProcessStatus {
    /// Running, or asked to stop but not yet reaped.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ProcessStatus::Running | ProcessStatus::Terminating | ProcessStatus::TerminateTimeout
        )
    }

    pub fn is_terminal(self) -> bool {
        !self.is_live()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Terminating => "terminating",
            ProcessStatus::TerminateTimeout => "terminate_timeout",
            ProcessStatus::Killed => "killed",
            ProcessStatus::Exited => "exited",
        }
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifyPrefs {
    pub notify_on_success: bool,
    pub notify_on_failure: bool,
    pub notify_on_kill: bool,
}

impl Default for NotifyPrefs {
    fn default() -> Self {
        Self {
            notify_on_success: false,
            notify_on_failure: true,
            notify_on_kill: false,
        }
    }
}

/// Snapshot of a managed process. The manager hands out copies only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub id: String,
    pub name: String,
    pub pid: Option<u32>,
    pub command: String,
    pub cwd: PathBuf,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
    pub status: ProcessStatus,
    pub exit_code: Option<i32>,
    pub success: Option<bool>,
    #[serde(flatten)]
    pub log_files: LogFiles,
    #[serde(flatten)]
    pub notify: NotifyPrefs,
}

impl ProcessRecord {
    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Wall time from start to end, or to `now` while still live.
    pub fn runtime(&self, now: SystemTime) -> Duration {
        let end = self.end_time.unwrap_or(now);
        end.duration_since(self.start_time).unwrap_or_default()
    }
}

use crate::ansi::{truncate_to_width, visible_width};
use crate::process_manager::{ProcessRecord, ProcessStatus};
use crate::ui::theme::Painter;

const NAME_LIMIT: usize = 20;
const SEPARATOR: &str = " | ";

fn short_name(name: &str) -> String {
    if name.chars().count() > NAME_LIMIT {
        let head = name.chars().take(NAME_LIMIT - 3).collect::<String>();
        format!("{head}...")
    } else {
        name.to_owned()
    }
}

fn format_entry(record: &ProcessRecord, painter: &Painter) -> String {
    let name = short_name(&record.name);
    match record.status {
        ProcessStatus::Running => format!("{} {}", painter.accent(&name), painter.muted("running")),
        ProcessStatus::Terminating => {
            format!("{} {}", painter.warning(&name), painter.muted("terminating"))
        }
        ProcessStatus::TerminateTimeout => format!(
            "{} {}",
            painter.error(&name),
            painter.error("terminate_timeout")
        ),
        ProcessStatus::Killed => format!("{} {}", painter.warning(&name), painter.muted("killed")),
        ProcessStatus::Exited if record.success == Some(true) => {
            format!("{} {}", painter.muted(&name), painter.success("done"))
        }
        ProcessStatus::Exited => {
            let code = record
                .exit_code
                .map_or_else(|| "?".to_owned(), |code| code.to_string());
            format!("{} {}", painter.error(&name), painter.error(&format!("exit({code})")))
        }
    }
}

/// Live processes in registry order, then finished ones, most recent first.
pub fn status_order(records: &[ProcessRecord]) -> Vec<&ProcessRecord> {
    let mut live = records.iter().filter(|record| record.is_live()).collect::<Vec<_>>();
    let mut finished = records
        .iter()
        .filter(|record| !record.is_live())
        .collect::<Vec<_>>();
    finished.sort_by(|a, b| b.end_time.cmp(&a.end_time));
    live.extend(finished);
    live
}

/// One-line summary such as `processes: api running | build done | +2 more`,
/// never wider than `max_width`. Returns `None` with no processes.
pub fn render_status_line(
    records: &[ProcessRecord],
    painter: &Painter,
    max_width: usize,
) -> Option<String> {
    let ordered = status_order(records);
    if ordered.is_empty() {
        return None;
    }

    let prefix = painter.muted("processes: ");
    let separator = painter.muted(SEPARATOR);
    let separator_width = visible_width(SEPARATOR);

    let mut parts = Vec::<String>::new();
    let mut used = visible_width(&prefix);
    for (included, record) in ordered.iter().enumerate() {
        let entry = format_entry(record, painter);
        let needed = if included > 0 {
            separator_width + visible_width(&entry)
        } else {
            visible_width(&entry)
        };
        let remaining = ordered.len() - included - 1;
        let reserved = if remaining > 0 {
            separator_width + format!("+{remaining} more").len()
        } else {
            0
        };
        if included > 0 && used + needed + reserved > max_width {
            parts.push(painter.muted(&format!("+{} more", ordered.len() - included)));
            break;
        }
        parts.push(entry);
        used += needed;
    }

    let line = format!("{prefix}{}", parts.join(&separator));
    Some(truncate_to_width(&line, max_width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::LogFiles;
    use crate::process_manager::NotifyPrefs;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, SystemTime};

    fn record(id: &str, name: &str, status: ProcessStatus, ended_at: Option<u64>) -> ProcessRecord {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        ProcessRecord {
            id: id.to_owned(),
            name: name.to_owned(),
            pid: None,
            command: name.to_owned(),
            cwd: PathBuf::from("/tmp"),
            start_time: start,
            end_time: ended_at.map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
            status,
            exit_code: ended_at.map(|_| if name.contains("fail") { 1 } else { 0 }),
            success: ended_at.map(|_| !name.contains("fail")),
            log_files: LogFiles::for_process(Path::new("/tmp"), id),
            notify: NotifyPrefs::default(),
        }
    }

    #[test]
    fn empty_registry_has_no_status() {
        assert_eq!(render_status_line(&[], &Painter::plain(), 80), None);
    }

    #[test]
    fn live_first_then_most_recently_finished() {
        let records = vec![
            record("proc_1", "old", ProcessStatus::Exited, Some(200)),
            record("proc_2", "api", ProcessStatus::Running, None),
            record("proc_3", "fail-job", ProcessStatus::Exited, Some(300)),
            record("proc_4", "web", ProcessStatus::Killed, Some(250)),
        ];
        let line = render_status_line(&records, &Painter::plain(), 200).expect("status");
        assert_eq!(
            line,
            "processes: api running | fail-job exit(1) | web killed | old done"
        );
    }

    #[test]
    fn overflow_collapses_into_more_suffix() {
        let records = (1..=6)
            .map(|n| record(&format!("proc_{n}"), &format!("server-{n}"), ProcessStatus::Running, None))
            .collect::<Vec<_>>();
        let line = render_status_line(&records, &Painter::plain(), 60).expect("status");
        assert!(visible_width(&line) <= 60, "{line:?}");
        assert!(line.starts_with("processes: server-1 running"));
        assert!(line.ends_with("more"), "{line:?}");
    }

    #[test]
    fn long_names_are_shortened() {
        let records = vec![record(
            "proc_1",
            "an-extremely-long-process-name",
            ProcessStatus::Terminating,
            None,
        )];
        let line = render_status_line(&records, &Painter::plain(), 200).expect("status");
        assert_eq!(line, "processes: an-extremely-long... terminating");
    }

    #[test]
    fn a_single_entry_is_truncated_to_the_budget() {
        let records = vec![record("proc_1", "api", ProcessStatus::TerminateTimeout, None)];
        let line = render_status_line(&records, &Painter::plain(), 20).expect("status");
        assert_eq!(visible_width(&line), 20);
    }
}

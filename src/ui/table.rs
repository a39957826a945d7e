use std::time::SystemTime;

use tabled::builder::Builder;
use tabled::settings::{Padding, Style};

use crate::notify::format_runtime;
use crate::process_manager::ProcessRecord;
use crate::ui::widgets::TableSpec;

const COMMAND_LIMIT: usize = 40;

pub fn render_table(spec: &TableSpec) -> String {
    let mut builder = Builder::default();
    if !spec.headers.is_empty() {
        builder.push_record(spec.headers.iter().map(String::as_str));
    }
    for row in &spec.rows {
        builder.push_record(row.iter().map(String::as_str));
    }
    let mut table = builder.build();
    // Keep table structure clear without heavy grid chrome.
    table.with(Style::blank());
    table.with(Padding::new(0, 2, 0, 0));
    table.to_string()
}

fn truncate_command(command: &str) -> String {
    if command.chars().count() <= COMMAND_LIMIT {
        return command.to_owned();
    }
    let head = command.chars().take(COMMAND_LIMIT - 3).collect::<String>();
    format!("{head}...")
}

/// id / name / status / exit / runtime / command rows for `records`.
pub fn process_table(records: &[ProcessRecord], now: SystemTime) -> TableSpec {
    let headers = ["id", "name", "status", "exit", "runtime", "command"]
        .into_iter()
        .map(str::to_owned)
        .collect();
    let rows = records
        .iter()
        .map(|record| {
            vec![
                record.id.clone(),
                record.name.clone(),
                record.status.to_string(),
                record
                    .exit_code
                    .map_or_else(|| "-".to_owned(), |code| code.to_string()),
                format_runtime(record.runtime(now)),
                truncate_command(&record.command),
            ]
        })
        .collect();
    TableSpec::new(headers, rows)
}

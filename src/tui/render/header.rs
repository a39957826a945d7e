use std::time::SystemTime;

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::border;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Row, Table};
use ratatui::Frame;

use crate::dock::DockState;
use crate::notify::format_runtime;
use crate::process_manager::{ProcessRecord, ProcessStatus};

fn status_style(record: &ProcessRecord) -> Style {
    match record.status {
        ProcessStatus::Running => Style::default().fg(Color::Cyan),
        ProcessStatus::Terminating | ProcessStatus::Killed => Style::default().fg(Color::Yellow),
        ProcessStatus::TerminateTimeout => Style::default().fg(Color::Red),
        ProcessStatus::Exited if record.success == Some(true) => {
            Style::default().fg(Color::Green)
        }
        ProcessStatus::Exited => Style::default().fg(Color::Red),
    }
}

fn dock_title(dock: &DockState) -> String {
    let follow = if dock.follow_enabled { "on" } else { "off" };
    format!(" PROCDOCK  dock:{}  auto:{follow} ", dock.visibility.as_str())
}

pub(super) fn render_process_table(
    frame: &mut Frame<'_>,
    area: Rect,
    records: &[ProcessRecord],
    hidden_records: usize,
    focused_id: Option<&str>,
    dock: &DockState,
) {
    let now = SystemTime::now();
    let muted = Style::default().fg(Color::DarkGray);
    let mut rows = records
        .iter()
        .map(|record| {
            let focused = focused_id == Some(record.id.as_str());
            let marker = if focused { "›" } else { " " };
            let exit = record
                .exit_code
                .map_or_else(|| "-".to_owned(), |code| code.to_string());
            let row = Row::new(vec![
                Cell::from(marker),
                Cell::from(record.id.clone()).style(muted),
                Cell::from(record.name.clone()),
                Cell::from(record.status.as_str()).style(status_style(record)),
                Cell::from(exit),
                Cell::from(format_runtime(record.runtime(now))),
                Cell::from(record.command.clone()).style(muted),
            ]);
            if focused {
                row.style(Style::default().add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect::<Vec<Row>>();
    if hidden_records > 0 {
        rows.insert(
            0,
            Row::new(vec![
                Cell::from(""),
                Cell::from(format!("+{hidden_records} more")).style(muted),
            ]),
        );
    }
    if records.is_empty() {
        rows.push(Row::new(vec![
            Cell::from(""),
            Cell::from("no processes").style(muted),
        ]));
    }

    let header = Row::new(["", "id", "name", "status", "exit", "runtime", "command"])
        .style(muted.add_modifier(Modifier::BOLD));
    let widths = [
        Constraint::Length(1),
        Constraint::Length(9),
        Constraint::Length(20),
        Constraint::Length(17),
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Fill(1),
    ];
    let title = dock_title(dock);
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(panel_block(Some(&title), true, Color::Magenta));
    frame.render_widget(table, area);
}

pub(super) fn panel_block<'a>(
    title: Option<&'a str>,
    show_version: bool,
    border_color: Color,
) -> Block<'a> {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(border_color));
    if let Some(title) = title {
        block = block.title_top(
            Line::from(Span::styled(
                title.to_owned(),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ))
            .left_aligned(),
        );
    }
    if show_version {
        let version = format!(" v{} ", env!("CARGO_PKG_VERSION"));
        block = block.title_bottom(
            Line::from(Span::styled(version, Style::default().fg(Color::LightMagenta)))
                .right_aligned(),
        );
    }
    block
}

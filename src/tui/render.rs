use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

use crate::dock::{DockState, DockVisibility};
use crate::notify::Notification;
use crate::process_manager::ProcessRecord;

use super::state::InputMode;

mod footer;
mod header;
mod help_overlay;
mod panes;

use footer::render_footer;
use header::render_process_table;
use help_overlay::render_help_overlay;
use panes::render_output_pane;

/// Everything one frame needs, gathered before `terminal.draw`.
pub(super) struct DockView<'a> {
    pub(super) records: &'a [ProcessRecord],
    pub(super) hidden_records: usize,
    pub(super) dock: &'a DockState,
    pub(super) focused: Option<&'a ProcessRecord>,
    pub(super) log_lines: &'a [String],
    pub(super) viewer_status: Option<&'a str>,
    pub(super) status_line: Option<&'a str>,
    pub(super) input_mode: &'a InputMode,
    pub(super) notice: Option<&'a Notification>,
    pub(super) show_help: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct DockLayout {
    pub(super) table: Rect,
    pub(super) logs: Option<Rect>,
    pub(super) status: Option<Rect>,
    pub(super) footer: Rect,
}

impl DockLayout {
    /// Inner size of the log pane (inside its border), if the pane is shown.
    pub(super) fn log_viewport(&self) -> Option<(usize, usize)> {
        self.logs.map(|area| {
            (
                area.width.saturating_sub(2) as usize,
                area.height.saturating_sub(2) as usize,
            )
        })
    }
}

/// Splits the screen: process table, log pane sized by dock visibility, the
/// optional one-line status summary, and a two-line footer. A collapsed dock
/// shows a fixed preview; an open dock gives the log pane the spare rows.
pub(super) fn dock_layout(
    area: Rect,
    visibility: DockVisibility,
    table_rows: usize,
    preview_lines: usize,
    show_status: bool,
) -> DockLayout {
    let table_height = (table_rows.max(1) + 3).min(u16::MAX as usize) as u16;
    let preview_height = (preview_lines + 2).min(u16::MAX as usize) as u16;
    let (table, logs) = match visibility {
        DockVisibility::Hidden => (Constraint::Fill(1), Constraint::Length(0)),
        DockVisibility::Collapsed => (Constraint::Fill(1), Constraint::Length(preview_height)),
        DockVisibility::Open => (Constraint::Length(table_height), Constraint::Fill(1)),
    };
    let status = Constraint::Length(u16::from(show_status));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([table, logs, status, Constraint::Length(2)])
        .split(area);

    DockLayout {
        table: chunks[0],
        logs: (visibility != DockVisibility::Hidden && chunks[1].height > 0).then_some(chunks[1]),
        status: (show_status && chunks[2].height > 0).then_some(chunks[2]),
        footer: chunks[3],
    }
}

pub(super) fn render_ui(frame: &mut Frame<'_>, layout: &DockLayout, view: &DockView<'_>) {
    render_process_table(
        frame,
        layout.table,
        view.records,
        view.hidden_records,
        view.focused.map(|record| record.id.as_str()),
        view.dock,
    );

    if let Some(area) = layout.logs {
        if view.show_help {
            render_help_overlay(frame, area);
        } else {
            render_output_pane(frame, area, view.focused, view.log_lines);
        }
    }

    if let (Some(area), Some(status)) = (layout.status, view.status_line) {
        frame.render_widget(super::terminal_text::ansi_line(status, Default::default()), area);
    }

    render_footer(
        frame,
        layout.footer,
        view.viewer_status,
        view.input_mode,
        view.notice,
    );
}

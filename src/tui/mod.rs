use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use tracing::debug;

use crate::config::ProcessesConfig;
use crate::dock::{self, DockStateManager};
use crate::process_manager::{ProcessEvent, ProcessManager, ProcessRecord};
use crate::status::render_status_line;
use crate::ui::theme::Painter;
use crate::ui::{SummaryCounts, UiError};

mod events;
mod lifecycle;
mod render;
mod state;
mod terminal_text;

use events::{drain_process_events, handle_key_event, LoopControl};
use lifecycle::{init_terminal, restore_terminal, shutdown_and_render_summary, TuiTerminal};
use render::{dock_layout, render_ui, DockView};
use state::SessionState;

const SHUTDOWN_MARGIN: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum DockTuiError {
    Io(io::Error),
    Ui(UiError),
}

impl std::fmt::Display for DockTuiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DockTuiError::Io(err) => write!(f, "{err}"),
            DockTuiError::Ui(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DockTuiError {}

impl From<io::Error> for DockTuiError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<UiError> for DockTuiError {
    fn from(value: UiError) -> Self {
        Self::Ui(value)
    }
}

/// Interactive dock over `manager`. Returns once the user quits and every
/// managed process has been stopped; the final table is printed to stdout.
pub fn run_dock_tui(
    manager: Arc<ProcessManager>,
    dock: Arc<DockStateManager>,
    config: &ProcessesConfig,
) -> Result<SummaryCounts, DockTuiError> {
    let (sender, receiver) = mpsc::channel::<ProcessEvent>();
    let forward = manager.on_event(move |event| {
        let _ = sender.send(event.clone());
    });
    let auto = dock::attach(&manager, Arc::clone(&dock));

    let mut terminal = init_terminal()?;
    let mut state = SessionState::new(config.follow_enabled);
    let outcome = event_loop(&mut terminal, &manager, &dock, config, &receiver, &mut state);

    forward.unsubscribe();
    auto.unsubscribe();

    if let Err(err) = outcome {
        let _ = restore_terminal(&mut terminal);
        manager.kill_all();
        return Err(err);
    }
    let grace = config.term_timeout + config.kill_timeout + SHUTDOWN_MARGIN;
    shutdown_and_render_summary(&mut terminal, &manager, grace)
}

fn event_loop(
    terminal: &mut TuiTerminal,
    manager: &ProcessManager,
    dock: &DockStateManager,
    config: &ProcessesConfig,
    receiver: &Receiver<ProcessEvent>,
    state: &mut SessionState,
) -> Result<(), DockTuiError> {
    loop {
        drain_process_events(receiver, state);
        let records = manager.list();
        let dock_state = dock.get_state();
        let focused = dock_state
            .focused_process_id
            .as_deref()
            .and_then(|id| records.iter().find(|record| record.id == id))
            .cloned();
        let visible_from = records.len().saturating_sub(config.max_visible_processes);

        terminal.draw(|frame| {
            let visible = &records[visible_from..];
            let layout = dock_layout(
                frame.area(),
                dock_state.visibility,
                visible.len(),
                config.max_preview_lines,
                config.show_status_widget,
            );
            let (log_lines, viewer_status) =
                viewer_frame(state, focused.as_ref(), layout.log_viewport());
            let status_line = if config.show_status_widget {
                render_status_line(&records, &Painter::new(true), frame.area().width as usize)
            } else {
                None
            };
            let view = DockView {
                records: visible,
                hidden_records: visible_from,
                dock: &dock_state,
                focused: focused.as_ref(),
                log_lines: &log_lines,
                viewer_status: viewer_status.as_deref(),
                status_line: status_line.as_deref(),
                input_mode: &state.input_mode,
                notice: state.notice.as_ref(),
                show_help: state.show_help,
            };
            render_ui(frame, &layout, &view);
        })?;

        if !event::poll(config.poll_interval)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if handle_key_event(&key, manager, dock, state) == LoopControl::Quit {
                debug!("dock session closed by user");
                return Ok(());
            }
        }
    }
}

fn viewer_frame(
    state: &mut SessionState,
    focused: Option<&ProcessRecord>,
    viewport: Option<(usize, usize)>,
) -> (Vec<String>, Option<String>) {
    match (focused, viewport) {
        (Some(record), Some((width, height))) => {
            let viewer = state.viewer_for(record);
            let lines = viewer.render_lines(width, height);
            let status = viewer.render_status_bar(width);
            (lines, Some(status))
        }
        _ => (Vec::new(), None),
    }
}

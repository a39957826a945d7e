use std::sync::mpsc::Receiver;
use std::time::SystemTime;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::dock::{DockStateManager, FocusDirection};
use crate::notify::{end_notification, Notification, NotificationLevel};
use crate::process_manager::{KillOptions, KillOutcome, ProcessEvent, ProcessManager, ProcessRecord};

use super::state::{InputMode, SessionState};

const SCROLL_PAGE: isize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LoopControl {
    Continue,
    Quit,
}

/// Turns queued lifecycle events into the footer notice.
pub(super) fn drain_process_events(events: &Receiver<ProcessEvent>, state: &mut SessionState) {
    let now = SystemTime::now();
    while let Ok(event) = events.try_recv() {
        if let ProcessEvent::ProcessEnded { info } = &event {
            if let Some(notification) = end_notification(info, now) {
                state.notice = Some(notification);
            }
        }
    }
}

fn focused_record(manager: &ProcessManager, dock: &DockStateManager) -> Option<ProcessRecord> {
    dock.get_state()
        .focused_process_id
        .and_then(|id| manager.get(&id))
}

fn notice(state: &mut SessionState, process_id: &str, level: NotificationLevel, message: String) {
    state.notice = Some(Notification {
        process_id: process_id.to_owned(),
        level,
        message,
    });
}

pub(super) fn handle_key_event(
    key: &KeyEvent,
    manager: &ProcessManager,
    dock: &DockStateManager,
    state: &mut SessionState,
) -> LoopControl {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        return LoopControl::Quit;
    }

    let focused = focused_record(manager, dock);
    match std::mem::replace(&mut state.input_mode, InputMode::Command) {
        InputMode::Search(mut query) => {
            match key.code {
                KeyCode::Enter => {
                    if let Some(record) = &focused {
                        state.viewer_for(record).set_search(&query);
                    }
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    query.pop();
                    state.input_mode = InputMode::Search(query);
                }
                KeyCode::Char(c) => {
                    query.push(c);
                    state.input_mode = InputMode::Search(query);
                }
                _ => state.input_mode = InputMode::Search(query),
            }
            return LoopControl::Continue;
        }
        InputMode::Insert(mut line) => {
            match key.code {
                KeyCode::Enter => {
                    if let Some(record) = &focused {
                        line.push('\n');
                        if let Err(err) = manager.write_to_stdin(&record.id, line.as_bytes(), false) {
                            notice(
                                state,
                                &record.id,
                                NotificationLevel::Error,
                                format!("stdin write failed: {}", err.reason()),
                            );
                        }
                    }
                }
                KeyCode::Esc => {}
                KeyCode::Backspace => {
                    line.pop();
                    state.input_mode = InputMode::Insert(line);
                }
                KeyCode::Char(c) => {
                    line.push(c);
                    state.input_mode = InputMode::Insert(line);
                }
                _ => state.input_mode = InputMode::Insert(line),
            }
            return LoopControl::Continue;
        }
        InputMode::Command => {}
    }

    match key.code {
        KeyCode::Char('q') => return LoopControl::Quit,
        KeyCode::Char('?') => state.show_help = !state.show_help,
        KeyCode::Esc => state.show_help = false,
        KeyCode::Char('h') | KeyCode::Left => cycle(manager, dock, FocusDirection::Prev),
        KeyCode::Char('l') | KeyCode::Right => cycle(manager, dock, FocusDirection::Next),
        KeyCode::Char('v') => dock.toggle_visibility(),
        KeyCode::Char('F') => dock.toggle_follow(),
        KeyCode::Char('c') => {
            let removed = manager.clear_finished();
            let records = manager.list();
            state.retain_viewers(&records);
            if focused.is_some() && focused_record(manager, dock).is_none() {
                dock.set_focus(None);
            }
            debug!(removed, "cleared finished processes");
        }
        _ => {
            if let Some(record) = focused {
                handle_viewer_key(key, manager, &record, state);
            }
        }
    }
    LoopControl::Continue
}

fn cycle(manager: &ProcessManager, dock: &DockStateManager, direction: FocusDirection) {
    let ids = manager
        .list()
        .into_iter()
        .map(|record| record.id)
        .collect::<Vec<String>>();
    dock.cycle_focus(&ids, direction);
}

fn handle_viewer_key(
    key: &KeyEvent,
    manager: &ProcessManager,
    record: &ProcessRecord,
    state: &mut SessionState,
) {
    match key.code {
        KeyCode::Char('x') => match manager.kill(&record.id, KillOptions::default()) {
            Ok(KillOutcome::Signalled) => notice(
                state,
                &record.id,
                NotificationLevel::Warning,
                format!("Stopping '{}' (press x again to force)", record.name),
            ),
            Ok(KillOutcome::Escalated) => notice(
                state,
                &record.id,
                NotificationLevel::Warning,
                format!("Force killing '{}'", record.name),
            ),
            Ok(KillOutcome::AlreadyFinished) => {}
            Err(err) => notice(
                state,
                &record.id,
                NotificationLevel::Error,
                format!("kill failed: {}", err.reason()),
            ),
        },
        KeyCode::Char('/') => state.input_mode = InputMode::Search(String::new()),
        KeyCode::Char('i') if record.is_live() => state.input_mode = InputMode::Insert(String::new()),
        _ => {
            let viewer = state.viewer_for(record);
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => viewer.scroll_by(-1),
                KeyCode::Char('k') | KeyCode::Up => viewer.scroll_by(1),
                KeyCode::PageDown => viewer.scroll_by(-SCROLL_PAGE),
                KeyCode::PageUp => viewer.scroll_by(SCROLL_PAGE),
                KeyCode::Char('g') | KeyCode::Home => viewer.scroll_to_top(),
                KeyCode::Char('G') | KeyCode::End => viewer.scroll_to_bottom(),
                KeyCode::Char('f') => {
                    viewer.toggle_follow();
                }
                KeyCode::Char('s') => {
                    viewer.cycle_stream_filter();
                }
                KeyCode::Char('n') => viewer.next_match(),
                KeyCode::Char('N') => viewer.prev_match(),
                _ => {}
            }
        }
    }
}

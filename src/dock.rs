use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tracing::{debug, warn};

use crate::process_manager::{ProcessEvent, ProcessManager, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DockVisibility {
    Hidden,
    Collapsed,
    Open,
}

impl DockVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            DockVisibility::Hidden => "hidden",
            DockVisibility::Collapsed => "collapsed",
            DockVisibility::Open => "open",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DockState {
    pub visibility: DockVisibility,
    pub follow_enabled: bool,
    pub focused_process_id: Option<String>,
}

/// Partial update for [`DockStateManager::set_state`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockUpdate {
    pub visibility: Option<DockVisibility>,
    pub follow_enabled: Option<bool>,
    pub focused_process_id: Option<Option<String>>,
}

impl DockUpdate {
    pub fn visibility(visibility: DockVisibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }

    pub fn follow_enabled(follow_enabled: bool) -> Self {
        Self {
            follow_enabled: Some(follow_enabled),
            ..Self::default()
        }
    }

    pub fn focus(process_id: Option<String>) -> Self {
        Self {
            focused_process_id: Some(process_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Next,
    Prev,
}

type DockListener = Arc<dyn Fn(&DockState) + Send + Sync>;

#[derive(Default)]
struct DockListeners {
    next_id: u64,
    entries: Vec<(u64, DockListener)>,
}

/// Handle returned by [`DockStateManager::subscribe`].
#[must_use = "dropping a DockSubscription keeps the listener registered; call unsubscribe to remove it"]
pub struct DockSubscription {
    id: u64,
    listeners: Weak<Mutex<DockListeners>>,
}

impl DockSubscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Visibility, follow mode and focus of the dock.
///
/// Every mutating call notifies subscribers at most once, and only when a
/// field actually changed. Listeners run outside the state lock.
pub struct DockStateManager {
    state: Mutex<DockState>,
    listeners: Arc<Mutex<DockListeners>>,
}

impl DockStateManager {
    pub fn new(follow_enabled: bool) -> Self {
        Self {
            state: Mutex::new(DockState {
                visibility: DockVisibility::Hidden,
                follow_enabled,
                focused_process_id: None,
            }),
            listeners: Arc::new(Mutex::new(DockListeners::default())),
        }
    }

    pub fn get_state(&self) -> DockState {
        lock(&self.state).clone()
    }

    pub fn set_state(&self, update: DockUpdate) {
        self.mutate(|_| update);
    }

    /// Registers `listener` and calls it right away with the current state.
    pub fn subscribe<F>(&self, listener: F) -> DockSubscription
    where
        F: Fn(&DockState) + Send + Sync + 'static,
    {
        let listener: DockListener = Arc::new(listener);
        let id = {
            let mut listeners = lock(&self.listeners);
            listeners.next_id += 1;
            let id = listeners.next_id;
            listeners.entries.push((id, listener.clone()));
            id
        };
        call_isolated(&listener, &self.get_state());
        DockSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// hidden -> collapsed -> open -> collapsed
    pub fn toggle_visibility(&self) {
        self.mutate(|state| {
            DockUpdate::visibility(match state.visibility {
                DockVisibility::Hidden => DockVisibility::Collapsed,
                DockVisibility::Collapsed => DockVisibility::Open,
                DockVisibility::Open => DockVisibility::Collapsed,
            })
        });
    }

    pub fn expand(&self) {
        self.set_state(DockUpdate::visibility(DockVisibility::Open));
    }

    pub fn collapse(&self) {
        self.set_state(DockUpdate::visibility(DockVisibility::Collapsed));
    }

    pub fn hide(&self) {
        self.set_state(DockUpdate::visibility(DockVisibility::Hidden));
    }

    pub fn toggle_follow(&self) {
        self.mutate(|state| DockUpdate::follow_enabled(!state.follow_enabled));
    }

    /// Focusing a process opens the dock; clearing focus keeps visibility.
    pub fn set_focus(&self, process_id: Option<&str>) {
        self.mutate(|_| focus_update(process_id));
    }

    pub fn cycle_focus<S>(&self, process_ids: &[S], direction: FocusDirection)
    where
        S: AsRef<str>,
    {
        if process_ids.is_empty() {
            return;
        }
        self.mutate(|state| {
            let ids = process_ids.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
            let count = ids.len();
            let position = state
                .focused_process_id
                .as_deref()
                .and_then(|current| ids.iter().position(|id| *id == current));
            let target = match (position, direction) {
                (None, FocusDirection::Next) => 0,
                (None, FocusDirection::Prev) => count - 1,
                (Some(idx), FocusDirection::Next) => (idx + 1) % count,
                (Some(idx), FocusDirection::Prev) => (idx + count - 1) % count,
            };
            focus_update(Some(ids[target]))
        });
    }

    /// hidden -> collapsed when follow is on; used when a process starts.
    pub fn auto_show(&self) {
        self.mutate(|state| {
            if state.follow_enabled && state.visibility == DockVisibility::Hidden {
                DockUpdate::visibility(DockVisibility::Collapsed)
            } else {
                DockUpdate::default()
            }
        });
    }

    /// Hides the dock when follow is on; used when the last live process ends.
    pub fn auto_hide(&self) {
        self.mutate(|state| {
            if state.follow_enabled && state.visibility != DockVisibility::Hidden {
                DockUpdate::visibility(DockVisibility::Hidden)
            } else {
                DockUpdate::default()
            }
        });
    }

    /// Clears focus when `process_id` was focused. Returns whether state changed.
    pub fn handle_process_exit(&self, process_id: &str) -> bool {
        self.mutate(|state| {
            if state.focused_process_id.as_deref() == Some(process_id) {
                DockUpdate::focus(None)
            } else {
                DockUpdate::default()
            }
        })
    }

    fn mutate<F>(&self, decide: F) -> bool
    where
        F: FnOnce(&DockState) -> DockUpdate,
    {
        let snapshot = {
            let mut state = lock(&self.state);
            let update = decide(&state);
            if !apply(&mut state, update) {
                return false;
            }
            state.clone()
        };
        debug!(
            visibility = snapshot.visibility.as_str(),
            follow = snapshot.follow_enabled,
            focus = snapshot.focused_process_id.as_deref().unwrap_or("-"),
            "dock state changed"
        );
        self.notify(&snapshot);
        true
    }

    fn notify(&self, state: &DockState) {
        let snapshot = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<DockListener>>();
        for listener in snapshot {
            call_isolated(&listener, state);
        }
    }
}

impl Default for DockStateManager {
    fn default() -> Self {
        Self::new(true)
    }
}

fn focus_update(process_id: Option<&str>) -> DockUpdate {
    DockUpdate {
        visibility: process_id.map(|_| DockVisibility::Open),
        focused_process_id: Some(process_id.map(str::to_owned)),
        ..DockUpdate::default()
    }
}

fn apply(state: &mut DockState, update: DockUpdate) -> bool {
    let mut changed = false;
    if let Some(visibility) = update.visibility.filter(|value| *value != state.visibility) {
        state.visibility = visibility;
        changed = true;
    }
    if let Some(follow) = update
        .follow_enabled
        .filter(|value| *value != state.follow_enabled)
    {
        state.follow_enabled = follow;
        changed = true;
    }
    if let Some(focus) = update
        .focused_process_id
        .filter(|value| *value != state.focused_process_id)
    {
        state.focused_process_id = focus;
        changed = true;
    }
    changed
}

fn call_isolated(listener: &DockListener, state: &DockState) {
    if catch_unwind(AssertUnwindSafe(|| listener(state))).is_err() {
        warn!("dock state listener panicked");
    }
}

/// Applies manager lifecycle events to a dock.
///
/// Started and ended events arrive on different threads. The live set and the
/// show/hide decision share one lock, so a start that lands while the last
/// process is ending still leaves the dock visible.
struct LifecycleDriver {
    dock: Arc<DockStateManager>,
    live: Mutex<HashSet<String>>,
}

impl LifecycleDriver {
    fn new(dock: Arc<DockStateManager>) -> Self {
        Self {
            dock,
            live: Mutex::new(HashSet::new()),
        }
    }

    /// Subscribes to `manager` and records its live processes as one step:
    /// events raised meanwhile wait for the seed, so an end is never undone.
    fn subscribe_seeded(self: &Arc<Self>, manager: &ProcessManager) -> Subscription {
        let mut live = lock(&self.live);
        let handler = Arc::clone(self);
        let subscription = manager.on_event(move |event| handler.handle(event));
        live.extend(
            manager
                .list()
                .into_iter()
                .filter(|record| record.is_live())
                .map(|record| record.id),
        );
        subscription
    }

    fn handle(&self, event: &ProcessEvent) {
        let mut live = lock(&self.live);
        match event {
            ProcessEvent::ProcessStarted { info } => {
                live.insert(info.id.clone());
                self.dock.auto_show();
            }
            ProcessEvent::ProcessEnded { info } => {
                live.remove(&info.id);
                self.dock.handle_process_exit(&info.id);
                if live.is_empty() {
                    self.dock.auto_hide();
                }
            }
        }
    }
}

/// Drives `dock` from `manager` lifecycle events: a start shows the dock, an
/// end clears focus on that process and hides the dock once nothing is live.
/// Dock listeners run inside the event handler and must not start processes
/// on `manager`.
pub fn attach(manager: &ProcessManager, dock: Arc<DockStateManager>) -> Subscription {
    Arc::new(LifecycleDriver::new(dock)).subscribe_seeded(manager)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/dock_tests.rs"]
mod tests;

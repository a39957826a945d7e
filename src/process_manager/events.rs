use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tracing::warn;

use super::record::ProcessRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessEvent {
    ProcessStarted { info: ProcessRecord },
    ProcessEnded { info: ProcessRecord },
}

impl ProcessEvent {
    pub fn info(&self) -> &ProcessRecord {
        match self {
            ProcessEvent::ProcessStarted { info } | ProcessEvent::ProcessEnded { info } => info,
        }
    }
}

type Listener = Arc<dyn Fn(&ProcessEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Fan-out of lifecycle events to subscribers in registration order.
///
/// A panicking subscriber is logged and skipped; the remaining subscribers
/// still receive the event.
#[derive(Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Listeners>>,
}

/// Handle returned by [`EventBus::subscribe`].
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe to remove it"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl EventBus {
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ProcessEvent) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.listeners);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn emit(&self, event: &ProcessEvent) {
        // Snapshot so listeners may subscribe/unsubscribe while being called.
        let snapshot = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<Listener>>();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(process = %event.info().id, "process event listener panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

use super::{ChangeSource, Handler, HandlerId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe list of handlers for one event type
///
/// `emit` snapshots the handler list and invokes the handlers after releasing
/// the lock, so a handler may add or remove registrations (including its own)
/// while it runs.
pub struct EventSource<E> {
    handlers: Mutex<Vec<(HandlerId, Handler<E>)>>,
    next_id: AtomicU64,
}

impl<E: 'static> EventSource<E> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Delivers `event` to every handler registered at the time of the call
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &E) -> usize {
        let snapshot: Vec<Handler<E>> = self
            .handlers()
            .iter()
            .map(|(_, handler)| Handler::clone(handler))
            .collect();

        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers().len()
    }

    pub fn is_registered(&self, id: HandlerId) -> bool {
        self.handlers().iter().any(|(existing, _)| *existing == id)
    }

    // The list is only touched by push/remove, so a poisoned lock still holds
    // a consistent vector.
    fn handlers(&self) -> MutexGuard<'_, Vec<(HandlerId, Handler<E>)>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: 'static> ChangeSource<E> for EventSource<E> {
    fn add_handler(&self, handler: Handler<E>) -> HandlerId {
        let id = HandlerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers().push((id, handler));
        id
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        // Drop the removed handler after the guard so its destructor cannot
        // re-enter this source while the lock is held.
        let removed = {
            let mut handlers = self.handlers();
            match handlers.iter().position(|(existing, _)| *existing == id) {
                Some(index) => Some(handlers.remove(index)),
                None => None,
            }
        };
        removed.is_some()
    }
}

impl<E: 'static> Default for EventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventSource<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .handlers
            .lock()
            .map(|handlers| handlers.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len());
        f.debug_struct("EventSource")
            .field("handler_count", &count)
            .finish()
    }
}

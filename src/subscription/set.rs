use super::handle::SubscriptionHandle;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct SetState {
    handles: Vec<SubscriptionHandle>,
    disposed: bool,
}

/// A group of subscriptions disposed together
///
/// Once the set itself is disposed, any handle added later is disposed
/// immediately.
#[derive(Default)]
pub struct SubscriptionSet {
    state: Mutex<SetState>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handle: SubscriptionHandle) {
        let mut state = self.state();
        if state.disposed {
            drop(state);
            handle.dispose();
            return;
        }
        state.handles.push(handle);
    }

    /// Disposes every held handle and keeps the set open for new ones
    pub fn clear(&self) {
        let handles = std::mem::take(&mut self.state().handles);
        for handle in &handles {
            handle.dispose();
        }
    }

    /// Disposes every held handle; later additions are disposed on arrival
    pub fn dispose(&self) {
        let handles = {
            let mut state = self.state();
            state.disposed = true;
            std::mem::take(&mut state.handles)
        };
        for handle in &handles {
            handle.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    pub fn len(&self) -> usize {
        self.state().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, SetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SubscriptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("SubscriptionSet")
            .field("len", &state.handles.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

use crate::core::{LifecycleFlags, StateCode, Transition, split_type_name};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};
use uuid::Uuid;

const LOG_HEADER: &str = "LifecycleRecord:";

struct RecordState {
    flags: LifecycleFlags,
    /// Pending change not yet acknowledged by a News snapshot
    updated: bool,
    /// Liveness as last observed by this record; a differing probe marks it updated
    last_alive: bool,
    last_transition_at: DateTime<Utc>,
}

impl RecordState {
    fn observe_liveness(&mut self, alive: bool) {
        if alive != self.last_alive {
            self.last_alive = alive;
            self.updated = true;
        }
    }
}

/// Lifecycle log of one tracked instance
///
/// Holds only a weak reference to the instance. Flags are monotonic; liveness
/// is probed from the weak reference on every read and never cached.
pub struct LifecycleRecord {
    id: Uuid,
    target: Weak<dyn Any + Send + Sync>,
    type_name: String,
    category: String,
    registered_at: DateTime<Utc>,
    state: Mutex<RecordState>,
}

impl LifecycleRecord {
    pub(crate) fn new<T: Send + Sync + 'static>(target: Weak<T>, id: Uuid) -> Self {
        let (category, type_name) = split_type_name(std::any::type_name::<T>());
        let target: Weak<dyn Any + Send + Sync> = target;
        let now = Utc::now();

        let record = Self {
            id,
            target,
            type_name: type_name.to_string(),
            category: category.to_string(),
            registered_at: now,
            state: Mutex::new(RecordState {
                flags: LifecycleFlags::CONSTRUCTED,
                updated: true,
                last_alive: true,
                last_transition_at: now,
            }),
        };
        record.trace(Transition::Constructed);
        record
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Type name of the target, without its module path
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Module path of the target's type
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.state().last_transition_at
    }

    pub fn flags(&self) -> LifecycleFlags {
        self.state().flags
    }

    pub fn is_constructed(&self) -> bool {
        self.flags().contains(LifecycleFlags::CONSTRUCTED)
    }

    pub fn is_disposed(&self) -> bool {
        self.flags().contains(LifecycleFlags::DISPOSED)
    }

    pub fn is_inner_disposed(&self) -> bool {
        self.flags().contains(LifecycleFlags::INNER_DISPOSED)
    }

    pub fn is_suppressed_finalize(&self) -> bool {
        self.flags().contains(LifecycleFlags::SUPPRESSED_FINALIZE)
    }

    pub fn is_finalized(&self) -> bool {
        self.flags().contains(LifecycleFlags::FINALIZED)
    }

    /// Whether the target is still reachable through a strong reference
    pub fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }

    /// Current state code, with liveness probed now
    pub fn state_code(&self) -> StateCode {
        StateCode::new(self.flags(), self.is_alive())
    }

    /// Dead without ever running either release routine
    pub fn is_leaked(&self) -> bool {
        let flags = self.flags();
        !self.is_alive()
            && !flags.contains(LifecycleFlags::DISPOSED)
            && !flags.contains(LifecycleFlags::INNER_DISPOSED)
    }

    /// Call last in the target's public release entry point
    pub fn on_disposed(&self) {
        self.report(Transition::Disposed);
    }

    /// Call after the target's shared release routine has run
    pub fn on_inner_disposed(&self) {
        self.report(Transition::InnerDisposed);
    }

    /// Call once an explicit release has made finalization unnecessary
    pub fn on_suppressed_finalize(&self) {
        self.report(Transition::SuppressedFinalize);
    }

    /// Call last in the target's drop hook
    pub fn on_finalized(&self) {
        self.report(Transition::Finalized);
    }

    /// Sets the flag for `transition` and marks the record updated
    ///
    /// Reporting a transition again re-asserts the flag.
    pub fn report(&self, transition: Transition) {
        {
            let mut state = self.state();
            state.flags.insert(transition.flag());
            state.updated = true;
            state.last_transition_at = Utc::now();
        }
        self.trace(transition);
    }

    /// Whether a News snapshot would emit this record right now
    pub fn has_pending_update(&self) -> bool {
        let alive = self.is_alive();
        let mut state = self.state();
        state.observe_liveness(alive);
        state.updated
    }

    /// Reads and clears the pending update in one step
    pub(crate) fn take_update(&self) -> Option<StateCode> {
        let alive = self.is_alive();
        let mut state = self.state();
        state.observe_liveness(alive);
        if !state.updated {
            return None;
        }
        state.updated = false;
        Some(StateCode::new(state.flags, alive))
    }

    pub fn snapshot(&self) -> RecordSnapshot {
        let alive = self.is_alive();
        let (flags, last_transition_at) = {
            let state = self.state();
            (state.flags, state.last_transition_at)
        };

        RecordSnapshot {
            id: self.id,
            type_name: self.type_name.clone(),
            category: self.category.clone(),
            state_code: StateCode::new(flags, alive).to_string(),
            constructed: flags.contains(LifecycleFlags::CONSTRUCTED),
            disposed: flags.contains(LifecycleFlags::DISPOSED),
            inner_disposed: flags.contains(LifecycleFlags::INNER_DISPOSED),
            suppressed_finalize: flags.contains(LifecycleFlags::SUPPRESSED_FINALIZE),
            finalized: flags.contains(LifecycleFlags::FINALIZED),
            alive,
            registered_at: self.registered_at,
            last_transition_at,
        }
    }

    fn trace(&self, transition: Transition) {
        if self.is_alive() {
            debug!(
                "{} {}({}).{}",
                LOG_HEADER,
                self.type_name,
                self.id,
                transition.event_name()
            );
        }
    }

    // Every mutation is a single flag/bool store, so a poisoned lock still
    // guards a valid state.
    fn state(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for LifecycleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleRecord")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("category", &self.category)
            .field("state", &self.state_code().to_string())
            .finish()
    }
}

/// Plain-data copy of a record at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub id: Uuid,
    pub type_name: String,
    pub category: String,
    pub state_code: String,
    pub constructed: bool,
    pub disposed: bool,
    pub inner_disposed: bool,
    pub suppressed_finalize: bool,
    pub finalized: bool,
    pub alive: bool,
    pub registered_at: DateTime<Utc>,
    pub last_transition_at: DateTime<Utc>,
}

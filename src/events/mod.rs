//! Change-notification sources
//!
//! A [`ChangeSource`] is anything that can register handlers for an event
//! type and deliver events to them. [`EventSource`] is the ready-made
//! implementation publishers embed; [`NotifyPropertyChanged`] narrows the
//! event to named property changes.

pub mod property;
pub mod source;

use std::fmt;
use std::sync::Arc;

pub use property::{NotifyPropertyChanged, PropertyChanged};
pub use source::EventSource;

/// Shared, thread-safe event handler
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifier of one handler registration within a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Publisher contract consumed by the subscription broker
///
/// Implementations must tolerate `remove_handler` being called from inside a
/// handler while an event is being delivered, and must treat removal of an
/// unknown id as a no-op. Handler invocation order is unspecified.
pub trait ChangeSource<E: 'static>: Send + Sync + 'static {
    /// Registers a handler and returns its registration id
    fn add_handler(&self, handler: Handler<E>) -> HandlerId;

    /// Removes a handler; returns false if it was not registered
    fn remove_handler(&self, id: HandlerId) -> bool;
}

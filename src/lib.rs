// ============================================================================
// LifeAudit Library
// ============================================================================

//! Two cooperating utilities for finding leaks in long-lived object graphs:
//!
//! - weak subscriptions: an observer subscribed to an event source is not kept
//!   alive by that subscription, and the subscription cleans itself up once
//!   the observer is gone
//! - lifecycle records: tracked instances report construction and release
//!   transitions, and snapshots show which ones were released properly, which
//!   ones were only finalized, and which ones are still alive
//!
//! ```
//! use lifeaudit::{EventSource, LifecycleStore, SnapshotMode, WeakSubscriptionBroker};
//! use std::sync::Arc;
//!
//! struct View;
//!
//! let store = LifecycleStore::new();
//! let view = Arc::new(View);
//! store.track(&view)?;
//!
//! let source = Arc::new(EventSource::<u32>::new());
//! let broker = WeakSubscriptionBroker::new();
//! let _subscription = broker.subscribe(Arc::clone(&source), &view, |_view, value| {
//!     println!("got {}", value);
//! });
//! source.emit(&7);
//!
//! print!("{}", store.render_snapshot(SnapshotMode::All));
//! # Ok::<(), lifeaudit::AuditError>(())
//! ```

pub mod core;
pub mod events;
pub mod lifecycle;
pub mod prelude;
pub mod subscription;

// Re-export main types for convenience
pub use core::{AuditError, LifecycleFlags, Result, StateCode, Transition};

// Re-export event API
pub use events::{
    ChangeSource, EventSource, Handler, HandlerId, NotifyPropertyChanged, PropertyChanged,
};

// Re-export subscription API
pub use subscription::{BrokerStats, SubscriptionHandle, SubscriptionSet, WeakSubscriptionBroker};

// Re-export lifecycle API
pub use lifecycle::{
    LifecycleRecord, LifecycleStore, RecordSnapshot, ReleaseTracker, SnapshotMode, StoreConfig,
    SweepReport,
};

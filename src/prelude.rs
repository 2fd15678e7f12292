//! Everything a tracked type or an observer usually needs.
//!
//! ```
//! use lifeaudit::prelude::*;
//! ```

pub use crate::core::{AuditError, Result, StateCode, Transition};
pub use crate::events::{ChangeSource, EventSource, NotifyPropertyChanged, PropertyChanged};
pub use crate::lifecycle::{LifecycleStore, ReleaseTracker, SnapshotMode, StoreConfig};
pub use crate::subscription::{SubscriptionHandle, SubscriptionSet, WeakSubscriptionBroker};

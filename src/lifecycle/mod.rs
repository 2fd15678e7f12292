//! Lifecycle auditing
//!
//! Tracked instances register with a [`LifecycleStore`] when they are built
//! and report their release transitions through the returned
//! [`LifecycleRecord`]. Snapshots of the store show, per instance, which
//! transitions ran and whether the instance is still reachable:
//!
//! ```text
//! LifecycleStore: All Begin ==========
//! LifecycleStore: CDIS-D Model                0b7c...  app::models
//! LifecycleStore: C-I-FD Model                91e2...  app::models
//! LifecycleStore: All End ==========
//! ```

pub mod config;
pub mod reclaim;
pub mod record;
pub mod render;
pub mod store;
pub mod tracker;

pub use config::StoreConfig;
pub use reclaim::SweepReport;
pub use record::{LifecycleRecord, RecordSnapshot};
pub use render::SnapshotMode;
pub use store::LifecycleStore;
pub use tracker::ReleaseTracker;

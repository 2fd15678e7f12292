use super::config::{StoreConfig, validate_header};
use super::reclaim::{ReclaimQueue, SweepReport};
use super::record::{LifecycleRecord, RecordSnapshot};
use super::render::{SnapshotMode, SnapshotWriter};
use super::tracker::ReleaseTracker;
use crate::core::{AuditError, Result};
use crate::events::{ChangeSource, EventSource, Handler, HandlerId, NotifyPropertyChanged, PropertyChanged};
use lazy_static::lazy_static;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};
use std::time::Duration;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

// Global singleton instance of LifecycleStore
lazy_static! {
    static ref GLOBAL_STORE: Arc<LifecycleStore> = Arc::new(LifecycleStore::new());
}

#[derive(Default)]
struct Registry {
    /// Registration order; never reordered, never shrunk
    ordered: Vec<Arc<LifecycleRecord>>,
    index: HashMap<Uuid, Arc<LifecycleRecord>>,
}

/// Registry of lifecycle records for leak and release-protocol auditing
///
/// Tracked instances register at construction and report their own
/// transitions through the returned record. Records outlive their targets:
/// a dead record is the proof of what happened to the instance.
///
/// The News snapshot acknowledges what it renders, so it assumes a single
/// reader. Two callers rendering News concurrently split the pending records
/// between them.
pub struct LifecycleStore {
    config: StoreConfig,
    registry: RwLock<Registry>,
    updated_logs: RwLock<String>,
    all_logs: RwLock<String>,
    changes: EventSource<PropertyChanged>,
    reclaim: ReclaimQueue,
}

impl LifecycleStore {
    /// Property raised when the cached News snapshot text changes
    pub const UPDATED_LOGS: &'static str = "updated_logs";
    /// Property raised when the cached All snapshot text changes
    pub const ALL_LOGS: &'static str = "all_logs";

    const PROPERTY_NAMES: [&'static str; 2] = [Self::UPDATED_LOGS, Self::ALL_LOGS];

    /// Get the global LifecycleStore instance
    ///
    /// Created on first access and shared by the whole process. Components
    /// that can be handed a store explicitly should prefer their own instance.
    pub fn global() -> &'static Arc<LifecycleStore> {
        &GLOBAL_STORE
    }

    pub fn new() -> Self {
        Self::build(StoreConfig::default())
    }

    /// Creates a store with custom configuration
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: StoreConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(Registry::default()),
            updated_logs: RwLock::new(String::new()),
            all_logs: RwLock::new(String::new()),
            changes: EventSource::new(),
            reclaim: ReclaimQueue::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Starts tracking `target` under `id`
    ///
    /// The target's type is captured now; afterwards only a weak reference
    /// is kept.
    pub fn create_record<T: Send + Sync + 'static>(
        &self,
        target: &Arc<T>,
        id: Uuid,
    ) -> Result<Arc<LifecycleRecord>> {
        self.create_record_weak(&Arc::downgrade(target), id)
    }

    /// Starts tracking through a weak reference
    ///
    /// Lets a type register itself from inside `Arc::new_cyclic`, before any
    /// strong reference exists.
    pub fn create_record_weak<T: Send + Sync + 'static>(
        &self,
        target: &Weak<T>,
        id: Uuid,
    ) -> Result<Arc<LifecycleRecord>> {
        let mut registry = self.registry.write()?;
        if registry.index.contains_key(&id) {
            return Err(AuditError::AlreadyTracked(id));
        }

        let record = Arc::new(LifecycleRecord::new(Weak::clone(target), id));
        registry.index.insert(id, Arc::clone(&record));
        registry.ordered.push(Arc::clone(&record));
        Ok(record)
    }

    /// Starts tracking `target` under a fresh random id
    pub fn track<T: Send + Sync + 'static>(&self, target: &Arc<T>) -> Result<Arc<LifecycleRecord>> {
        self.create_record(target, Uuid::new_v4())
    }

    /// Registers a target from inside `Arc::new_cyclic` and wraps its record
    /// in a [`ReleaseTracker`]
    pub fn create_tracker<T: Send + Sync + 'static>(&self, target: &Weak<T>) -> Result<ReleaseTracker> {
        let record = self.create_record_weak(target, Uuid::new_v4())?;
        Ok(ReleaseTracker::new(record))
    }

    /// Looks up a record by id
    pub fn find(&self, id: Uuid) -> Result<Arc<LifecycleRecord>> {
        let registry = self.registry.read()?;

        registry.index.get(&id)
            .cloned()
            .ok_or(AuditError::NotFound(id))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.registry().index.contains_key(&id)
    }

    /// All records in registration order
    pub fn records(&self) -> Vec<Arc<LifecycleRecord>> {
        self.registry().ordered.clone()
    }

    pub fn len(&self) -> usize {
        self.registry().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records whose target died without running either release routine
    pub fn leaks(&self) -> Vec<Arc<LifecycleRecord>> {
        self.records()
            .into_iter()
            .filter(|record| record.is_leaked())
            .collect()
    }

    /// Plain-data copies of every record, in registration order
    pub fn snapshots(&self) -> Vec<RecordSnapshot> {
        self.records().iter().map(|record| record.snapshot()).collect()
    }

    /// Every record snapshot as a JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshots())?)
    }

    // Records are only appended under the write lock, so a poisoned lock
    // still guards a consistent registry.
    fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Renders records as a framed text block
    ///
    /// In [`SnapshotMode::News`] only records with a pending update are
    /// emitted, and each emitted record is acknowledged: rendering News twice
    /// with nothing happening in between yields an empty body the second time.
    pub fn render_snapshot(&self, mode: SnapshotMode) -> String {
        self.render_with(&self.config.header, mode)
    }

    /// Same as [`render_snapshot`](Self::render_snapshot) with another header token
    pub fn render_snapshot_with_header(&self, mode: SnapshotMode, header: &str) -> Result<String> {
        validate_header(header)?;
        Ok(self.render_with(header, mode))
    }

    fn render_with(&self, header: &str, mode: SnapshotMode) -> String {
        let mut writer = SnapshotWriter::begin(
            header,
            mode,
            self.config.type_column_width,
            &self.config.line_ending,
        );

        for record in self.records() {
            let code = match mode {
                SnapshotMode::News => record.take_update(),
                SnapshotMode::All => Some(record.state_code()),
            };
            if let Some(code) = code {
                writer.record(code, record.type_name(), record.id(), record.category());
            }
        }

        writer.finish()
    }

    /// Re-renders the cached News and All snapshots
    ///
    /// Raises [`UPDATED_LOGS`](Self::UPDATED_LOGS) / [`ALL_LOGS`](Self::ALL_LOGS)
    /// for each cached text that changed.
    pub fn refresh_snapshots(&self) {
        let updated = self.render_snapshot(SnapshotMode::News);
        let all = self.render_snapshot(SnapshotMode::All);

        if self.config.log_snapshots {
            debug!("{}", updated.trim_end());
            debug!("{}", all.trim_end());
        }

        if Self::replace_if_changed(&self.updated_logs, updated) {
            self.changes.emit(&PropertyChanged::new(Self::UPDATED_LOGS));
        }
        if Self::replace_if_changed(&self.all_logs, all) {
            self.changes.emit(&PropertyChanged::new(Self::ALL_LOGS));
        }
    }

    /// News snapshot from the last [`refresh_snapshots`](Self::refresh_snapshots)
    pub fn updated_logs_string(&self) -> String {
        self.updated_logs.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// All snapshot from the last [`refresh_snapshots`](Self::refresh_snapshots)
    pub fn all_logs_string(&self) -> String {
        self.all_logs.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace_if_changed(slot: &RwLock<String>, value: String) -> bool {
        let mut current = slot.write().unwrap_or_else(PoisonError::into_inner);
        if *current == value {
            return false;
        }
        *current = value;
        true
    }

    // ------------------------------------------------------------------
    // Reclamation
    // ------------------------------------------------------------------

    /// Hands `value` over to be dropped by the next collection sweep
    pub fn defer_release<T: Send + 'static>(&self, value: T) {
        self.reclaim.push(Box::new(value));
    }

    /// Number of values waiting for the next sweep
    pub fn pending_release_count(&self) -> usize {
        self.reclaim.len()
    }

    /// Waits `delay`, then runs a reclamation pass
    ///
    /// Every value handed to [`defer_release`](Self::defer_release) is dropped
    /// on a blocking worker, and the sweep completes once all of their drop
    /// hooks have returned. This is a diagnostic aid: it cannot make a value
    /// that is still referenced elsewhere unreachable, and nothing should
    /// depend on a particular record being finalized by the time it returns.
    pub async fn request_collection_sweep(&self, delay: Duration) -> Result<SweepReport> {
        let header = self.config.header.as_str();
        let span = info_span!("lifecycle_sweep", delay_ms = delay.as_millis() as u64);

        async move {
            tokio::time::sleep(delay).await;

            let pending = self.reclaim.take_all();
            let released = pending.len();
            debug!("{} collect ({} deferred)", header, released);

            tokio::task::spawn_blocking(move || drop(pending))
                .await
                .map_err(|e| AuditError::SweepError(e.to_string()))?;
            debug!("{} pending finalizers done", header);

            let records = self.records();
            let report = SweepReport {
                released,
                dead_records: records.iter().filter(|r| !r.is_alive()).count(),
                leaked_records: records.iter().filter(|r| r.is_leaked()).count(),
            };
            event!(
                Level::DEBUG,
                released = report.released,
                dead = report.dead_records,
                leaked = report.leaked_records,
                "sweep complete"
            );
            Ok::<_, AuditError>(report)
        }
        .instrument(span)
        .await
    }
}

impl Default for LifecycleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSource<PropertyChanged> for LifecycleStore {
    fn add_handler(&self, handler: Handler<PropertyChanged>) -> HandlerId {
        self.changes.add_handler(handler)
    }

    fn remove_handler(&self, id: HandlerId) -> bool {
        self.changes.remove_handler(id)
    }
}

impl NotifyPropertyChanged for LifecycleStore {
    fn property_names(&self) -> &[&'static str] {
        &Self::PROPERTY_NAMES
    }
}

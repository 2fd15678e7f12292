use super::record::LifecycleRecord;
use crate::core::{AuditError, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Release protocol for a tracked type, reported to its lifecycle record
///
/// Embed one in the tracked type. An explicit [`release`](Self::release)
/// reports SuppressedFinalize, InnerDisposed and Disposed; dropping a tracker
/// that was never released takes the finalizer path and reports InnerDisposed
/// and Finalized. The drop path runs the cleanup registered with
/// [`with_finalizer`](Self::with_finalizer), if any, before reporting
/// InnerDisposed; an explicit release discards it.
///
/// Values kept alive by a reference cycle are never dropped, so their record
/// can stay alive forever or go dead without reaching Finalized.
pub struct ReleaseTracker {
    record: Arc<LifecycleRecord>,
    released: AtomicBool,
    finalizer: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ReleaseTracker {
    pub fn new(record: Arc<LifecycleRecord>) -> Self {
        Self {
            record,
            released: AtomicBool::new(false),
            finalizer: Mutex::new(None),
        }
    }

    /// Registers the cleanup the drop path runs when no explicit release happened
    pub fn with_finalizer<F: FnOnce() + Send + 'static>(self, cleanup: F) -> Self {
        *self.finalizer.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(cleanup));
        self
    }

    fn take_finalizer(&self) -> Option<Box<dyn FnOnce() + Send>> {
        self.finalizer.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn record(&self) -> &Arc<LifecycleRecord> {
        &self.record
    }

    pub fn id(&self) -> Uuid {
        self.record.id()
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Explicit release with no extra cleanup
    pub fn release(&self) -> Result<()> {
        self.release_with(|| {})
    }

    /// Explicit release running `cleanup` as the shared release routine
    ///
    /// A second call fails with [`AuditError::DoubleRelease`] and runs nothing.
    pub fn release_with<F: FnOnce()>(&self, cleanup: F) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Err(AuditError::DoubleRelease(format!(
                "{}({}) has already been released",
                self.record.type_name(),
                self.record.id()
            )));
        }

        self.take_finalizer();
        self.record.on_suppressed_finalize();
        cleanup();
        self.record.on_inner_disposed();
        self.record.on_disposed();
        Ok(())
    }
}

impl Drop for ReleaseTracker {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            if let Some(finalizer) = self.take_finalizer() {
                finalizer();
            }
            self.record.on_inner_disposed();
            self.record.on_finalized();
        }
    }
}

impl fmt::Debug for ReleaseTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseTracker")
            .field("record", &self.record)
            .field("released", &self.is_released())
            .finish()
    }
}

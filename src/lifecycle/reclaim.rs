use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Values handed over for release at the next collection sweep
///
/// Dropping a queued value runs its drop hooks, which is where tracked types
/// report finalization.
#[derive(Default)]
pub(crate) struct ReclaimQueue {
    pending: Mutex<Vec<Box<dyn Any + Send>>>,
}

impl ReclaimQueue {
    pub(crate) fn push(&self, value: Box<dyn Any + Send>) {
        self.pending().push(value);
    }

    pub(crate) fn take_all(&self) -> Vec<Box<dyn Any + Send>> {
        std::mem::take(&mut *self.pending())
    }

    pub(crate) fn len(&self) -> usize {
        self.pending().len()
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Box<dyn Any + Send>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of one collection sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SweepReport {
    /// Deferred values dropped by this sweep
    pub released: usize,
    /// Records whose target was dead when the sweep finished
    pub dead_records: usize,
    /// Dead records that never ran a release routine
    pub leaked_records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_take_all_hands_over_ownership() {
        let drops = Arc::new(AtomicUsize::new(0));
        let queue = ReclaimQueue::default();
        queue.push(Box::new(DropCounter(Arc::clone(&drops))));
        queue.push(Box::new(DropCounter(Arc::clone(&drops))));
        assert_eq!(queue.len(), 2);

        let taken = queue.take_all();
        assert_eq!(queue.len(), 0);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        drop(taken);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }
}

use crate::events::{ChangeSource, HandlerId};
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Why a registration was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    /// The owner disposed or dropped its handle
    Disposed,
    /// The weakly held observer was found dead during delivery
    ObserverReleased,
}

/// Type-erased view of a link, held by [`SubscriptionHandle`](super::SubscriptionHandle)
pub(crate) trait Registration: Send + Sync {
    /// Closes the registration; returns true only for the call that closed it
    fn close(&self, reason: CloseReason) -> bool;

    fn is_open(&self) -> bool;
}

/// Counters shared by every link created through one broker
#[derive(Debug, Default)]
pub(crate) struct BrokerCounters {
    pub(crate) created: AtomicU64,
    pub(crate) disposed: AtomicU64,
    pub(crate) auto_released: AtomicU64,
}

struct LinkState<E: 'static> {
    /// Strong hold on the publisher, released when the link closes
    source: Option<Arc<dyn ChangeSource<E>>>,
    /// Set once the source has accepted the forwarding shim
    id: Option<HandlerId>,
    closed: bool,
}

/// One registration of a forwarding shim with a change source
///
/// The shim holds the link and the link holds the source, so a live link keeps
/// the publisher alive. Closing is a single guarded transition: whichever of
/// dispose or observer-death gets there first removes the shim, the other one
/// is a no-op.
pub(crate) struct Link<E: 'static> {
    state: Mutex<LinkState<E>>,
    open: AtomicBool,
    counters: Arc<BrokerCounters>,
}

impl<E: 'static> Link<E> {
    pub(crate) fn new(source: Arc<dyn ChangeSource<E>>, counters: Arc<BrokerCounters>) -> Self {
        Self {
            state: Mutex::new(LinkState {
                source: Some(source),
                id: None,
                closed: false,
            }),
            open: AtomicBool::new(true),
            counters,
        }
    }

    /// Records the id the source assigned to the shim
    ///
    /// If the link was closed while registration was still in flight, the
    /// removal that close could not perform happens here.
    pub(crate) fn attach(&self, id: HandlerId) {
        let source = {
            let mut state = self.state();
            if !state.closed {
                state.id = Some(id);
                return;
            }
            state.source.take()
        };
        if let Some(source) = source {
            source.remove_handler(id);
        }
    }

    fn state(&self) -> MutexGuard<'_, LinkState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: 'static> Registration for Link<E> {
    fn close(&self, reason: CloseReason) -> bool {
        let (source, id) = {
            let mut state = self.state();
            if state.closed {
                return false;
            }
            state.closed = true;
            self.open.store(false, Ordering::Release);
            match state.id.take() {
                Some(id) => (state.source.take(), Some(id)),
                None => (None, None),
            }
        };

        match reason {
            CloseReason::Disposed => {
                self.counters.disposed.fetch_add(1, Ordering::Relaxed);
            }
            CloseReason::ObserverReleased => {
                self.counters.auto_released.fetch_add(1, Ordering::Relaxed);
                if let Some(id) = id {
                    debug!("WeakSubscriptionBroker: observer released, unsubscribing handler {}", id);
                }
            }
        }

        // Removal runs without the link lock: the source drops the shim, and
        // with it possibly the last reference to this link.
        if let (Some(source), Some(id)) = (source, id) {
            source.remove_handler(id);
        }
        true
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

use super::handle::SubscriptionHandle;
use super::link::{BrokerCounters, CloseReason, Link, Registration};
use crate::core::{AuditError, Result};
use crate::events::{ChangeSource, Handler, NotifyPropertyChanged, PropertyChanged};
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Outcome of one forwarding attempt
enum Delivery {
    Forwarded,
    ObserverGone,
}

/// Point-in-time counters for a broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BrokerStats {
    /// Subscriptions established
    pub created: u64,
    /// Subscriptions still registered with their source
    pub active: u64,
    /// Subscriptions ended through their handle
    pub disposed: u64,
    /// Subscriptions that removed themselves after finding the observer dead
    pub auto_released: u64,
}

/// Establishes subscriptions that hold the observer weakly
///
/// The reference runs toward the publisher: the source's handler list keeps
/// a forwarding shim alive, the shim keeps the source alive, and only the
/// observer is held through a `Weak`. On each event the shim upgrades the
/// observer and forwards; if the upgrade fails it removes itself from the
/// source, releasing the source as well.
///
/// A publisher therefore stays alive while any subscription to it is open,
/// even after every other reference to it is dropped.
///
/// Handlers receive the upgraded observer as an argument. They must not
/// capture the observer strongly themselves, or the observer can never die.
#[derive(Debug, Clone, Default)]
pub struct WeakSubscriptionBroker {
    counters: Arc<BrokerCounters>,
}

impl WeakSubscriptionBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards events from `source` to `handler` while `observer` is alive
    ///
    /// # Examples
    ///
    /// ```
    /// use lifeaudit::{EventSource, WeakSubscriptionBroker};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// struct Counter { hits: AtomicU32 }
    ///
    /// let broker = WeakSubscriptionBroker::new();
    /// let source = Arc::new(EventSource::<u32>::new());
    /// let counter = Arc::new(Counter { hits: AtomicU32::new(0) });
    ///
    /// let handle = broker.subscribe(Arc::clone(&source), &counter, |c: &Counter, _: &u32| {
    ///     c.hits.fetch_add(1, Ordering::SeqCst);
    /// });
    ///
    /// source.emit(&7);
    /// assert_eq!(counter.hits.load(Ordering::SeqCst), 1);
    ///
    /// drop(counter);
    /// source.emit(&8);
    /// assert!(handle.is_disposed());
    /// assert_eq!(source.handler_count(), 0);
    /// ```
    pub fn subscribe<S, E, O, F>(&self, source: Arc<S>, observer: &Arc<O>, handler: F) -> SubscriptionHandle
    where
        S: ChangeSource<E>,
        E: 'static,
        O: Send + Sync + 'static,
        F: Fn(&O, &E) + Send + Sync + 'static,
    {
        let observer = Arc::downgrade(observer);
        self.register(source, move |event: &E| match observer.upgrade() {
            Some(observer) => {
                handler(&observer, event);
                Delivery::Forwarded
            }
            None => Delivery::ObserverGone,
        })
    }

    /// Forwards events to a handler closure that is itself held weakly
    ///
    /// The caller keeps the `Arc` alive; once every clone of it is dropped,
    /// the next event unsubscribes.
    pub fn subscribe_fn<S, E>(&self, source: Arc<S>, handler: &Handler<E>) -> SubscriptionHandle
    where
        S: ChangeSource<E>,
        E: 'static,
    {
        let handler = Arc::downgrade(handler);
        self.register(source, move |event: &E| match handler.upgrade() {
            Some(handler) => {
                handler(event);
                Delivery::Forwarded
            }
            None => Delivery::ObserverGone,
        })
    }

    /// Ordinary subscription owning its handler; ends only through the handle
    pub fn subscribe_strong<S, E, F>(&self, source: Arc<S>, handler: F) -> SubscriptionHandle
    where
        S: ChangeSource<E>,
        E: 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(source, move |event: &E| {
            handler(event);
            Delivery::Forwarded
        })
    }

    /// Weak subscription to changes of a single named property
    ///
    /// Fails with [`AuditError::InvalidArgument`] when `property` is not one of
    /// the names the source declares.
    pub fn subscribe_property<S, O, F>(
        &self,
        source: Arc<S>,
        property: &str,
        observer: &Arc<O>,
        handler: F,
    ) -> Result<SubscriptionHandle>
    where
        S: NotifyPropertyChanged,
        O: Send + Sync + 'static,
        F: Fn(&O, &PropertyChanged) + Send + Sync + 'static,
    {
        if !source.has_property(property) {
            return Err(AuditError::InvalidArgument(format!(
                "'{}' does not name a property of {}",
                property,
                std::any::type_name::<S>()
            )));
        }

        let property = property.to_string();
        let observer = Arc::downgrade(observer);
        Ok(self.register(source, move |event: &PropertyChanged| {
            let Some(observer) = observer.upgrade() else {
                return Delivery::ObserverGone;
            };
            if event.is(&property) {
                handler(&observer, event);
            }
            Delivery::Forwarded
        }))
    }

    pub fn stats(&self) -> BrokerStats {
        let created = self.counters.created.load(Ordering::Relaxed);
        let disposed = self.counters.disposed.load(Ordering::Relaxed);
        let auto_released = self.counters.auto_released.load(Ordering::Relaxed);
        BrokerStats {
            created,
            active: created.saturating_sub(disposed + auto_released),
            disposed,
            auto_released,
        }
    }

    fn register<S, E, F>(&self, source: Arc<S>, forward: F) -> SubscriptionHandle
    where
        S: ChangeSource<E>,
        E: 'static,
        F: Fn(&E) -> Delivery + Send + Sync + 'static,
    {
        let source: Arc<dyn ChangeSource<E>> = source;
        let link = Arc::new(Link::new(Arc::clone(&source), Arc::clone(&self.counters)));
        self.counters.created.fetch_add(1, Ordering::Relaxed);

        let shim_link = Arc::clone(&link);
        let shim: Handler<E> = Arc::new(move |event: &E| {
            if !shim_link.is_open() {
                return;
            }
            if let Delivery::ObserverGone = forward(event) {
                shim_link.close(CloseReason::ObserverReleased);
            }
        });

        let id = source.add_handler(shim);
        link.attach(id);
        SubscriptionHandle::new(link)
    }
}

/// Weak subscription tests
///
/// Tests for observer lifetime, handle disposal and subscription sets
/// Run with: cargo test --test weak_subscription_tests

use lifeaudit::{
    AuditError, ChangeSource, EventSource, LifecycleStore, NotifyPropertyChanged, PropertyChanged,
    SubscriptionSet, WeakSubscriptionBroker,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

#[derive(Default)]
struct Counter {
    hits: AtomicUsize,
}

impl Counter {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[test]
fn test_events_reach_live_observer() {
    let source = Arc::new(EventSource::<u32>::new());
    let observer = Arc::new(Mutex::new(Vec::new()));
    let broker = WeakSubscriptionBroker::new();

    let _handle = broker.subscribe(Arc::clone(&source), &observer, |seen, value| {
        seen.lock().unwrap().push(*value);
    });

    source.emit(&1);
    source.emit(&2);

    assert_eq!(*observer.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_subscription_does_not_keep_observer_alive() {
    let source = Arc::new(EventSource::<u32>::new());
    let observer = Arc::new(Counter::default());
    let weak_observer = Arc::downgrade(&observer);
    let broker = WeakSubscriptionBroker::new();

    let handle = broker.subscribe(Arc::clone(&source), &observer, |counter, _| {
        counter.hits.fetch_add(1, Ordering::SeqCst);
    });

    drop(observer);
    assert!(weak_observer.upgrade().is_none());

    // The first event after the observer died removes the registration
    source.emit(&1);
    assert_eq!(source.handler_count(), 0);
    assert!(handle.is_disposed());
    assert_eq!(broker.stats().auto_released, 1);
    assert_eq!(broker.stats().active, 0);

    // Later events are not delivered anywhere and do not fail
    assert_eq!(source.emit(&2), 0);
}

#[test]
fn test_open_subscription_keeps_source_alive() {
    let source = Arc::new(EventSource::<u32>::new());
    let weak_source = Arc::downgrade(&source);
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();

    let handle = broker.subscribe(source, &observer, |counter, _| {
        counter.hits.fetch_add(1, Ordering::SeqCst);
    });

    let source = weak_source.upgrade().expect("source kept alive by subscription");
    source.emit(&1);
    drop(source);
    assert!(weak_source.upgrade().is_some());

    handle.dispose();
    assert!(weak_source.upgrade().is_none());
    assert_eq!(observer.hits(), 1);
}

#[test]
fn test_source_released_after_observer_death() {
    let source = Arc::new(EventSource::<u32>::new());
    let weak_source = Arc::downgrade(&source);
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();

    let _handle = broker.subscribe(Arc::clone(&source), &observer, |_, _| {});

    drop(observer);
    source.emit(&0);
    drop(source);

    assert!(weak_source.upgrade().is_none());
}

#[test]
fn test_dispose_is_idempotent() {
    let source = Arc::new(EventSource::<u32>::new());
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();

    let handle = broker.subscribe(Arc::clone(&source), &observer, |counter, _| {
        counter.hits.fetch_add(1, Ordering::SeqCst);
    });

    handle.dispose();
    handle.dispose();
    drop(handle);

    source.emit(&1);
    assert_eq!(observer.hits(), 0);

    let stats = broker.stats();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.disposed, 1);
    assert_eq!(stats.auto_released, 0);
}

#[test]
fn test_dropping_handle_unsubscribes() {
    let source = Arc::new(EventSource::<u32>::new());
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();

    {
        let _handle = broker.subscribe(Arc::clone(&source), &observer, |counter, _| {
            counter.hits.fetch_add(1, Ordering::SeqCst);
        });
        source.emit(&1);
    }

    source.emit(&2);
    assert_eq!(observer.hits(), 1);
    assert_eq!(source.handler_count(), 0);
}

#[test]
fn test_subscription_set_disposes_together() {
    let first = Arc::new(EventSource::<u32>::new());
    let second = Arc::new(EventSource::<String>::new());
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();
    let set = SubscriptionSet::new();

    broker
        .subscribe(Arc::clone(&first), &observer, |counter, _| {
            counter.hits.fetch_add(1, Ordering::SeqCst);
        })
        .add_to(&set);
    broker
        .subscribe(Arc::clone(&second), &observer, |counter, _| {
            counter.hits.fetch_add(1, Ordering::SeqCst);
        })
        .add_to(&set);
    assert_eq!(set.len(), 2);

    first.emit(&1);
    second.emit(&"a".to_string());
    assert_eq!(observer.hits(), 2);

    set.dispose();
    assert!(set.is_disposed());
    first.emit(&2);
    second.emit(&"b".to_string());
    assert_eq!(observer.hits(), 2);

    // Adding to a disposed set ends the subscription right away
    broker
        .subscribe(Arc::clone(&first), &observer, |counter, _| {
            counter.hits.fetch_add(1, Ordering::SeqCst);
        })
        .add_to(&set);
    first.emit(&3);
    assert_eq!(observer.hits(), 2);
    assert_eq!(first.handler_count(), 0);
}

#[test]
fn test_strong_subscription_keeps_closure_state() {
    let source = Arc::new(EventSource::<u32>::new());
    let total = Arc::new(AtomicUsize::new(0));
    let broker = WeakSubscriptionBroker::new();

    let sink = Arc::clone(&total);
    let handle = broker.subscribe_strong(Arc::clone(&source), move |value: &u32| {
        sink.fetch_add(*value as usize, Ordering::SeqCst);
    });

    source.emit(&3);
    source.emit(&4);
    handle.dispose();
    source.emit(&5);

    assert_eq!(total.load(Ordering::SeqCst), 7);
}

#[test]
fn test_subscribe_fn_releases_when_handler_dropped() {
    let source = Arc::new(EventSource::<u32>::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let broker = WeakSubscriptionBroker::new();

    let sink = Arc::clone(&hits);
    let handler: lifeaudit::Handler<u32> = Arc::new(move |_: &u32| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    let _handle = broker.subscribe_fn(Arc::clone(&source), &handler);

    source.emit(&1);
    drop(handler);
    source.emit(&2);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(source.handler_count(), 0);
}

#[test]
fn test_handler_can_dispose_own_subscription() {
    let source = Arc::new(EventSource::<u32>::new());
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();
    let slot: Arc<Mutex<Option<lifeaudit::SubscriptionHandle>>> = Arc::new(Mutex::new(None));

    let inner_slot = Arc::clone(&slot);
    let handle = broker.subscribe(Arc::clone(&source), &observer, move |counter, _| {
        counter.hits.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = inner_slot.lock().unwrap().as_ref() {
            handle.dispose();
        }
    });
    *slot.lock().unwrap() = Some(handle);

    source.emit(&1);
    source.emit(&2);

    assert_eq!(observer.hits(), 1);
    assert_eq!(source.handler_count(), 0);
}

#[test]
fn test_concurrent_emit_and_dispose() {
    let source = Arc::new(EventSource::<u32>::new());
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            broker.subscribe(Arc::clone(&source), &observer, |counter, _| {
                counter.hits.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..200 {
                source.emit(&i);
            }
        });
        scope.spawn(|| {
            for handle in &handles {
                handle.dispose();
            }
        });
    });

    assert_eq!(source.handler_count(), 0);
    assert!(handles.iter().all(|h| h.is_disposed()));
    assert_eq!(broker.stats().disposed, 32);

    let before = observer.hits();
    source.emit(&0);
    assert_eq!(observer.hits(), before);
}

#[test]
fn test_concurrent_delivery_to_dead_observer_releases_once() {
    let num_threads = 4;

    for _ in 0..200 {
        let source = Arc::new(EventSource::<u32>::new());
        let observer = Arc::new(Counter::default());
        let broker = WeakSubscriptionBroker::new();

        let handle = broker.subscribe(Arc::clone(&source), &observer, |counter, _| {
            counter.hits.fetch_add(1, Ordering::SeqCst);
        });
        drop(observer);

        let barrier = Barrier::new(num_threads);
        std::thread::scope(|scope| {
            for thread_id in 0..num_threads {
                let source = &source;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    source.emit(&(thread_id as u32));
                });
            }
        });

        let stats = broker.stats();
        assert_eq!(stats.auto_released, 1);
        assert_eq!(stats.disposed, 0);
        assert_eq!(stats.active, 0);
        assert_eq!(source.handler_count(), 0);
        assert!(handle.is_disposed());

        // Disposing after the broker released it changes nothing
        handle.dispose();
        assert_eq!(broker.stats().disposed, 0);
    }
}

#[test]
fn test_property_subscription_filters_by_name() {
    let store = Arc::new(LifecycleStore::new());
    let observer = Arc::new(Mutex::new(Vec::<String>::new()));
    let broker = WeakSubscriptionBroker::new();

    let _handle = broker
        .subscribe_property(
            Arc::clone(&store),
            LifecycleStore::ALL_LOGS,
            &observer,
            |seen, change: &PropertyChanged| {
                seen.lock().unwrap().push(change.property().to_string());
            },
        )
        .unwrap();

    let tracked = Arc::new(Counter::default());
    store.track(&tracked).unwrap();
    store.refresh_snapshots();

    assert_eq!(*observer.lock().unwrap(), vec![LifecycleStore::ALL_LOGS.to_string()]);
}

#[test]
fn test_property_subscription_rejects_unknown_name() {
    let store = Arc::new(LifecycleStore::new());
    let observer = Arc::new(Counter::default());
    let broker = WeakSubscriptionBroker::new();

    assert!(store.has_property(LifecycleStore::UPDATED_LOGS));
    let result = broker.subscribe_property(Arc::clone(&store), "no_such_property", &observer, |_, _| {});

    match result {
        Err(AuditError::InvalidArgument(message)) => assert!(message.contains("no_such_property")),
        other => panic!("expected InvalidArgument, got {:?}", other.map(|_| ())),
    }
    assert_eq!(broker.stats().created, 0);

    let id = store.add_handler(Arc::new(|_: &PropertyChanged| {}));
    assert!(store.remove_handler(id));
}

//! Integration tests for Icebox

use icebox::{
    path, value, Store, StoreConfig, StoreError, SubscriberPanic, Subscription, Updater, Value,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

fn counting(store: &Store) -> (Arc<AtomicUsize>, Subscription) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let subscription = store.subscribe(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });
    (calls, subscription)
}

#[test]
fn merge_sets_a_key() {
    let store = Store::new(value!({"count": 0}));
    store.update(value!({"count": 1})).unwrap();
    assert_eq!(store.get_state()["count"].as_i64(), Some(1));
}

#[test]
fn mutation_shares_untouched_subtrees() {
    let store = Store::new(value!({"a": {"b": 1}, "c": 2}));
    let prev = store.get_state();

    store.mutate(|s| s.set("c", 3)).unwrap();

    let next = store.get_state();
    assert!(next["a"].ptr_eq(&prev["a"]));
    assert_eq!(next["c"].as_i64(), Some(3));
}

#[test]
fn merge_preserves_sibling_identity() {
    let store = Store::new(value!({
        "k": "old",
        "list": [1, 2, 3],
        "nested": {"deep": {"x": 1}},
    }));
    let prev = store.get_state();

    store.merge(value!({"k": "new"})).unwrap();

    let next = store.get_state();
    assert_eq!(next["k"].as_str(), Some("new"));
    assert!(next["list"].ptr_eq(&prev["list"]));
    assert!(next["nested"].ptr_eq(&prev["nested"]));
}

#[test]
fn merge_of_equal_nested_value_keeps_identity() {
    let store = Store::new(value!({"nested": {"deep": {"x": 1}}, "n": 0}));
    let prev = store.get_state();
    let (calls, _sub) = counting(&store);

    // freshly built but structurally equal
    store.merge(value!({"nested": {"deep": {"x": 1}}})).unwrap();

    assert!(store.get_state().ptr_eq(&prev));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unsubscribe_stops_notifications() {
    let store = Store::new(value!({}));
    let (calls, subscription) = counting(&store);

    store.merge(value!({"x": 1})).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    subscription.unsubscribe();
    store.merge(value!({"x": 2})).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribe_is_idempotent() {
    let store = Store::new(value!({}));
    let (first, first_sub) = counting(&store);
    let (second, _second_sub) = counting(&store);

    first_sub.unsubscribe();
    first_sub.unsubscribe();
    assert!(!first_sub.is_active());
    assert_eq!(store.subscriber_count(), 1);

    store.merge(value!({"x": 1})).unwrap();
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_update_notifies_once() {
    let store = Store::new(value!({}));
    let (calls, _sub) = counting(&store);

    let handle = store.clone();
    store
        .mutate(move |s| {
            handle.update(value!({"y": 1}))?;
            s.set("z", 2)
        })
        .unwrap();

    let state = store.get_state();
    assert_eq!(state["y"].as_i64(), Some(1));
    assert_eq!(state["z"].as_i64(), Some(2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_update_applies_in_program_order() {
    let store = Store::new(value!({"x": 0}));
    let handle = store.clone();
    store
        .mutate(move |s| {
            handle.update(value!({"x": 1, "y": 1}))?;
            assert_eq!(s.get("y"), Some(&value!(1)));
            s.set("x", 2)
        })
        .unwrap();
    assert_eq!(store.get_state(), value!({"x": 2, "y": 1}));
}

#[test]
fn nested_update_through_the_draft() {
    let store = Store::new(value!({}));
    let (calls, _sub) = counting(&store);

    store
        .mutate(|s| {
            s.update(value!({"y": 1}))?;
            assert_eq!(s.get("y"), Some(&value!(1)));
            s.set("z", 2)
        })
        .unwrap();

    assert_eq!(store.get_state(), value!({"y": 1, "z": 2}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn returned_value_replaces_the_state() {
    let store = Store::new(value!({"count": 0, "other": true}));
    store.produce(|_| Ok(Some(value!({"count": 5})))).unwrap();
    assert_eq!(store.get_state(), value!({"count": 5}));
}

#[test]
fn returned_value_wins_over_draft_edits() {
    let store = Store::new(value!({"a": 1}));
    store
        .produce(|s| {
            s.set("b", 2)?;
            Ok(Some(value!({"c": 3})))
        })
        .unwrap();
    assert_eq!(store.get_state(), value!({"c": 3}));
}

#[test]
fn subscribers_run_in_registration_order() {
    let store = Store::new(value!({"n": 0}));
    let log = Arc::new(Mutex::new(Vec::new()));

    for name in ["A", "B", "C"] {
        let log = log.clone();
        store.subscribe(move || log.lock().unwrap().push(name));
    }

    store.merge(value!({"n": 1})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
}

#[test]
fn subscribing_during_a_pass_waits_for_the_next_change() {
    let store = Store::new(value!({"n": 0}));
    let late_calls = Arc::new(AtomicUsize::new(0));

    let handle = store.clone();
    let late = late_calls.clone();
    let added = Arc::new(AtomicUsize::new(0));
    let added_clone = added.clone();
    store.subscribe(move || {
        if added_clone.fetch_add(1, Ordering::SeqCst) == 0 {
            let late = late.clone();
            handle.subscribe(move || {
                late.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    store.merge(value!({"n": 1})).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 0);

    store.merge(value!({"n": 2})).unwrap();
    assert_eq!(late_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribing_during_a_pass_skips_nobody_else() {
    let store = Store::new(value!({"n": 0}));
    let log = Arc::new(Mutex::new(Vec::new()));
    let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    {
        let log = log.clone();
        let victim = victim.clone();
        store.subscribe(move || {
            log.lock().unwrap().push("A");
            if let Some(sub) = victim.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
    }
    {
        let log = log.clone();
        let sub = store.subscribe(move || log.lock().unwrap().push("B"));
        *victim.lock().unwrap() = Some(sub);
    }
    {
        let log = log.clone();
        store.subscribe(move || log.lock().unwrap().push("C"));
    }

    store.merge(value!({"n": 1})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A", "C"]);

    store.merge(value!({"n": 2})).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A", "C", "A", "C"]);
}

#[test]
fn self_unsubscribe_during_a_pass() {
    let store = Store::new(value!({"n": 0}));
    let calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

    let calls_clone = calls.clone();
    let slot_clone = slot.clone();
    let sub = store.subscribe(move || {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        if let Some(sub) = slot_clone.lock().unwrap().as_ref() {
            sub.unsubscribe();
        }
    });
    *slot.lock().unwrap() = Some(sub);
    let (others, _sub) = counting(&store);

    store.merge(value!({"n": 1})).unwrap();
    store.merge(value!({"n": 2})).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(others.load(Ordering::SeqCst), 2);
}

#[test]
fn subscriber_may_update_the_store() {
    let store = Store::new(value!({"n": 0, "echo": 0}));
    let handle = store.clone();
    store.subscribe(move || {
        let n = handle.select("n").and_then(|v| v.as_i64()).unwrap_or(0);
        handle.merge(value!({"echo": n})).unwrap();
    });

    store.merge(value!({"n": 4})).unwrap();
    assert_eq!(store.get_state(), value!({"n": 4, "echo": 4}));
}

#[test]
fn abort_policy_stops_the_pass() {
    let store = Store::new(value!({"n": 0}));
    store.subscribe(|| panic!("subscriber failed"));
    let (after, _sub) = counting(&store);

    let result = panic::catch_unwind(AssertUnwindSafe(|| store.merge(value!({"n": 1}))));

    assert!(result.is_err());
    assert_eq!(after.load(Ordering::SeqCst), 0);
    // published before notification started
    assert_eq!(store.select("n"), Some(value!(1)));
    assert_eq!(store.subscriber_count(), 2);
}

#[test]
fn deliver_policy_finishes_the_pass_then_panics() {
    let config = StoreConfig::default()
        .with_label("deliver")
        .with_subscriber_panic(SubscriberPanic::Deliver);
    let store = Store::with_config(value!({"n": 0}), config);
    store.subscribe(|| panic!("subscriber failed"));
    let (after, _sub) = counting(&store);

    let result = panic::catch_unwind(AssertUnwindSafe(|| store.merge(value!({"n": 1}))));

    assert!(result.is_err());
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_updater_kind() {
    let store = Store::new(value!({"a": 1}));
    for bad in [value!(1), value!("str"), value!([1, 2]), value!(null)] {
        let err = store.update(bad).unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdaterKind { .. }));
    }
    assert_eq!(store.get_state(), value!({"a": 1}));
}

#[test]
fn scoped_store_round_trip() {
    let store = Store::new(value!({"todos": [{"title": "a", "done": false}]}));
    let first = store.store_for(path!("todos", 0));
    let (calls, _sub) = counting(&store);

    first.merge(value!({"done": true})).unwrap();
    assert_eq!(first.get_state(), Some(value!({"title": "a", "done": true})));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    store.mutate(|s| s.set("todos", Value::array())).unwrap();
    assert_eq!(first.get_state(), None);
}

#[test]
fn updater_for_is_a_plain_function() {
    let store = Store::new(value!({"form": {}}));
    let set_form = store.updater_for("form");
    set_form(Updater::mutate(|form| form.set("email", "a@b.c"))).unwrap();
    assert_eq!(store.select(path!("form", "email")), Some(value!("a@b.c")));

    set_form(value!({"name": "ann"}).into()).unwrap();
    assert_eq!(store.select("form"), Some(value!({"email": "a@b.c", "name": "ann"})));
}

#[test]
fn other_threads_wait_for_the_update_in_flight() {
    let store = Store::new(value!({"log": []}));
    let (calls, _sub) = counting(&store);

    let (started_tx, started_rx) = std::sync::mpsc::channel();
    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            store
                .mutate(move |s| {
                    started_tx.send(()).unwrap();
                    thread::sleep(Duration::from_millis(50));
                    s.push("log", "first")
                })
                .unwrap();
        })
    };

    started_rx.recv().unwrap();
    store.mutate(|s| s.push("log", "second")).unwrap();
    writer.join().unwrap();

    assert_eq!(store.get_state()["log"], value!(["first", "second"]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn snapshots_survive_as_persistence_input() {
    let store = Store::new(value!({"user": {"name": "ann"}, "visits": 3}));
    let saved = serde_json::to_string(&store.get_state()).unwrap();

    let restored = Store::new(serde_json::from_str::<Value>(&saved).unwrap());
    assert_eq!(restored.get_state(), store.get_state());
}

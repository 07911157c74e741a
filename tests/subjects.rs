mod register_emissions;
mod source_failure;

use std::{
    sync::{Arc, Mutex},
    thread,
};

use register_emissions::EmissionRegister;
use source_failure::SourceFailure;

use rxd::subjects::{
    BehaviorSubject, BufSize, ReplaySubject, SerializedBehaviorSubject, SerializedReplaySubject,
    SerializedSubject, Subject,
};
use rxd::subscribe::Subscriber;
use rxd::{Observable, ObservableExt, Observer, Subscribeable};

fn tracking_subscriber(log: &Arc<Mutex<Vec<i32>>>) -> Subscriber<i32> {
    let log = Arc::clone(log);
    Subscriber::new(move |v| log.lock().unwrap().push(v), |_| {}, || {})
}

#[test]
fn subject_delivers_only_post_subscription_values() {
    let a_log = Arc::new(Mutex::new(Vec::new()));
    let b_log = Arc::new(Mutex::new(Vec::new()));

    let (mut stx, mut srx) = Subject::emitter_receiver();

    srx.subscribe(tracking_subscriber(&a_log));
    stx.next(1);

    srx.subscribe(tracking_subscriber(&b_log));
    stx.next(2);

    assert_eq!(*a_log.lock().unwrap(), vec![1, 2]);
    assert_eq!(*b_log.lock().unwrap(), vec![2]);
}

#[test]
fn subject_emitter_as_observer_for_observable() {
    // An emitter converts into a Subscriber, turning the subject into a relay
    // between an observable and many observers.
    let register = EmissionRegister::new();

    let (stx, mut srx) = Subject::emitter_receiver();
    srx.subscribe(register.subscriber());
    srx.subscribe(register.subscriber());

    let mut source = Observable::just([1, 2, 3]);
    source.subscribe(stx.into());

    assert_eq!(register.nexts(), vec![1, 1, 2, 2, 3, 3]);
    assert_eq!(register.complete_count(), 2);
}

#[test]
fn subject_receiver_composes_with_operators() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_c = Arc::clone(&log);

    let (mut stx, srx) = Subject::emitter_receiver();

    srx.clone()
        .filter(|v| v % 2 == 0)
        .map(|v| v * 10)
        .subscribe(Subscriber::on_next(move |v: i32| {
            log_c.lock().unwrap().push(v)
        }));

    for i in 1..=6 {
        stx.next(i);
    }

    assert_eq!(*log.lock().unwrap(), vec![20, 40, 60]);
}

#[test]
fn behavior_subject_full_scenario() {
    // Seeded subject: A sees the seed and everything after; B joins late and
    // sees the stored value and everything after.
    let a_log = Arc::new(Mutex::new(Vec::new()));
    let b_log = Arc::new(Mutex::new(Vec::new()));

    let (mut stx, mut srx) = BehaviorSubject::new(10);

    srx.subscribe(tracking_subscriber(&a_log));
    stx.next(5);
    srx.subscribe(tracking_subscriber(&b_log));
    stx.next(1);

    assert_eq!(*a_log.lock().unwrap(), vec![10, 5, 1]);
    assert_eq!(*b_log.lock().unwrap(), vec![5, 1]);
    assert_eq!(srx.get_value(), 1);
}

#[test]
fn replay_subject_late_subscriber_gets_bounded_history() {
    let b_log = Arc::new(Mutex::new(Vec::new()));

    let (mut stx, mut srx) = ReplaySubject::emitter_receiver(BufSize::Bounded(1));
    stx.next(1);
    stx.next(2);
    stx.next(3);

    srx.subscribe(tracking_subscriber(&b_log));
    assert_eq!(*b_log.lock().unwrap(), vec![3]);
}

#[test]
fn subject_post_error_subscriber_gets_error_only() {
    let register = EmissionRegister::new();

    let (mut stx, mut srx) = Subject::emitter_receiver();
    stx.next(1);
    stx.error(Arc::new(SourceFailure("feed")));

    srx.subscribe(register.subscriber());

    assert!(register.nexts().is_empty());
    assert_eq!(register.complete_count(), 0);
    assert_eq!(register.error_count(), 1);
}

#[test]
fn serialized_subject_concurrent_emitters_lose_nothing() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_c = Arc::clone(&log);

    let (stx, mut srx) = SerializedSubject::<i32>::emitter_receiver();
    srx.subscribe(Subscriber::on_next(move |v: i32| {
        log_c.lock().unwrap().push(v)
    }));

    let mut handles = Vec::new();
    for t in 0..2 {
        let mut stx = stx.clone();
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                stx.next(t * 100 + i);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let mut received = log.lock().unwrap().clone();
    assert_eq!(received.len(), 200);
    received.sort_unstable();
    assert_eq!(received, (0..200).collect::<Vec<_>>());
}

#[test]
fn serialized_behavior_subject_get_value_under_gate() {
    let (mut stx, srx) = SerializedBehaviorSubject::new(1);
    assert_eq!(srx.get_value(), 1);
    stx.next(42);
    assert_eq!(srx.get_value(), 42);
}

#[test]
fn serialized_replay_subject_replays_like_plain_one() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let (mut stx, mut srx) =
        SerializedReplaySubject::emitter_receiver(BufSize::Bounded(2));
    stx.next(1);
    stx.next(2);
    stx.next(3);

    srx.subscribe(tracking_subscriber(&log));
    assert_eq!(*log.lock().unwrap(), vec![2, 3]);
}

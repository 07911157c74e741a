mod register_emissions;
mod source_failure;

use std::sync::{Arc, Mutex};

use register_emissions::EmissionRegister;
use source_failure::SourceFailure;

use rxd::scheduler::NewThreadScheduler;
use rxd::subscribe::Subscriber;
use rxd::{Observable, ObservableExt, Observer, Subscribeable};

#[test]
fn merge_all_observable_of_observables() {
    let register = EmissionRegister::new();

    let mut s = Observable::new(|mut o: Subscriber<Observable<i32>>| {
        o.next(Observable::just([1]));
        o.next(Observable::just([2]));
        o.complete();
    })
    .merge_all();
    s.subscribe(register.subscriber());

    // Values arrive from the inner observables, in subscription order for
    // synchronous inners.
    assert_eq!(register.nexts(), vec![1, 2]);
    assert_eq!(register.complete_count(), 1);
    assert_eq!(register.error_count(), 0);
}

#[test]
fn merge_all_with_never_inner_withholds_completion() {
    let register = EmissionRegister::new();

    let mut s = Observable::new(|mut o: Subscriber<Observable<i32>>| {
        o.next(Observable::never());
        o.next(Observable::just([2]));
        o.complete();
    })
    .merge_all();
    s.subscribe(register.subscriber());

    // The second inner delivers its value, but the silent first inner keeps
    // the merge from completing.
    assert_eq!(register.nexts(), vec![2]);
    assert_eq!(register.complete_count(), 0);
}

#[test]
fn merge_all_with_non_completing_outer_withholds_completion() {
    let register = EmissionRegister::new();

    let mut s = Observable::new(|mut o: Subscriber<Observable<i32>>| {
        o.next(Observable::just([1]));
        o.next(Observable::just([2]));
        // No outer completion.
    })
    .merge_all();
    s.subscribe(register.subscriber());

    assert_eq!(register.nexts(), vec![1, 2]);
    assert_eq!(register.complete_count(), 0);
}

#[test]
fn merge_all_inner_error_terminates_and_cancels() {
    let register = EmissionRegister::new();

    let mut s = Observable::new(|mut o: Subscriber<Observable<i32>>| {
        o.next(Observable::just([1]));
        o.next(Observable::throw(Arc::new(SourceFailure("inner"))));
        // This inner is pushed after the error; the merge is already
        // terminated so it must never be subscribed.
        o.next(Observable::just([2]));
    })
    .merge_all();
    s.subscribe(register.subscriber());

    assert_eq!(register.nexts(), vec![1]);
    assert_eq!(register.error_count(), 1);
    assert_eq!(register.complete_count(), 0);
}

#[test]
fn merge_all_outer_error_before_inners() {
    let register = EmissionRegister::new();

    let mut s = Observable::new(|mut o: Subscriber<Observable<i32>>| {
        o.error(Arc::new(SourceFailure("outer")));
        o.next(Observable::just([1]));
    })
    .merge_all();
    s.subscribe(register.subscriber());

    assert!(register.nexts().is_empty());
    assert_eq!(register.error_count(), 1);
    assert_eq!(register.complete_count(), 0);
}

#[test]
fn merge_with_two_observables() {
    let register = EmissionRegister::new();

    let mut s = Observable::just([1]).merge_with(Observable::just([2]));
    s.subscribe(register.subscriber());

    assert_eq!(register.nexts(), vec![1, 2]);
    assert_eq!(register.complete_count(), 1);
    assert_eq!(register.error_count(), 0);
}

#[test]
fn merge_with_never_withholds_completion_both_orders() {
    let register = EmissionRegister::new();

    let mut s = Observable::<i32>::never().merge_with(Observable::just([2]));
    s.subscribe(register.subscriber());

    assert_eq!(register.nexts(), vec![2]);
    assert_eq!(register.complete_count(), 0);

    let mut s = Observable::just([2]).merge_with(Observable::never());
    s.subscribe(register.subscriber());

    assert_eq!(register.nexts(), vec![2, 2]);
    assert_eq!(register.complete_count(), 0);
}

#[test]
fn merge_with_error_source() {
    let register = EmissionRegister::new();

    let mut s = Observable::<i32>::throw(Arc::new(SourceFailure("left")))
        .merge_with(Observable::just([2]));
    s.subscribe(register.subscriber());

    assert!(register.nexts().is_empty());
    assert_eq!(register.error_count(), 1);
    assert_eq!(register.complete_count(), 0);
}

#[test]
fn merge_vector_of_observables() {
    let register = EmissionRegister::new();

    let mut s = Observable::just([1]).merge(vec![
        Observable::just([2]),
        Observable::just([3]),
        Observable::just([4]),
    ]);
    s.subscribe(register.subscriber());

    assert_eq!(register.nexts(), vec![1, 2, 3, 4]);
    assert_eq!(register.complete_count(), 1);
}

#[test]
fn merge_concurrent_producers_deliver_everything_exactly_once() {
    // Three producers emit on their own scheduler threads; the serial lock in
    // merge keeps downstream calls from interleaving and nothing is lost.
    let nexts = Arc::new(Mutex::new(Vec::new()));
    let nexts_c = Arc::clone(&nexts);
    let (tx, rx) = std::sync::mpsc::channel();

    let a = Observable::just_on(NewThreadScheduler, 0..100);
    let b = Observable::just_on(NewThreadScheduler, 100..200);
    let c = Observable::just_on(NewThreadScheduler, 200..300);

    let mut observer = Subscriber::on_next(move |v: i32| nexts_c.lock().unwrap().push(v));
    observer.on_complete(move || tx.send(()).unwrap());

    let mut s = a.merge(vec![b, c]);
    s.subscribe(observer);

    rx.recv_timeout(std::time::Duration::from_secs(10))
        .expect("merged stream did not complete");

    let mut received = nexts.lock().unwrap().clone();
    received.sort_unstable();
    assert_eq!(received, (0..300).collect::<Vec<_>>());
}

//! Source constructors: observables that originate values instead of
//! transforming them.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    errors::ArcObservableError,
    observable::Observable,
    observer::Observer,
    scheduler::Scheduler,
    subscription::disposable::Disposable,
    subscription::subscribe::Subscriber,
};

impl<T: 'static> Observable<T> {
    /// Creates an observable from a subscribe function. Alias of
    /// [`Observable::new`] kept for pipeline-style call sites.
    pub fn create(sf: impl FnMut(Subscriber<T>) + Send + Sync + 'static) -> Self {
        Observable::new(sf)
    }

    /// Creates an observable that completes immediately without emitting.
    pub fn empty() -> Self {
        Observable::new(|mut o: Subscriber<T>| {
            o.complete();
        })
    }

    /// Creates an observable that never emits and never terminates.
    pub fn never() -> Self {
        Observable::new(|_: Subscriber<T>| {})
    }

    /// Creates an observable that delivers `e` to every subscriber.
    pub fn throw(e: ArcObservableError) -> Self {
        Observable::new(move |mut o: Subscriber<T>| {
            o.error(Arc::clone(&e));
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Creates an observable that synchronously emits the given values in
    /// order, then completes. Values are captured by value; every
    /// subscription receives its own clone of each.
    ///
    /// Disposal is checked between values so a downstream `take` stops the
    /// loop early.
    pub fn just(values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<T> = values.into_iter().collect();
        Observable::new(move |mut o: Subscriber<T>| {
            for v in values.iter().cloned() {
                if o.is_disposed() {
                    return;
                }
                o.next(v);
            }
            o.complete();
        })
    }

    /// Like [`Observable::just`], but the values are captured behind a shared
    /// handle instead of being owned by the observable. Subscription semantics
    /// are identical; only the copy behavior differs.
    pub fn just_shared(values: Arc<Vec<T>>) -> Self {
        Observable::new(move |mut o: Subscriber<T>| {
            for v in values.iter().cloned() {
                if o.is_disposed() {
                    return;
                }
                o.next(v);
            }
            o.complete();
        })
    }

    /// Like [`Observable::just`], but each value is emitted by a task on a
    /// fresh worker of `scheduler`, one value per task in FIFO order.
    ///
    /// The worker stays alive for as long as the subscription does: its task
    /// cancellation handle and the worker itself are both registered in the
    /// subscriber's lifetime.
    pub fn just_on(
        scheduler: impl Scheduler + 'static,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let values: Arc<Vec<T>> = Arc::new(values.into_iter().collect());
        Observable::new(move |o: Subscriber<T>| {
            let worker = scheduler.worker();
            let values = Arc::clone(&values);
            let o = Arc::new(Mutex::new(o));
            let task_o = Arc::clone(&o);
            let mut index = 0;

            let cancel = worker.schedule(
                Duration::ZERO,
                Box::new(move || {
                    let mut o = task_o.lock().unwrap();
                    if o.is_disposed() {
                        return None;
                    }
                    if index < values.len() {
                        o.next(values[index].clone());
                        index += 1;
                        if index < values.len() {
                            return Some(Duration::ZERO);
                        }
                    }
                    o.complete();
                    None
                }),
            );
            // If the worker already finished, the disposed lifetime disposes
            // these handles on registration, which tears the worker down.
            let mut guard = o.lock().unwrap();
            guard.set_upstream(cancel);
            guard.set_upstream(Disposable::new(move || drop(worker)));
        })
    }
}

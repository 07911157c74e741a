//! The `observable` module provides the building blocks for creating and
//! manipulating observables, allowing for reactive programming in Rust.

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex},
};

use crate::{
    errors::EmissionError,
    observer::Observer,
    subscription::disposable::CompositeDisposable,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription},
};

mod sources;

/// The `Observable` struct represents a source of values that can be observed
/// and transformed.
///
/// An observable is nothing more than a stored subscribe function: subscribing
/// hands a [`Subscriber`] to that function, which begins production and wires
/// any cancellation work into the subscriber's lifetime via
/// [`Subscriber::set_upstream`]. Production may finish synchronously before
/// `subscribe` returns, or keep running on other threads or scheduler workers.
///
/// # Example: basic synchronous `Observable`
///
/// This `Observable` emits values and completes. It blocks the calling thread
/// until it completes emission, and it checks for disposal between values so a
/// downstream operator such as `take` can stop it early.
///
/// ```no_run
/// use rxd::subscribe::Subscriber;
/// use rxd::{Observable, Observer, Subscribeable};
///
/// // Create a custom observable that emits values from 1 to 10.
/// let mut emit_10_observable = Observable::new(|mut subscriber: Subscriber<i32>| {
///     for i in 1..=10 {
///         if subscriber.is_disposed() {
///             return;
///         }
///         // Emit the value to the subscriber.
///         subscriber.next(i);
///     }
///     // Signal completion to the subscriber.
///     subscriber.complete();
/// });
///
/// // Create the `Subscriber` with a mandatory `next` function, and an
/// // optional `complete` function. No need for `error` in this example.
/// let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
/// observer.on_complete(|| println!("Completed"));
///
/// // Observables are cold: if you comment out the line below, nothing is
/// // emitted.
/// emit_10_observable.subscribe(observer);
/// ```
///
/// # Example: asynchronous `Observable` with cancellation
///
/// Emits values from a background thread and registers an upstream disposable
/// so that unsubscribing stops the emission loop.
///
/// ```no_run
/// use std::{
///     sync::{
///         atomic::{AtomicBool, Ordering},
///         Arc,
///     },
///     time::Duration,
/// };
///
/// use rxd::subscribe::{Disposable, Subscriber, Unsubscribeable};
/// use rxd::{Observable, ObservableExt, Observer, Subscribeable};
///
/// let observable = Observable::new(|mut o: Subscriber<i32>| {
///     let done = Arc::new(AtomicBool::new(false));
///     let done_c = Arc::clone(&done);
///
///     // Register the stop flag before launching the producer thread.
///     o.set_upstream(Disposable::new(move || done_c.store(true, Ordering::Release)));
///
///     std::thread::spawn(move || {
///         for i in 0..=10_000 {
///             if done.load(Ordering::Acquire) {
///                 break;
///             }
///             o.next(i);
///             std::thread::sleep(Duration::from_millis(1));
///         }
///         o.complete();
///     });
/// });
///
/// let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
/// observer.on_complete(|| println!("Completed"));
///
/// let subscription = observable
///     .filter(|v| v % 2 == 0)
///     .map(|v| format!("Mapped {}", v))
///     .subscribe(observer);
///
/// // Unsubscribing disposes the subscriber's lifetime, which runs the
/// // producer's stop flag through `set_upstream`.
/// subscription.unsubscribe();
/// ```
pub struct Observable<T> {
    subscribe_fn: Box<dyn FnMut(Subscriber<T>) + Send + Sync>,
}

impl<T: 'static> Observable<T> {
    /// Creates a new `Observable` with the provided subscribe function.
    ///
    /// The function is invoked once per subscription with the downstream
    /// [`Subscriber`]. It must respect the observer contract: emit any number
    /// of `next` values followed by at most one terminal event, stop emitting
    /// once the subscriber is disposed, and register cleanup for any
    /// background work through [`Subscriber::set_upstream`].
    pub fn new(sf: impl FnMut(Subscriber<T>) + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Box::new(sf),
        }
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&mut self, subscriber: Subscriber<T>) -> Subscription {
        let lifetime = subscriber.lifetime();
        (self.subscribe_fn)(subscriber);
        Subscription::new(lifetime)
    }
}

// Completion accounting shared by the merge family: one slot for the inner
// streams still running, one flag for the outer stream.
struct MergeState {
    active: usize,
    outer_done: bool,
}

// Builds the subscriber attached to one merged source. All sources forward
// into the same downstream subscriber; the mutex around it is the serial lock
// that keeps concurrent producers from interleaving a single downstream call.
// Each source gets its own composite, registered as a child of the downstream
// lifetime: a source completing only retires that source, while a downstream
// terminal (or an unsubscribe) cancels every source at once.
fn merge_source_subscriber<T: 'static>(
    downstream: &Arc<Mutex<Subscriber<T>>>,
    state: &Arc<Mutex<MergeState>>,
    shared: &CompositeDisposable,
) -> Subscriber<T> {
    let d_next = Arc::clone(downstream);
    let d_error = Arc::clone(downstream);
    let d_complete = Arc::clone(downstream);
    let state = Arc::clone(state);

    let mut subscriber = Subscriber::new(
        move |v| {
            d_next.lock().unwrap().next(v);
        },
        move |e| {
            // First error wins; the downstream latch drops the rest.
            d_error.lock().unwrap().error(e);
        },
        move || {
            let finished = {
                let mut state = state.lock().unwrap();
                state.active -= 1;
                state.outer_done && state.active == 0
            };
            if finished {
                d_complete.lock().unwrap().complete();
            }
        },
    );
    let own = CompositeDisposable::new();
    shared.add(own.as_disposable());
    subscriber.set_lifetime(own);
    subscriber
}

impl<T: 'static> Observable<Observable<T>> {
    /// Flattens an observable of observables by subscribing to every inner
    /// observable as it arrives and multiplexing their emissions into one
    /// output stream.
    ///
    /// Emissions from concurrently running inner observables are serialized:
    /// two inners emitting from distinct threads never interleave a single
    /// downstream call. The output completes once the outer observable and
    /// every inner observable have completed; the first error from any of them
    /// terminates the output and cancels everything else.
    pub fn merge_all(mut self) -> Observable<T> {
        Observable::new(move |o| {
            let shared = o.lifetime();
            let state = Arc::new(Mutex::new(MergeState {
                active: 0,
                outer_done: false,
            }));
            let downstream = Arc::new(Mutex::new(o));

            let d_error = Arc::clone(&downstream);
            let d_complete = Arc::clone(&downstream);
            let d_next = Arc::clone(&downstream);
            let st_next = Arc::clone(&state);
            let st_complete = Arc::clone(&state);
            let shared_next = shared.clone();

            let mut outer = Subscriber::new(
                move |mut inner: Observable<T>| {
                    st_next.lock().unwrap().active += 1;
                    let child = merge_source_subscriber(&d_next, &st_next, &shared_next);
                    inner.subscribe(child);
                },
                move |e| {
                    d_error.lock().unwrap().error(e);
                },
                move || {
                    let finished = {
                        let mut state = st_complete.lock().unwrap();
                        state.outer_done = true;
                        state.active == 0
                    };
                    if finished {
                        d_complete.lock().unwrap().complete();
                    }
                },
            );
            let own = CompositeDisposable::new();
            shared.add(own.as_disposable());
            outer.set_lifetime(own);
            self.subscribe(outer);
        })
    }
}

/// The `ObservableExt` trait provides the operators that can be applied to
/// anything subscribeable, transforming one observable into another.
///
/// Operators chain left to right; each one wraps the downstream subscriber
/// into an upstream-facing subscriber that shares the downstream subscription
/// lifetime, so disposing either end ripples through the whole pipeline.
pub trait ObservableExt<T: 'static>: Subscribeable<ObsType = T> {
    /// Transforms the items emitted by the observable using a transformation
    /// function.
    ///
    /// If `f` panics, the panic is caught at the operator boundary and
    /// surfaced downstream as an [`EmissionError::CallbackPanic`] error.
    fn map<U, F>(mut self, f: F) -> Observable<U>
    where
        Self: Sized + Send + Sync + 'static,
        F: (FnOnce(T) -> U) + Copy + Sync + Send + 'static,
        U: 'static,
    {
        Observable::new(move |o| {
            let lifetime = o.lifetime();
            let o_shared = Arc::new(Mutex::new(o));
            let o_cloned_e = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);

            let mut u = Subscriber::new(
                move |v| match catch_unwind(AssertUnwindSafe(|| f(v))) {
                    Ok(t) => o_shared.lock().unwrap().next(t),
                    Err(payload) => o_shared
                        .lock()
                        .unwrap()
                        .error(EmissionError::from_panic(payload)),
                },
                move |observable_error| {
                    o_cloned_e.lock().unwrap().error(observable_error);
                },
                move || {
                    o_cloned_c.lock().unwrap().complete();
                },
            );
            u.set_lifetime(lifetime);
            self.subscribe(u);
        })
    }

    /// Filters the items emitted by the observable based on a predicate
    /// function. Only items for which the predicate returns `true` are
    /// emitted by the resulting observable.
    fn filter<P>(mut self, predicate: P) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
        P: (FnOnce(&T) -> bool) + Copy + Sync + Send + 'static,
    {
        Observable::new(move |o| {
            let lifetime = o.lifetime();
            let o_shared = Arc::new(Mutex::new(o));
            let o_cloned_e = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);

            let mut u = Subscriber::new(
                move |v| match catch_unwind(AssertUnwindSafe(|| predicate(&v))) {
                    Ok(true) => o_shared.lock().unwrap().next(v),
                    Ok(false) => {}
                    Err(payload) => o_shared
                        .lock()
                        .unwrap()
                        .error(EmissionError::from_panic(payload)),
                },
                move |observable_error| {
                    o_cloned_e.lock().unwrap().error(observable_error);
                },
                move || {
                    o_cloned_c.lock().unwrap().complete();
                },
            );
            u.set_lifetime(lifetime);
            self.subscribe(u);
        })
    }

    /// Emits at most the first `n` items emitted by the observable, then
    /// completes and cancels the upstream through the shared lifetime.
    ///
    /// `take(0)` completes synchronously without subscribing upstream at all.
    fn take(mut self, n: usize) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |mut o| {
            if n == 0 {
                o.complete();
                return;
            }
            let lifetime = o.lifetime();
            let o_shared = Arc::new(Mutex::new(o));
            let o_cloned_e = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);

            let mut remaining = n;
            let mut u = Subscriber::new(
                move |v| {
                    // The downstream latch guarantees this is never entered
                    // with `remaining` at zero.
                    let mut o = o_shared.lock().unwrap();
                    o.next(v);
                    remaining -= 1;
                    if remaining == 0 {
                        o.complete();
                    }
                },
                move |observable_error| {
                    o_cloned_e.lock().unwrap().error(observable_error);
                },
                move || {
                    o_cloned_c.lock().unwrap().complete();
                },
            );
            u.set_lifetime(lifetime);
            self.subscribe(u);
        })
    }

    /// Emits the first item, then completes. If the upstream completes without
    /// having emitted anything, emits an [`EmissionError::NoElements`] error.
    /// Upstream errors are forwarded as-is.
    fn first(mut self) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |o| {
            let lifetime = o.lifetime();
            let o_shared = Arc::new(Mutex::new(o));
            let o_cloned_e = Arc::clone(&o_shared);
            let o_cloned_c = Arc::clone(&o_shared);

            let mut u = Subscriber::new(
                move |v| {
                    let mut o = o_shared.lock().unwrap();
                    o.next(v);
                    o.complete();
                },
                move |observable_error| {
                    o_cloned_e.lock().unwrap().error(observable_error);
                },
                move || {
                    // Reachable only when no value arrived: the first value
                    // completes the downstream, which disposes the shared
                    // lifetime and latches this subscriber.
                    o_cloned_c.lock().unwrap().error(EmissionError::no_elements());
                },
            );
            u.set_lifetime(lifetime);
            self.subscribe(u);
        })
    }

    /// Merges this observable with a vector of observables, emitting items
    /// from all of them concurrently. Completes when every source has
    /// completed; errors as soon as any source errors.
    fn merge(mut self, mut sources: Vec<Observable<T>>) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |o| {
            let shared = o.lifetime();
            let state = Arc::new(Mutex::new(MergeState {
                active: 1 + sources.len(),
                outer_done: true,
            }));
            let downstream = Arc::new(Mutex::new(o));

            let subscriber = merge_source_subscriber(&downstream, &state, &shared);
            self.subscribe(subscriber);

            for source in &mut sources {
                let subscriber = merge_source_subscriber(&downstream, &state, &shared);
                source.subscribe(subscriber);
            }
        })
    }

    /// Merges this observable with one other observable.
    fn merge_with(self, other: Observable<T>) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        self.merge(vec![other])
    }

    /// Erases the concrete subscribeable type, yielding a plain
    /// [`Observable`]. Useful for feeding subject receivers into operators
    /// that expect observables, such as [`Observable::merge_all`].
    fn into_observable(mut self) -> Observable<T>
    where
        Self: Sized + Send + Sync + 'static,
    {
        Observable::new(move |o| {
            self.subscribe(o);
        })
    }
}

impl<T: 'static, S> ObservableExt<T> for S where S: Subscribeable<ObsType = T> {}

use std::{
    mem,
    sync::{Arc, Mutex, Weak},
};

use crate::{
    errors::ArcObservableError,
    observer::Observer,
    subjects::Terminal,
    subscription::disposable::Disposable,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable,
};

/// A `Subject` represents a unique variant of an `Observable` that enables
/// multicasting values to multiple `Observers`.
///
/// Unlike regular `Observables`, which are unicast (each subscribed `Observer`
/// has its independent execution of the `Observable`), `Subjects` are
/// multicast: one producer-facing end feeds every registered subscriber.
///
/// The first terminal event wins and is cached: once the subject has seen an
/// `error` or a `complete`, later terminal events are discarded, later `next`
/// calls do nothing, and every later subscriber receives only the cached
/// terminal.
///
/// You use the `Subject` type by invoking its `emitter_receiver` function to
/// get a [`SubjectEmitter`] for emitting values and a [`SubjectReceiver`] for
/// subscribing to emitted values.
///
/// # Example
///
/// ```no_run
/// use rxd::subjects::Subject;
/// use rxd::subscribe::Subscriber;
/// use rxd::{ObservableExt, Observer, Subscribeable};
///
/// pub fn create_subscriber(subscriber_id: i32) -> Subscriber<i32> {
///     Subscriber::new(
///         move |v| println!("Subscriber #{} emitted: {}", subscriber_id, v),
///         |_| eprintln!("Error"),
///         move || println!("Completed {}", subscriber_id),
///     )
/// }
///
/// // Initialize a `Subject` and obtain its emitter and receiver.
/// let (mut emitter, mut receiver) = Subject::emitter_receiver();
///
/// // Registers `Subscriber` 1.
/// receiver.subscribe(create_subscriber(1));
///
/// emitter.next(101); // Emits 101 to registered `Subscriber` 1.
///
/// // All Observable operators can be applied to the receiver.
/// // Registers mapped `Subscriber` 2.
/// receiver
///     .clone() // Shallow clone: clones only the pointer to the `Subject`.
///     .map(|v| format!("mapped {}", v))
///     .subscribe(Subscriber::on_next(|v| println!("Subscriber #2 emitted: {}", v)));
///
/// emitter.next(102); // Emits 102 to `Subscriber`'s 1 and 2.
///
/// emitter.complete(); // Calls `complete` on `Subscriber`'s 1 and 2.
///
/// // Subscriber 3: post-completion subscribe, completes immediately.
/// receiver.subscribe(create_subscriber(3));
///
/// emitter.next(103); // Called post-completion, does not emit.
/// ```
pub struct Subject<T> {
    observers: Vec<(u64, Arc<Mutex<Subscriber<T>>>)>,
    terminal: Option<Terminal>,
    closed: bool,
}

impl<T: 'static> Subject<T> {
    /// Creates a new pair of `SubjectEmitter` for emitting values and
    /// `SubjectReceiver` for subscribing to values.
    pub fn emitter_receiver() -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(Subject {
            observers: Vec::with_capacity(16),
            terminal: None,
            closed: false,
        }));

        (
            SubjectEmitter(Arc::clone(&s)),
            SubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handler for `Subject`.
///
/// `SubjectReceiver` acts as an `Observable`, allowing you to utilize its
/// `subscribe` method for receiving emissions from the `Subject`'s
/// multicasting. You can also employ its `unsubscribe` method to close the
/// `Subject` and remove registered observers.
#[derive(Clone)]
pub struct SubjectReceiver<T>(Arc<Mutex<Subject<T>>>);

/// Multicasting emitter for `Subject`.
///
/// `SubjectEmitter` acts as an `Observer`, allowing you to utilize its `next`,
/// `error`, and `complete` methods for multicasting emissions to all
/// registered observers within the `Subject`.
#[derive(Clone)]
pub struct SubjectEmitter<T>(Arc<Mutex<Subject<T>>>);

impl<T> SubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Subscribeable for SubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let key = super::next_key();
        let lifetime = v.lifetime();

        let undelivered = {
            let mut src = self.0.lock().unwrap();
            // If Subject is unsubscribed `closed` flag is set. When closed
            // Subject does not emit nor subscribes.
            if src.closed {
                return Subscription::new(lifetime);
            }
            match src.terminal.clone() {
                // The cached terminal is delivered outside the lock; nothing
                // is registered.
                Some(t) => Some((t, v)),
                None => {
                    let entry = Arc::new(Mutex::new(v));
                    src.observers.push((key, Arc::clone(&entry)));
                    drop(src);

                    // Disposing the subscriber removes it from the observer
                    // list. The back-reference is weak so a forgotten
                    // subscription does not keep the whole subject alive.
                    let weak: Weak<Mutex<Subject<T>>> = Arc::downgrade(&self.0);
                    entry
                        .lock()
                        .unwrap()
                        .set_upstream(Disposable::new(move || {
                            if let Some(state) = weak.upgrade() {
                                state
                                    .lock()
                                    .unwrap()
                                    .observers
                                    .retain(|(k, _)| *k != key);
                            }
                        }));
                    None
                }
            }
        };

        if let Some((t, mut v)) = undelivered {
            match t {
                Terminal::Error(e) => v.error(e),
                Terminal::Completed => v.complete(),
            }
        }
        Subscription::new(lifetime)
    }
}

impl<T> Unsubscribeable for SubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone + 'static> Observer for SubjectEmitter<T> {
    type Item = T;

    /// Multicasts `v` to every observer registered at the moment of the call.
    ///
    /// The observer list is snapshotted under the subject mutex and delivery
    /// happens outside of it, so a callback may subscribe, unsubscribe or
    /// dispose freely; observers added during the call do not see the
    /// in-flight value. A callback that re-emits into the subject it is being
    /// called from must go through the `Serialized` variant, which defers the
    /// nested event instead of recursing.
    fn next(&mut self, v: Self::Item) {
        let snapshot: Vec<Arc<Mutex<Subscriber<T>>>> = {
            let src = self.0.lock().unwrap();
            if src.terminal.is_some() || src.closed {
                return;
            }
            src.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for o in snapshot {
            o.lock().unwrap().next(v.clone());
        }
    }

    fn error(&mut self, e: ArcObservableError) {
        let drained = {
            let mut src = self.0.lock().unwrap();
            if src.terminal.is_some() || src.closed {
                return;
            }
            src.terminal = Some(Terminal::Error(Arc::clone(&e)));
            mem::take(&mut src.observers)
        };
        for (_, o) in drained {
            o.lock().unwrap().error(Arc::clone(&e));
        }
    }

    fn complete(&mut self) {
        let drained = {
            let mut src = self.0.lock().unwrap();
            if src.terminal.is_some() || src.closed {
                return;
            }
            src.terminal = Some(Terminal::Completed);
            mem::take(&mut src.observers)
        };
        for (_, o) in drained {
            o.lock().unwrap().complete();
        }
    }
}

impl<T: Clone + Send + 'static> From<SubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SubjectEmitter<T>) -> Self {
        let mut vn = value.clone();
        let mut ve = value.clone();
        let mut vc = value;
        Subscriber::new(
            move |v| {
                vn.next(v);
            },
            move |e| ve.error(e),
            move || vc.complete(),
        )
    }
}

impl<T: Clone + Send + 'static> From<SubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| {
            value.subscribe(subscriber);
        })
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        sync::{Arc, Mutex},
    };

    use crate::{
        observer::Observer, subjects::Subject, subscribe::Subscriber, subscribe::Subscription,
        subscribe::Unsubscribeable, Subscribeable,
    };

    // One shared log for all subscribers a test hands out, so assertions can
    // look at the combined delivery order.
    #[derive(Clone, Default)]
    struct EventLog {
        nexts: Arc<Mutex<Vec<usize>>>,
        completes: Arc<Mutex<usize>>,
        errors: Arc<Mutex<usize>>,
    }

    impl EventLog {
        fn subscriber(&self) -> Subscriber<usize> {
            let nexts = Arc::clone(&self.nexts);
            let errors = Arc::clone(&self.errors);
            let completes = Arc::clone(&self.completes);
            Subscriber::new(
                move |n| nexts.lock().unwrap().push(n),
                move |_| *errors.lock().unwrap() += 1,
                move || *completes.lock().unwrap() += 1,
            )
        }

        fn nexts(&self) -> Vec<usize> {
            self.nexts.lock().unwrap().clone()
        }

        fn complete_count(&self) -> usize {
            *self.completes.lock().unwrap()
        }

        fn error_count(&self) -> usize {
            *self.errors.lock().unwrap()
        }
    }

    #[derive(Debug)]
    struct MyErr;

    impl std::fmt::Display for MyErr {
        fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            Ok(())
        }
    }

    impl Error for MyErr {}

    #[test]
    fn subject_emit_then_complete() {
        let log = EventLog::default();
        let (mut stx, mut srx) = Subject::emitter_receiver();

        // Emissions before anyone subscribed are lost.
        stx.next(1);
        srx.subscribe(log.subscriber());
        assert_eq!(srx.len(), 1);
        assert_eq!(log.nexts(), vec![]);

        stx.next(2);
        stx.next(3);
        assert_eq!(log.nexts(), vec![2, 3]);

        // Two more subscribers join mid-stream and see only later values.
        srx.subscribe(log.subscriber());
        srx.subscribe(log.subscriber());
        stx.next(4);
        assert_eq!(srx.len(), 3);
        assert_eq!(log.nexts(), vec![2, 3, 4, 4, 4]);

        // Completion reaches all three and empties the subject.
        stx.complete();
        assert_eq!(srx.len(), 0);
        assert_eq!(log.complete_count(), 3);

        // A late subscriber gets the cached completion; emissions after the
        // terminal are dropped.
        srx.subscribe(log.subscriber());
        stx.next(5);
        assert_eq!(log.nexts(), vec![2, 3, 4, 4, 4]);
        assert_eq!(log.complete_count(), 4);
        assert_eq!(log.error_count(), 0);
    }

    #[test]
    fn subject_emit_then_error() {
        let log = EventLog::default();
        let (mut stx, mut srx) = Subject::emitter_receiver();

        srx.subscribe(log.subscriber());
        srx.subscribe(log.subscriber());

        stx.next(1);
        stx.next(2);
        assert_eq!(log.nexts(), vec![1, 1, 2, 2]);

        stx.error(Arc::new(MyErr));
        assert_eq!(srx.len(), 0);
        assert_eq!(log.error_count(), 2);
        assert_eq!(log.complete_count(), 0);

        // The error is cached for late subscribers; emissions after the
        // terminal are dropped.
        srx.subscribe(log.subscriber());
        stx.next(3);
        assert_eq!(log.nexts(), vec![1, 1, 2, 2]);
        assert_eq!(log.error_count(), 3);
        assert_eq!(log.complete_count(), 0);
    }

    #[test]
    fn subject_first_terminal_wins() {
        // error followed by complete keeps the error.
        let log = EventLog::default();
        let (mut stx, mut srx) = Subject::emitter_receiver();
        stx.error(Arc::new(MyErr));
        stx.complete();

        srx.subscribe(log.subscriber());
        assert_eq!(log.error_count(), 1);
        assert_eq!(log.complete_count(), 0);

        // complete followed by error keeps the complete.
        let log = EventLog::default();
        let (mut stx, mut srx) = Subject::emitter_receiver();
        stx.complete();
        stx.error(Arc::new(MyErr));

        srx.subscribe(log.subscriber());
        assert_eq!(log.error_count(), 0);
        assert_eq!(log.complete_count(), 1);
    }

    #[test]
    fn subject_unsubscribe_one_of_many() {
        let log = EventLog::default();
        let (mut stx, mut srx) = Subject::emitter_receiver();

        let first = srx.subscribe(log.subscriber());
        srx.subscribe(log.subscriber());

        stx.next(1);
        assert_eq!(log.nexts(), vec![1, 1]);

        // Unsubscribing the first subscriber leaves the second in place.
        first.unsubscribe();
        assert_eq!(srx.len(), 1);

        stx.next(2);
        assert_eq!(log.nexts(), vec![1, 1, 2]);
    }

    #[test]
    fn subject_subscribe_from_inside_next() {
        // A callback subscribing a new observer must not deadlock, and the
        // newly added observer must not see the in-flight value.
        let nexts = Arc::new(Mutex::new(Vec::with_capacity(5)));
        let nexts_outer = Arc::clone(&nexts);
        let nexts_inner = Arc::clone(&nexts);

        let (mut stx, mut srx) = Subject::<i32>::emitter_receiver();
        let mut srx_inner = srx.clone();

        srx.subscribe(Subscriber::on_next(move |v| {
            nexts_outer.lock().unwrap().push(("outer", v));
            let nexts_inner = Arc::clone(&nexts_inner);
            srx_inner.subscribe(Subscriber::on_next(move |v| {
                nexts_inner.lock().unwrap().push(("inner", v));
            }));
        }));

        stx.next(1);
        assert_eq!(*nexts.lock().unwrap(), vec![("outer", 1)]);
        assert_eq!(srx.len(), 2);

        stx.next(2);
        // Both the original observer and one observer added during the first
        // emission see the second value; the observer added during the second
        // emission does not.
        assert_eq!(
            *nexts.lock().unwrap(),
            vec![("outer", 1), ("outer", 2), ("inner", 2)]
        );
        assert_eq!(srx.len(), 3);
    }

    #[test]
    fn subject_unsubscribe_from_inside_next() {
        let nexts = Arc::new(Mutex::new(Vec::with_capacity(5)));
        let nexts_c = Arc::clone(&nexts);

        let (mut stx, mut srx) = Subject::<i32>::emitter_receiver();

        let subscription: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let subscription_c = Arc::clone(&subscription);

        let handle = srx.subscribe(Subscriber::on_next(move |v| {
            nexts_c.lock().unwrap().push(v);
            // Drop the registration while the subject is mid-delivery.
            if let Some(s) = subscription_c.lock().unwrap().take() {
                s.unsubscribe();
            }
        }));
        *subscription.lock().unwrap() = Some(handle);

        stx.next(1);
        assert_eq!(srx.len(), 0);

        stx.next(2);
        assert_eq!(*nexts.lock().unwrap(), vec![1]);
    }
}

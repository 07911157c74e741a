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

/// A variant of `Subject` that requires an initial value and emits its current
/// value whenever it is subscribed to.
///
/// Because there is always a current value, new subscribers receive a value
/// immediately: the seed, or the latest `next`. [`get_value`] reads the
/// current value directly; it keeps returning the last `next` value even after
/// the subject has terminated.
///
/// [`get_value`]: struct.BehaviorSubjectReceiver.html#method.get_value
///
/// # Example
///
/// ```no_run
/// use rxd::subjects::BehaviorSubject;
/// use rxd::subscribe::Subscriber;
/// use rxd::{Observer, Subscribeable};
///
/// // Initialize a `BehaviorSubject` with the seed value 100.
/// let (mut emitter, mut receiver) = BehaviorSubject::new(100);
///
/// // Subscriber 1 receives the seed right away, then live values.
/// receiver.subscribe(Subscriber::on_next(|v| println!("Subscriber #1: {}", v)));
///
/// emitter.next(101); // Emits 101 to Subscriber 1 and stores it.
///
/// // Subscriber 2 receives the stored 101, then live values.
/// receiver.subscribe(Subscriber::on_next(|v| println!("Subscriber #2: {}", v)));
///
/// assert_eq!(receiver.get_value(), 101);
/// ```
pub struct BehaviorSubject<T> {
    current: T,
    observers: Vec<(u64, Arc<Mutex<Subscriber<T>>>)>,
    terminal: Option<Terminal>,
    closed: bool,
}

impl<T: 'static> BehaviorSubject<T> {
    /// Creates a new pair of `BehaviorSubjectEmitter` and
    /// `BehaviorSubjectReceiver`, seeded with `value`.
    pub fn new(value: T) -> (BehaviorSubjectEmitter<T>, BehaviorSubjectReceiver<T>) {
        let s = Arc::new(Mutex::new(BehaviorSubject {
            current: value,
            observers: Vec::with_capacity(16),
            terminal: None,
            closed: false,
        }));

        (
            BehaviorSubjectEmitter(Arc::clone(&s)),
            BehaviorSubjectReceiver(Arc::clone(&s)),
        )
    }
}

/// Subscription handler for `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectReceiver<T>(Arc<Mutex<BehaviorSubject<T>>>);

/// Multicasting emitter for `BehaviorSubject`.
#[derive(Clone)]
pub struct BehaviorSubjectEmitter<T>(Arc<Mutex<BehaviorSubject<T>>>);

impl<T> BehaviorSubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current value: the latest `next`, or the seed if nothing
    /// was emitted yet. Stays readable after a terminal event.
    pub fn get_value(&self) -> T
    where
        T: Clone,
    {
        self.0.lock().unwrap().current.clone()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for BehaviorSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut v: Subscriber<Self::ObsType>) -> Subscription {
        let key = super::next_key();
        let lifetime = v.lifetime();

        // Snapshot the current value (or the cached terminal) under the lock,
        // deliver outside of it.
        let current = {
            let src = self.0.lock().unwrap();
            if src.closed {
                return Subscription::new(lifetime);
            }
            match src.terminal.clone() {
                Some(t) => {
                    drop(src);
                    match t {
                        Terminal::Error(e) => v.error(e),
                        Terminal::Completed => v.complete(),
                    }
                    return Subscription::new(lifetime);
                }
                None => src.current.clone(),
            }
        };

        v.next(current);

        let entry = Arc::new(Mutex::new(v));
        let late_terminal = {
            let mut src = self.0.lock().unwrap();
            // The subject may have terminated while the current value was
            // being delivered; such a subscriber gets the terminal instead of
            // a registration.
            match src.terminal.clone() {
                Some(t) => Some(t),
                None => {
                    src.observers.push((key, Arc::clone(&entry)));
                    None
                }
            }
        };

        match late_terminal {
            Some(Terminal::Error(e)) => entry.lock().unwrap().error(e),
            Some(Terminal::Completed) => entry.lock().unwrap().complete(),
            None => {
                let weak: Weak<Mutex<BehaviorSubject<T>>> = Arc::downgrade(&self.0);
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
            }
        }
        Subscription::new(lifetime)
    }
}

impl<T> Unsubscribeable for BehaviorSubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone + 'static> Observer for BehaviorSubjectEmitter<T> {
    type Item = T;

    fn next(&mut self, v: Self::Item) {
        let snapshot: Vec<Arc<Mutex<Subscriber<T>>>> = {
            let mut src = self.0.lock().unwrap();
            if src.terminal.is_some() || src.closed {
                return;
            }
            // Store first so a subscriber arriving mid-delivery sees the new
            // value.
            src.current = v.clone();
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

impl<T: Clone + Send + 'static> From<BehaviorSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: BehaviorSubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<BehaviorSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: BehaviorSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| {
            value.subscribe(subscriber);
        })
    }
}

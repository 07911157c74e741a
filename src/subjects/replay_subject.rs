use std::{
    collections::VecDeque,
    mem,
    sync::{Arc, Mutex, Weak},
    time::Instant,
};

use crate::{
    errors::ArcObservableError,
    observer::Observer,
    subjects::Terminal,
    subscription::disposable::Disposable,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable,
};

struct EmittedValueEntry<T>(T, Instant);

impl<T> EmittedValueEntry<T> {
    pub fn new(v: T) -> Self {
        EmittedValueEntry(v, Instant::now())
    }

    pub fn is_fresh(&self, window_size_ms: u128) -> bool {
        self.1.elapsed().as_millis() <= window_size_ms
    }
}

/// Specifies the buffer size for replaying previous emissions in
/// `ReplaySubject` when using either [`emitter_receiver`] or
/// [`emitter_receiver_time_aware`].
///
/// [`emitter_receiver`]: struct.ReplaySubject.html#method.emitter_receiver
/// [`emitter_receiver_time_aware`]: struct.ReplaySubject.html#method.emitter_receiver_time_aware
pub enum BufSize {
    /// An infinite buffer size, allowing all emitted values to be replayed.
    Unbounded,

    /// A limited buffer size with the maximum number of values to be replayed.
    Bounded(usize),
}

/// Replaying old values to new subscribers, this variant of `Subject` emits
/// stored values upon subscription.
///
/// Unlike a `BehaviorSubject` holding a single current value, a
/// `ReplaySubject` records and replays a sequence of values, bounded by a
/// maximum buffer size and optionally by a time window. The buffer is trimmed
/// on every emission, and again before each replay so expired values are never
/// replayed.
///
/// Even after termination the buffer is replayed to new subscribers, followed
/// by the cached terminal event.
///
/// # Example
///
/// ```no_run
/// use rxd::subjects::{BufSize, ReplaySubject};
/// use rxd::subscribe::Subscriber;
/// use rxd::{Observer, Subscribeable};
///
/// // Keep the last two values.
/// let (mut emitter, mut receiver) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));
///
/// emitter.next(101);
/// emitter.next(102);
/// emitter.next(103);
///
/// // Prints 102 and 103: the oldest value fell out of the buffer.
/// receiver.subscribe(Subscriber::on_next(|v| println!("Replayed: {}", v)));
/// ```
pub struct ReplaySubject<T> {
    buf_size: BufSize,
    window_size: Option<u128>,
    values: VecDeque<EmittedValueEntry<T>>,
    observers: Vec<(u64, Arc<Mutex<Subscriber<T>>>)>,
    terminal: Option<Terminal>,
    closed: bool,
}

impl<T: 'static> ReplaySubject<T> {
    /// Creates a `ReplaySubject` with a specified buffer size, returning a
    /// `ReplaySubjectEmitter` for emitting values and a
    /// `ReplaySubjectReceiver` for subscribing to emitted values.
    pub fn emitter_receiver(
        buf_size: BufSize,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        Self::make(buf_size, None)
    }

    /// Creates a `ReplaySubject` whose buffer is additionally bounded by time:
    /// values older than `window_size_ms` milliseconds are dropped from the
    /// buffer and never replayed.
    pub fn emitter_receiver_time_aware(
        buf_size: BufSize,
        window_size_ms: u128,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        Self::make(buf_size, Some(window_size_ms))
    }

    fn make(
        buf_size: BufSize,
        window_size: Option<u128>,
    ) -> (ReplaySubjectEmitter<T>, ReplaySubjectReceiver<T>) {
        let values = match buf_size {
            BufSize::Unbounded => VecDeque::with_capacity(16),
            BufSize::Bounded(size) => VecDeque::with_capacity(size),
        };
        let s = Arc::new(Mutex::new(ReplaySubject {
            buf_size,
            window_size,
            values,
            observers: Vec::with_capacity(16),
            terminal: None,
            closed: false,
        }));

        (
            ReplaySubjectEmitter(Arc::clone(&s)),
            ReplaySubjectReceiver(Arc::clone(&s)),
        )
    }
}

impl<T> ReplaySubject<T> {
    // Drop entries that fell out of the size bound or the time window.
    fn trim(&mut self) {
        if let BufSize::Bounded(size) = self.buf_size {
            while self.values.len() > size {
                self.values.pop_front();
            }
        }
        if let Some(window_size_ms) = self.window_size {
            // Retain only fresh values in buffer.
            self.values.retain(|e| e.is_fresh(window_size_ms));
        }
    }
}

/// Subscription handler for `ReplaySubject`.
#[derive(Clone)]
pub struct ReplaySubjectReceiver<T>(Arc<Mutex<ReplaySubject<T>>>);

/// Multicasting emitter for `ReplaySubject`.
#[derive(Clone)]
pub struct ReplaySubjectEmitter<T>(Arc<Mutex<ReplaySubject<T>>>);

impl<T> ReplaySubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().observers.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + 'static> Subscribeable for ReplaySubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, mut v: Subscriber<Self::ObsType>) -> Subscription {
        let key = super::next_key();
        let lifetime = v.lifetime();

        // Trim first so expired values are not replayed, then snapshot the
        // replay set; delivery happens outside the lock.
        let replay: Vec<T> = {
            let mut src = self.0.lock().unwrap();
            if src.closed {
                return Subscription::new(lifetime);
            }
            src.trim();
            src.values.iter().map(|e| e.0.clone()).collect()
        };

        for value in replay {
            v.next(value);
        }

        let entry = Arc::new(Mutex::new(v));
        let late_terminal = {
            let mut src = self.0.lock().unwrap();
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
                let weak: Weak<Mutex<ReplaySubject<T>>> = Arc::downgrade(&self.0);
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

impl<T> Unsubscribeable for ReplaySubjectReceiver<T> {
    fn unsubscribe(self) {
        if let Ok(mut r) = self.0.lock() {
            r.closed = true;
            r.observers.clear();
        }
    }
}

impl<T: Clone + 'static> Observer for ReplaySubjectEmitter<T> {
    type Item = T;

    fn next(&mut self, v: Self::Item) {
        let snapshot: Vec<Arc<Mutex<Subscriber<T>>>> = {
            let mut src = self.0.lock().unwrap();
            if src.terminal.is_some() || src.closed {
                return;
            }
            match src.buf_size {
                BufSize::Bounded(0) => {}
                _ => src.values.push_back(EmittedValueEntry::new(v.clone())),
            }
            src.trim();
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

impl<T: Clone + Send + 'static> From<ReplaySubjectEmitter<T>> for Subscriber<T> {
    fn from(value: ReplaySubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<ReplaySubjectReceiver<T>> for Observable<T> {
    fn from(mut value: ReplaySubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| {
            value.subscribe(subscriber);
        })
    }
}

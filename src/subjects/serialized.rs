//! Thread-serialized subject variants.
//!
//! The plain subjects do not serialize concurrent emitters: two threads
//! calling `next` at the same time may interleave observer notifications. The
//! wrappers here put a reentrant serial gate in front of a plain subject so
//! that cross-thread calls are fully serialized, while a callback calling back
//! into the subject on the same thread is trampolined: the nested event is
//! queued and delivered by the outer call once the current notification
//! finishes.

use std::{cell::RefCell, collections::VecDeque, marker::PhantomData, sync::Arc};

use parking_lot::ReentrantMutex;

use crate::{
    errors::ArcObservableError,
    observer::Observer,
    subjects::{
        BehaviorSubject, BehaviorSubjectEmitter, BehaviorSubjectReceiver, BufSize, ReplaySubject,
        ReplaySubjectEmitter, ReplaySubjectReceiver, Subject, SubjectEmitter, SubjectReceiver,
    },
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
    Observable,
};

enum QueuedEvent<T> {
    Next(T),
    Error(ArcObservableError),
    Complete,
}

struct GateState<T> {
    emitting: bool,
    queue: VecDeque<QueuedEvent<T>>,
}

// The serial gate: a reentrant lock so cross-thread callers block each other,
// plus an emitting flag so a same-thread reentrant call enqueues instead of
// recursing into an observer callback that is still running.
struct SerialGate<T> {
    serial: ReentrantMutex<RefCell<GateState<T>>>,
}

impl<T> SerialGate<T> {
    fn new() -> Arc<Self> {
        Arc::new(SerialGate {
            serial: ReentrantMutex::new(RefCell::new(GateState {
                emitting: false,
                queue: VecDeque::new(),
            })),
        })
    }

    fn deliver<O: Observer<Item = T>>(&self, inner: &mut O, event: QueuedEvent<T>) {
        let guard = self.serial.lock();
        {
            let mut state = guard.borrow_mut();
            if state.emitting {
                state.queue.push_back(event);
                return;
            }
            state.emitting = true;
        }
        dispatch(inner, event);
        // Drain whatever reentrant calls queued while dispatching.
        loop {
            let queued = guard.borrow_mut().queue.pop_front();
            match queued {
                Some(event) => dispatch(inner, event),
                None => break,
            }
        }
        guard.borrow_mut().emitting = false;
    }

    fn locked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.serial.lock();
        f()
    }
}

fn dispatch<O: Observer>(inner: &mut O, event: QueuedEvent<O::Item>) {
    match event {
        QueuedEvent::Next(v) => inner.next(v),
        QueuedEvent::Error(e) => inner.error(e),
        QueuedEvent::Complete => inner.complete(),
    }
}

/// [`Subject`] behind a reentrant serial gate. Safe to feed from multiple
/// threads and to call back into from observer callbacks.
pub struct SerializedSubject<T>(PhantomData<T>);

impl<T: Clone + 'static> SerializedSubject<T> {
    pub fn emitter_receiver() -> (SerializedSubjectEmitter<T>, SerializedSubjectReceiver<T>) {
        let (emitter, receiver) = Subject::emitter_receiver();
        let gate = SerialGate::new();
        (
            SerializedSubjectEmitter {
                inner: emitter,
                gate: Arc::clone(&gate),
            },
            SerializedSubjectReceiver {
                inner: receiver,
                gate,
            },
        )
    }
}

/// Multicasting emitter for `SerializedSubject`.
#[derive(Clone)]
pub struct SerializedSubjectEmitter<T> {
    inner: SubjectEmitter<T>,
    gate: Arc<SerialGate<T>>,
}

/// Subscription handler for `SerializedSubject`.
#[derive(Clone)]
pub struct SerializedSubjectReceiver<T> {
    inner: SubjectReceiver<T>,
    gate: Arc<SerialGate<T>>,
}

impl<T: Clone + 'static> Observer for SerializedSubjectEmitter<T> {
    type Item = T;

    fn next(&mut self, v: Self::Item) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Next(v));
    }

    fn error(&mut self, e: ArcObservableError) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Error(e));
    }

    fn complete(&mut self) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Complete);
    }
}

impl<T> SerializedSubjectReceiver<T> {
    /// Returns the number of registered observers.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: 'static> Subscribeable for SerializedSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let Self { inner, gate } = self;
        gate.locked(|| inner.subscribe(v))
    }
}

impl<T> Unsubscribeable for SerializedSubjectReceiver<T> {
    fn unsubscribe(self) {
        let Self { inner, gate } = self;
        gate.locked(|| inner.unsubscribe());
    }
}

impl<T: Clone + Send + 'static> From<SerializedSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SerializedSubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<SerializedSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SerializedSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| {
            value.subscribe(subscriber);
        })
    }
}

/// [`BehaviorSubject`] behind a reentrant serial gate.
pub struct SerializedBehaviorSubject<T>(PhantomData<T>);

impl<T: Clone + 'static> SerializedBehaviorSubject<T> {
    pub fn new(
        value: T,
    ) -> (
        SerializedBehaviorSubjectEmitter<T>,
        SerializedBehaviorSubjectReceiver<T>,
    ) {
        let (emitter, receiver) = BehaviorSubject::new(value);
        let gate = SerialGate::new();
        (
            SerializedBehaviorSubjectEmitter {
                inner: emitter,
                gate: Arc::clone(&gate),
            },
            SerializedBehaviorSubjectReceiver {
                inner: receiver,
                gate,
            },
        )
    }
}

/// Multicasting emitter for `SerializedBehaviorSubject`.
#[derive(Clone)]
pub struct SerializedBehaviorSubjectEmitter<T> {
    inner: BehaviorSubjectEmitter<T>,
    gate: Arc<SerialGate<T>>,
}

/// Subscription handler for `SerializedBehaviorSubject`.
#[derive(Clone)]
pub struct SerializedBehaviorSubjectReceiver<T> {
    inner: BehaviorSubjectReceiver<T>,
    gate: Arc<SerialGate<T>>,
}

impl<T: Clone + 'static> Observer for SerializedBehaviorSubjectEmitter<T> {
    type Item = T;

    fn next(&mut self, v: Self::Item) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Next(v));
    }

    fn error(&mut self, e: ArcObservableError) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Error(e));
    }

    fn complete(&mut self) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Complete);
    }
}

impl<T> SerializedBehaviorSubjectReceiver<T> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the current value under the serial gate.
    pub fn get_value(&self) -> T
    where
        T: Clone,
    {
        self.gate.locked(|| self.inner.get_value())
    }
}

impl<T: Clone + Send + 'static> Subscribeable for SerializedBehaviorSubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let Self { inner, gate } = self;
        gate.locked(|| inner.subscribe(v))
    }
}

impl<T> Unsubscribeable for SerializedBehaviorSubjectReceiver<T> {
    fn unsubscribe(self) {
        let Self { inner, gate } = self;
        gate.locked(|| inner.unsubscribe());
    }
}

impl<T: Clone + Send + 'static> From<SerializedBehaviorSubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SerializedBehaviorSubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<SerializedBehaviorSubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SerializedBehaviorSubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| {
            value.subscribe(subscriber);
        })
    }
}

/// [`ReplaySubject`] behind a reentrant serial gate.
pub struct SerializedReplaySubject<T>(PhantomData<T>);

impl<T: Clone + 'static> SerializedReplaySubject<T> {
    pub fn emitter_receiver(
        buf_size: BufSize,
    ) -> (
        SerializedReplaySubjectEmitter<T>,
        SerializedReplaySubjectReceiver<T>,
    ) {
        let (emitter, receiver) = ReplaySubject::emitter_receiver(buf_size);
        Self::wrap(emitter, receiver)
    }

    pub fn emitter_receiver_time_aware(
        buf_size: BufSize,
        window_size_ms: u128,
    ) -> (
        SerializedReplaySubjectEmitter<T>,
        SerializedReplaySubjectReceiver<T>,
    ) {
        let (emitter, receiver) =
            ReplaySubject::emitter_receiver_time_aware(buf_size, window_size_ms);
        Self::wrap(emitter, receiver)
    }

    fn wrap(
        emitter: ReplaySubjectEmitter<T>,
        receiver: ReplaySubjectReceiver<T>,
    ) -> (
        SerializedReplaySubjectEmitter<T>,
        SerializedReplaySubjectReceiver<T>,
    ) {
        let gate = SerialGate::new();
        (
            SerializedReplaySubjectEmitter {
                inner: emitter,
                gate: Arc::clone(&gate),
            },
            SerializedReplaySubjectReceiver {
                inner: receiver,
                gate,
            },
        )
    }
}

/// Multicasting emitter for `SerializedReplaySubject`.
#[derive(Clone)]
pub struct SerializedReplaySubjectEmitter<T> {
    inner: ReplaySubjectEmitter<T>,
    gate: Arc<SerialGate<T>>,
}

/// Subscription handler for `SerializedReplaySubject`.
#[derive(Clone)]
pub struct SerializedReplaySubjectReceiver<T> {
    inner: ReplaySubjectReceiver<T>,
    gate: Arc<SerialGate<T>>,
}

impl<T: Clone + 'static> Observer for SerializedReplaySubjectEmitter<T> {
    type Item = T;

    fn next(&mut self, v: Self::Item) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Next(v));
    }

    fn error(&mut self, e: ArcObservableError) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Error(e));
    }

    fn complete(&mut self) {
        let Self { inner, gate } = self;
        gate.deliver(inner, QueuedEvent::Complete);
    }
}

impl<T> SerializedReplaySubjectReceiver<T> {
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for SerializedReplaySubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let Self { inner, gate } = self;
        gate.locked(|| inner.subscribe(v))
    }
}

impl<T> Unsubscribeable for SerializedReplaySubjectReceiver<T> {
    fn unsubscribe(self) {
        let Self { inner, gate } = self;
        gate.locked(|| inner.unsubscribe());
    }
}

impl<T: Clone + Send + 'static> From<SerializedReplaySubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SerializedReplaySubjectEmitter<T>) -> Self {
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

impl<T: Clone + Send + 'static> From<SerializedReplaySubjectReceiver<T>> for Observable<T> {
    fn from(mut value: SerializedReplaySubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| {
            value.subscribe(subscriber);
        })
    }
}

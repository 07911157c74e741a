use crate::{
    errors::ArcObservableError,
    observer::Observer,
    subscription::disposable::{CompositeDisposable, Disposable},
};

pub trait Subscribeable {
    type ObsType;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription;
}

pub trait Unsubscribeable {
    fn unsubscribe(self);
}

/// The concrete observer handed to every subscribe function.
///
/// A `Subscriber` bundles up to three callbacks with the subscription lifetime,
/// a [`CompositeDisposable`] that collects every upstream cancellation handle
/// registered through [`set_upstream`](Subscriber::set_upstream).
///
/// The observer contract is enforced here, in one place, for every producer
/// and operator in the crate:
///
/// - after a terminal event (`error` or `complete`) no further event is
///   delivered; late emissions are silently dropped;
/// - after the lifetime is disposed no further event is delivered;
/// - delivering a terminal event disposes the lifetime before returning, so
///   upstream producers observe the cancellation immediately.
pub struct Subscriber<T> {
    next_fn: Box<dyn FnMut(T) + Send>,
    complete_fn: Option<Box<dyn FnMut() + Send>>,
    error_fn: Option<Box<dyn FnMut(ArcObservableError) + Send>>,
    lifetime: CompositeDisposable,
    terminated: bool,
}

impl<T> Subscriber<T> {
    /// Creates a `Subscriber` with all three callbacks.
    pub fn new(
        next_fnc: impl FnMut(T) + 'static + Send,
        error_fnc: impl FnMut(ArcObservableError) + 'static + Send,
        complete_fnc: impl FnMut() + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fnc),
            complete_fn: Some(Box::new(complete_fnc)),
            error_fn: Some(Box::new(error_fnc)),
            lifetime: CompositeDisposable::new(),
            terminated: false,
        }
    }

    /// Creates a `Subscriber` with only a `next` callback. A completion is a
    /// no-op; an error aborts, see [`Observer::error`] on this type.
    pub fn on_next(next_fnc: impl FnMut(T) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fnc),
            complete_fn: None,
            error_fn: None,
            lifetime: CompositeDisposable::new(),
            terminated: false,
        }
    }

    /// Sets the `complete` callback.
    pub fn on_complete(&mut self, complete_fnc: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fnc));
    }

    /// Sets the `error` callback.
    pub fn on_error(&mut self, error_fnc: impl FnMut(ArcObservableError) + 'static + Send) {
        self.error_fn = Some(Box::new(error_fnc));
    }

    /// Whether this subscriber stopped receiving events, either through a
    /// terminal event or through disposal of its lifetime.
    pub fn is_disposed(&self) -> bool {
        self.terminated || self.lifetime.is_disposed()
    }

    /// Registers an upstream cancellation handle with the subscription
    /// lifetime. If the lifetime is already disposed the handle is disposed
    /// immediately.
    pub fn set_upstream(&mut self, d: Disposable) {
        self.lifetime.add(d);
    }

    /// A shared handle to the subscription lifetime.
    pub fn lifetime(&self) -> CompositeDisposable {
        self.lifetime.clone()
    }

    // Operators substitute the downstream lifetime so that disposing either
    // end of the chain ripples through the whole subscription.
    pub(crate) fn set_lifetime(&mut self, lifetime: CompositeDisposable) {
        self.lifetime = lifetime;
    }
}

impl<T> Observer for Subscriber<T> {
    type Item = T;

    fn next(&mut self, v: T) {
        if self.is_disposed() {
            return;
        }
        (self.next_fn)(v);
    }

    fn error(&mut self, e: ArcObservableError) {
        if self.is_disposed() {
            return;
        }
        // Latch before invoking the callback so reentrant emissions from
        // inside the callback are dropped.
        self.terminated = true;
        match &mut self.error_fn {
            Some(efn) => {
                (efn)(e);
                self.lifetime.dispose();
            }
            None => {
                // Errors must not vanish silently. A subscriber built without
                // an error callback aborts on delivery.
                self.lifetime.dispose();
                tracing::error!(error = %e, "observable error reached a subscriber without an error callback");
                panic!("unhandled observable error: {}", e);
            }
        }
    }

    fn complete(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.terminated = true;
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
        self.lifetime.dispose();
    }
}

/// Handle returned from `subscribe`, wrapping the subscriber's lifetime.
/// Unsubscribing disposes it, which cancels the producer through every
/// upstream handle registered along the chain.
pub struct Subscription {
    lifetime: CompositeDisposable,
}

impl Subscription {
    pub fn new(lifetime: CompositeDisposable) -> Self {
        Subscription { lifetime }
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_disposed()
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(self) {
        self.lifetime.dispose();
    }
}

//! `rxd` is a push-based Reactive Extensions style library: producers
//! ([`Observable`]) emit a sequence of typed values to consumers
//! ([`Subscriber`](subscribe::Subscriber)), terminated by either completion or
//! error, with composable operators inserted between them.
//!
//! Control flows the other way: every subscriber owns a composite
//! [`Disposable`](subscribe::Disposable) collecting the cancellation handles
//! of everything running upstream, and disposing it — directly, through the
//! returned [`Subscription`](subscribe::Subscription), or as the consequence
//! of a terminal event — stops the producers.
//!
//! On top of the unicast observables, the [`subjects`] module provides
//! multicast hubs (publish, behavior, replay and their thread-serialized
//! variants), and the [`scheduler`] module provides the execution contexts
//! (immediate, current-thread trampoline, new thread, thread pool) used by
//! deferred sources.
//!
//! # Example
//!
//! ```no_run
//! use rxd::subscribe::Subscriber;
//! use rxd::{Observable, ObservableExt, Observer, Subscribeable};
//!
//! let mut observer = Subscriber::on_next(|v| println!("{}", v));
//! observer.on_complete(|| println!("done"));
//!
//! Observable::just(1..=10)
//!     .filter(|v| v % 2 == 0)
//!     .map(|v| v * 10)
//!     .take(3)
//!     .subscribe(observer);
//! ```

mod errors;
mod observable;
mod observer;
pub mod scheduler;
pub mod subjects;
mod subscription;

pub use errors::*;
pub use observable::{Observable, ObservableExt};
pub use observer::Observer;
pub use subscription::subscribe::{Subscribeable, Unsubscribeable};

pub mod subscribe {
    //! Re-exports of the subscription building blocks: the concrete
    //! subscriber, the subscription handle and the disposables carrying
    //! cancellation.

    pub use crate::subscription::disposable::{CompositeDisposable, Disposable};
    pub use crate::subscription::subscribe::{
        Subscribeable, Subscriber, Subscription, Unsubscribeable,
    };
}

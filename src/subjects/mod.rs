//! Multicast hubs that are both observer and observable.
//!
//! A subject has two ends: an emitter implementing [`Observer`] and a cloneable
//! receiver implementing [`Subscribeable`]. Values pushed into the emitter are
//! multicast to every subscriber registered through the receiver. The variants
//! differ in what a late subscriber sees: nothing ([`Subject`]), the latest
//! value ([`BehaviorSubject`]), or a bounded history ([`ReplaySubject`]).
//!
//! The plain variants do not serialize concurrent emitters; the `Serialized*`
//! wrappers add a reentrant serial lock for cross-thread producers.
//!
//! [`Observer`]: crate::observer::Observer
//! [`Subscribeable`]: crate::subscription::subscribe::Subscribeable

use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::ArcObservableError;

mod behavior_subject;
mod replay_subject;
mod serialized;
mod subject;

pub use behavior_subject::*;
pub use replay_subject::*;
pub use serialized::*;
pub use subject::*;

// Cached terminal state: set by the first terminal event, consulted by every
// later subscription.
#[derive(Clone)]
pub(crate) enum Terminal {
    Completed,
    Error(ArcObservableError),
}

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

// Observer registrations are keyed so unsubscription can remove an entry
// without comparing boxed callbacks.
pub(crate) fn next_key() -> u64 {
    NEXT_KEY.fetch_add(1, Ordering::Relaxed)
}

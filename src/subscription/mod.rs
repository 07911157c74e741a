//! Provides structures and traits related to subscription management.
//!
//! This module includes types such as `Subscriber` for handling observed
//! values, errors, and completions, `Subscription` for controlling
//! subscriptions to observables and subjects, and the disposables that carry
//! cancellation through an operator chain.

pub mod disposable;
pub mod subscribe;

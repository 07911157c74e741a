use std::{any::Any, sync::Arc};

use thiserror::Error;

/// The opaque error currency of the library. Sources pick the concrete type;
/// operators forward it verbatim.
pub type ArcObservableError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors originated by the library itself rather than by a source.
#[derive(Debug, Error)]
pub enum EmissionError {
    /// The upstream completed without emitting a value where at least one was
    /// required, e.g. `first` on an empty observable.
    #[error("observable completed without emitting any value")]
    NoElements,

    /// A user-supplied function panicked inside an operator. The panic is
    /// caught at the operator boundary and surfaced as a downstream error.
    #[error("callback panicked inside an operator: {what}")]
    CallbackPanic { what: String },
}

impl EmissionError {
    pub fn no_elements() -> ArcObservableError {
        Arc::new(EmissionError::NoElements)
    }

    /// Checks whether an opaque error is this library's `NoElements`.
    pub fn is_no_elements(e: &ArcObservableError) -> bool {
        matches!(
            e.downcast_ref::<EmissionError>(),
            Some(EmissionError::NoElements)
        )
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> ArcObservableError {
        let what = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "opaque panic payload".to_owned());
        Arc::new(EmissionError::CallbackPanic { what })
    }
}

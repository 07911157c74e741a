use crate::errors::ArcObservableError;

/// An `Observer` is a consumer of values delivered by an `Observable`. One
/// method for each kind of notification: `next`, `error` and `complete`.
///
/// `Item` is the type of the elements being emitted; errors are always opaque
/// [`ArcObservableError`] values chosen by the source.
pub trait Observer {
    type Item;

    fn next(&mut self, value: Self::Item);
    fn error(&mut self, e: ArcObservableError);
    fn complete(&mut self);
}

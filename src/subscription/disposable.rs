//! Cancellation handles for subscriptions.
//!
//! A [`Disposable`] is the universal mechanism for ending a subscription: every
//! producer registers one, every observer owns a [`CompositeDisposable`]
//! collecting them, and disposing the composite is the only way to cancel a
//! running chain from the outside.

use std::{
    mem,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

type CleanupFn = Box<dyn FnOnce() + Send>;

struct LeafState {
    disposed: AtomicBool,
    cleanup: Mutex<Option<CleanupFn>>,
}

/// A shareable, thread-safe cancellation handle wrapping an optional cleanup
/// action.
///
/// Cloning a `Disposable` clones the handle, not the state: all clones observe
/// the same `is_disposed` flag and the cleanup action runs at most once no
/// matter how many clones call [`dispose`](Disposable::dispose).
#[derive(Clone)]
pub struct Disposable(Arc<LeafState>);

impl Disposable {
    /// Creates a disposable that runs `action` the first time it is disposed.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Disposable(Arc::new(LeafState {
            disposed: AtomicBool::new(false),
            cleanup: Mutex::new(Some(Box::new(action))),
        }))
    }

    /// Creates a disposable with no cleanup action. Useful as a pure
    /// cancellation flag.
    pub fn empty() -> Self {
        Disposable(Arc::new(LeafState {
            disposed: AtomicBool::new(false),
            cleanup: Mutex::new(None),
        }))
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.load(Ordering::Acquire)
    }

    /// Marks the handle disposed and runs the cleanup action if it has not run
    /// yet. Safe to call any number of times from any thread.
    pub fn dispose(&self) {
        if self.0.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let action = self.0.cleanup.lock().unwrap().take();
        if let Some(action) = action {
            run_cleanup(action);
        }
    }

    pub(crate) fn ptr_eq(&self, other: &Disposable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

fn run_cleanup(action: CleanupFn) {
    // A panicking cleanup must not prevent sibling disposables from being
    // disposed, so the panic stops here.
    if catch_unwind(AssertUnwindSafe(action)).is_err() {
        tracing::warn!("disposable cleanup action panicked; panic swallowed");
    }
}

struct CompositeState {
    disposed: bool,
    children: Vec<Disposable>,
}

/// A disposable owning a set of child disposables.
///
/// Disposing the composite disposes every current child and every child added
/// afterwards (late additions are disposed on insertion). An observer's
/// subscription lifetime is a `CompositeDisposable`; operators chain
/// cancellation by registering their upstream handles into it.
#[derive(Clone)]
pub struct CompositeDisposable(Arc<Mutex<CompositeState>>);

impl CompositeDisposable {
    pub fn new() -> Self {
        CompositeDisposable(Arc::new(Mutex::new(CompositeState {
            disposed: false,
            children: Vec::new(),
        })))
    }

    pub fn is_disposed(&self) -> bool {
        self.0.lock().unwrap().disposed
    }

    /// Registers `child` so it is disposed together with the composite. If the
    /// composite is already disposed, `child` is disposed immediately and not
    /// retained.
    pub fn add(&self, child: Disposable) {
        let already_disposed = {
            let mut state = self.0.lock().unwrap();
            if !state.disposed {
                state.children.push(child.clone());
            }
            state.disposed
        };
        if already_disposed {
            child.dispose();
        }
    }

    /// Removes `child` by identity without disposing it. Returns whether the
    /// child was found.
    pub fn remove(&self, child: &Disposable) -> bool {
        let mut state = self.0.lock().unwrap();
        match state.children.iter().position(|c| c.ptr_eq(child)) {
            Some(index) => {
                state.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Disposes and forgets all current children. The composite itself stays
    /// live and keeps accepting new children.
    pub fn clear(&self) {
        let children = {
            let mut state = self.0.lock().unwrap();
            mem::take(&mut state.children)
        };
        // Children are disposed outside the lock; a cleanup action may call
        // back into this composite.
        for child in children {
            child.dispose();
        }
    }

    pub fn dispose(&self) {
        let children = {
            let mut state = self.0.lock().unwrap();
            if state.disposed {
                return;
            }
            state.disposed = true;
            mem::take(&mut state.children)
        };
        for child in children {
            child.dispose();
        }
    }

    /// Adapts the composite into a leaf `Disposable` so it can be registered
    /// as a child of another composite.
    pub fn as_disposable(&self) -> Disposable {
        let composite = self.clone();
        Disposable::new(move || composite.dispose())
    }
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

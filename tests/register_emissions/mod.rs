use std::sync::{Arc, Mutex};

use rxd::subscribe::Subscriber;

// Shared event register for integration tests. Every subscriber handed out by
// `subscriber()` records into the same register, so a test can subscribe any
// number of observers to a pipeline and assert on the combined sequence of
// values and the number of terminal events afterwards.
#[derive(Clone, Default)]
pub struct EmissionRegister {
    nexts: Arc<Mutex<Vec<i32>>>,
    completes: Arc<Mutex<usize>>,
    errors: Arc<Mutex<usize>>,
}

impl EmissionRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh subscriber recording every callback invocation into this
    /// register.
    pub fn subscriber(&self) -> Subscriber<i32> {
        let nexts = Arc::clone(&self.nexts);
        let errors = Arc::clone(&self.errors);
        let completes = Arc::clone(&self.completes);
        Subscriber::new(
            move |v| nexts.lock().unwrap().push(v),
            move |_| *errors.lock().unwrap() += 1,
            move || *completes.lock().unwrap() += 1,
        )
    }

    /// All values received so far, in delivery order across all subscribers.
    pub fn nexts(&self) -> Vec<i32> {
        self.nexts.lock().unwrap().clone()
    }

    pub fn complete_count(&self) -> usize {
        *self.completes.lock().unwrap()
    }

    pub fn error_count(&self) -> usize {
        *self.errors.lock().unwrap()
    }
}

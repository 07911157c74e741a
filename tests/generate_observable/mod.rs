use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use rxd::subscribe::{Disposable, Subscriber};
use rxd::{Observable, Observer};

// Emits 0..=end from a background thread, checking a stop flag wired into the
// subscriber lifetime between values. `last_emit_assert` runs on the producer
// thread with the last value it managed to emit.
pub(crate) fn generate_u32_observable(
    end: u32,
    last_emit_assert: impl FnMut(u32) + Send + Sync + 'static,
) -> Observable<u32> {
    let last_emit_assert = Arc::new(Mutex::new(last_emit_assert));

    Observable::new(move |mut o: Subscriber<_>| {
        let done = Arc::new(AtomicBool::new(false));
        let done_c = Arc::clone(&done);

        // Unsubscribing flips the flag; the emission loop below sees it on
        // its next iteration.
        o.set_upstream(Disposable::new(move || done_c.store(true, Ordering::Release)));

        let last_emit_assert = Arc::clone(&last_emit_assert);
        std::thread::spawn(move || {
            let mut last_emit = 0;

            for i in 0..=end {
                if done.load(Ordering::Acquire) {
                    break;
                }
                last_emit = i;
                o.next(i);
                // Give unsubscribe a chance to interleave with emissions.
                std::thread::sleep(Duration::from_millis(1));
            }
            o.complete();
            last_emit_assert.lock().unwrap()(last_emit);
        });
    })
}

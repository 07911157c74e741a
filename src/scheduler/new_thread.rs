use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    scheduler::{ScheduledTask, Scheduler, Task, Worker},
    subscription::disposable::Disposable,
};

// Delay-aware task queue drained by exactly one thread. Shared between the
// new-thread workers (one queue, one thread each) and the thread pool (one
// queue per pool thread, many workers).
pub(crate) struct DelayQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

struct QueueState {
    heap: BinaryHeap<Reverse<ScheduledTask>>,
    next_seq: u64,
    stopped: bool,
}

impl DelayQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(DelayQueue {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                stopped: false,
            }),
            available: Condvar::new(),
        })
    }

    pub(crate) fn spawn_drain(self: &Arc<Self>) {
        let queue = Arc::clone(self);
        thread::spawn(move || queue.drain());
    }

    pub(crate) fn push(&self, delay: Duration, task: Task, handle: Disposable) {
        let mut state = self.state.lock();
        if state.stopped {
            // The drain thread is gone; the task can never run.
            drop(state);
            handle.dispose();
            return;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Reverse(ScheduledTask {
            due: Instant::now() + delay,
            seq,
            task,
            handle,
        }));
        self.available.notify_one();
    }

    pub(crate) fn stop(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.heap.clear();
        self.available.notify_all();
    }

    fn drain(&self) {
        tracing::trace!("scheduler worker thread started");
        loop {
            let mut entry = {
                let mut state = self.state.lock();
                loop {
                    if state.stopped {
                        tracing::trace!("scheduler worker thread stopping");
                        return;
                    }
                    let due = match state.heap.peek() {
                        Some(Reverse(next)) => next.due,
                        None => {
                            self.available.wait(&mut state);
                            continue;
                        }
                    };
                    if due > Instant::now() {
                        let _ = self.available.wait_until(&mut state, due);
                        continue;
                    }
                    match state.heap.pop() {
                        Some(Reverse(entry)) => break entry,
                        None => continue,
                    }
                }
            };
            if entry.handle.is_disposed() {
                tracing::trace!("discarding cancelled task");
                continue;
            }
            // The task runs outside the queue lock so it can schedule more
            // work on this worker.
            if let Some(delay) = (entry.task)() {
                if !entry.handle.is_disposed() {
                    self.push(delay, entry.task, entry.handle);
                }
            }
        }
    }
}

/// A worker backed by a dedicated thread draining a delay-aware queue.
pub struct ThreadWorker {
    queue: Arc<DelayQueue>,
    owns_thread: bool,
}

impl ThreadWorker {
    pub fn new() -> Self {
        let queue = DelayQueue::new();
        queue.spawn_drain();
        ThreadWorker {
            queue,
            owns_thread: true,
        }
    }

    pub(crate) fn with_queue(queue: Arc<DelayQueue>) -> Self {
        ThreadWorker {
            queue,
            owns_thread: false,
        }
    }
}

impl Default for ThreadWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Worker for ThreadWorker {
    fn schedule(&self, delay: Duration, task: Task) -> Disposable {
        let handle = Disposable::empty();
        self.queue.push(delay, task, handle.clone());
        handle
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        if self.owns_thread {
            self.queue.stop();
        }
    }
}

/// Spawns one dedicated thread per worker.
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
    fn worker(&self) -> Box<dyn Worker> {
        Box::new(ThreadWorker::new())
    }
}

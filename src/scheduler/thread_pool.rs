use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::scheduler::{
    new_thread::{DelayQueue, ThreadWorker},
    Scheduler, Worker,
};

/// A fixed pool of dedicated threads. Every worker handed out is pinned to one
/// pool thread round-robin, so the per-worker ordering guarantee holds while
/// distinct workers still run in parallel.
pub struct ThreadPoolScheduler {
    queues: Vec<Arc<DelayQueue>>,
    next: AtomicUsize,
}

impl ThreadPoolScheduler {
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let queues = (0..threads)
            .map(|_| {
                let queue = DelayQueue::new();
                queue.spawn_drain();
                queue
            })
            .collect();
        ThreadPoolScheduler {
            queues,
            next: AtomicUsize::new(0),
        }
    }
}

impl Scheduler for ThreadPoolScheduler {
    fn worker(&self) -> Box<dyn Worker> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.queues.len();
        Box::new(ThreadWorker::with_queue(Arc::clone(&self.queues[index])))
    }
}

impl Drop for ThreadPoolScheduler {
    fn drop(&mut self) {
        for queue in &self.queues {
            queue.stop();
        }
    }
}

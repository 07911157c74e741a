use std::{
    cell::{Cell, RefCell},
    cmp::Reverse,
    collections::BinaryHeap,
    thread,
    time::{Duration, Instant},
};

use crate::{
    scheduler::{ScheduledTask, Scheduler, Task, Worker},
    subscription::disposable::Disposable,
};

thread_local! {
    static QUEUE: RefCell<BinaryHeap<Reverse<ScheduledTask>>> = RefCell::new(BinaryHeap::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
    static SEQ: Cell<u64> = const { Cell::new(0) };
}

/// The trampoline scheduler. Each thread has one task queue: the first
/// `schedule` call on a thread drains the queue until it is empty, and any
/// task scheduling more work while the drain is running only enqueues. This
/// turns recursive scheduling into iteration.
pub struct CurrentThreadScheduler;

pub struct CurrentThreadWorker;

fn next_seq() -> u64 {
    SEQ.with(|s| {
        let seq = s.get();
        s.set(seq + 1);
        seq
    })
}

impl Worker for CurrentThreadWorker {
    fn schedule(&self, delay: Duration, task: Task) -> Disposable {
        let handle = Disposable::empty();
        let entry = ScheduledTask {
            due: Instant::now() + delay,
            seq: next_seq(),
            task,
            handle: handle.clone(),
        };
        QUEUE.with(|q| q.borrow_mut().push(Reverse(entry)));

        let draining = DRAINING.with(Cell::get);
        if !draining {
            DRAINING.with(|d| d.set(true));
            drain();
            DRAINING.with(|d| d.set(false));
        }
        handle
    }
}

fn drain() {
    loop {
        let entry = QUEUE.with(|q| q.borrow_mut().pop());
        let mut entry = match entry {
            Some(Reverse(entry)) => entry,
            None => break,
        };
        let now = Instant::now();
        if entry.due > now {
            thread::sleep(entry.due - now);
        }
        if entry.handle.is_disposed() {
            continue;
        }
        if let Some(delay) = (entry.task)() {
            if !entry.handle.is_disposed() {
                // A reschedule counts as a fresh submission.
                entry.due = Instant::now() + delay;
                entry.seq = next_seq();
                QUEUE.with(|q| q.borrow_mut().push(Reverse(entry)));
            }
        }
    }
}

impl Scheduler for CurrentThreadScheduler {
    fn worker(&self) -> Box<dyn Worker> {
        Box::new(CurrentThreadWorker)
    }
}

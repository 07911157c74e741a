use std::{thread, time::Duration};

use crate::{
    scheduler::{Scheduler, Task, Worker},
    subscription::disposable::Disposable,
};

/// Runs every task synchronously on the thread calling `schedule`, including
/// reschedules. `schedule` returns only once the task retires or is cancelled.
pub struct ImmediateScheduler;

pub struct ImmediateWorker;

impl Worker for ImmediateWorker {
    fn schedule(&self, delay: Duration, mut task: Task) -> Disposable {
        let handle = Disposable::empty();
        let mut delay = delay;
        loop {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            if handle.is_disposed() {
                break;
            }
            match task() {
                Some(next) => delay = next,
                None => break,
            }
        }
        handle
    }
}

impl Scheduler for ImmediateScheduler {
    fn worker(&self) -> Box<dyn Worker> {
        Box::new(ImmediateWorker)
    }
}

//! Condition variable tests.

use crate::journal::Journal;
use alloc::format;
use alloc::sync::Arc;
use seos::sync::{Condition, Lock};
use seos::thread::{self, PRI_DEFAULT, ThreadBuilder};

fn spawn_waiters(lock: &Arc<Lock>, cond: &Arc<Condition>, journal: &Arc<Journal>) {
    for pri in [10u32, 20, 30] {
        let lock = lock.clone();
        let cond = cond.clone();
        let journal = journal.clone();
        ThreadBuilder::new(format!("waiter{pri}"))
            .priority(pri)
            .spawn(move || {
                lock.acquire();
                cond.wait(&lock);
                journal.push(pri as i64);
                lock.release();
            })
            .unwrap();
    }
}

pub fn wake_order() {
    let lock = Arc::new(Lock::new());
    let cond = Arc::new(Condition::new());
    let journal = Arc::new(Journal::new());

    spawn_waiters(&lock, &cond, &journal);
    // Drop below the waiters so they can reach their wait.
    thread::set_priority(5);

    for _ in 0..3 {
        lock.acquire();
        cond.signal(&lock);
        lock.release();
    }

    thread::set_priority(PRI_DEFAULT);
    assert_eq!(
        journal.snapshot(),
        [30, 20, 10],
        "signal must wake waiters in priority order"
    );
}

pub fn broadcast_wakes_all() {
    let lock = Arc::new(Lock::new());
    let cond = Arc::new(Condition::new());
    let journal = Arc::new(Journal::new());

    spawn_waiters(&lock, &cond, &journal);
    thread::set_priority(5);

    lock.acquire();
    cond.broadcast(&lock);
    lock.release();

    thread::set_priority(PRI_DEFAULT);
    assert_eq!(journal.snapshot(), [30, 20, 10]);
}

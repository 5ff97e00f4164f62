//! Strict-priority scheduling tests.

use crate::journal::Journal;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use seos::sync::atomic::{AtomicBool, AtomicUsize};
use seos::sync::{Lock, Semaphore};
use seos::thread::{self, PRI_DEFAULT, ThreadBuilder};

pub fn preempt_on_spawn() {
    let ran = Arc::new(AtomicBool::new(false));
    {
        let ran = ran.clone();
        ThreadBuilder::new("high")
            .priority(40)
            .spawn(move || ran.store(true))
            .unwrap();
    }
    assert!(
        ran.load(),
        "a higher-priority thread must run before spawn returns"
    );
}

pub fn set_priority_yields() {
    thread::set_priority(50);

    let ran = Arc::new(AtomicBool::new(false));
    {
        let ran = ran.clone();
        ThreadBuilder::new("mid")
            .priority(40)
            .spawn(move || ran.store(true))
            .unwrap();
    }
    assert!(!ran.load(), "a lower-priority thread must wait its turn");

    thread::set_priority(20);
    assert!(ran.load(), "lowering priority must yield to the waiting thread");
    assert_eq!(thread::get_priority(), 20);

    thread::set_priority(PRI_DEFAULT);
}

pub fn fifo_among_equals() {
    const WORKERS: i64 = 5;
    const ROUNDS: i64 = 3;

    let journal = Arc::new(Journal::new());
    let done = Arc::new(AtomicUsize::new(0));

    for i in 0..WORKERS {
        let journal = journal.clone();
        let done = done.clone();
        ThreadBuilder::new(format!("worker{i}"))
            .spawn(move || {
                for round in 0..ROUNDS {
                    journal.push(round * WORKERS + i);
                    thread::yield_now();
                }
                done.fetch_add(1);
            })
            .unwrap();
    }
    while done.load() != WORKERS as usize {
        thread::yield_now();
    }

    // Each round must visit the workers in spawn order.
    let expected: Vec<i64> = (0..WORKERS * ROUNDS).collect();
    assert_eq!(journal.snapshot(), expected);
}

pub fn sema_wake_order() {
    let sema = Arc::new(Semaphore::new(0));
    let journal = Arc::new(Journal::new());

    for pri in [40u32, 45, 35] {
        let sema = sema.clone();
        let journal = journal.clone();
        ThreadBuilder::new(format!("waiter{pri}"))
            .priority(pri)
            .spawn(move || {
                sema.down();
                journal.push(pri as i64);
            })
            .unwrap();
    }
    assert_eq!(sema.value(), 0);

    for _ in 0..3 {
        sema.up();
    }
    assert_eq!(
        journal.snapshot(),
        [45, 40, 35],
        "up must wake the highest-priority waiter first"
    );
}

pub fn lock_basics() {
    let lock = Lock::new();
    assert!(!lock.held_by_current_thread());

    assert!(lock.try_acquire());
    assert!(lock.held_by_current_thread());
    lock.release();
    assert!(!lock.held_by_current_thread());

    // An uncontended acquire/release pair must not disturb priorities.
    let before = thread::get_priority();
    lock.acquire();
    assert!(lock.held_by_current_thread());
    assert_eq!(thread::get_priority(), before);
    lock.release();
    assert_eq!(thread::get_priority(), before);
}

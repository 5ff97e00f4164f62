//! Priority donation tests.

use crate::journal::Journal;
use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;
use seos::sync::atomic::{AtomicBool, AtomicUsize};
use seos::sync::{Lock, Semaphore};
use seos::thread::{self, PRI_DEFAULT, ThreadBuilder};

pub fn donate_one() {
    let lock = Arc::new(Lock::new());
    let journal = Arc::new(Journal::new());

    lock.acquire();
    {
        let lock = lock.clone();
        let journal = journal.clone();
        ThreadBuilder::new("high")
            .priority(40)
            .spawn(move || {
                lock.acquire();
                journal.push(1);
                lock.release();
            })
            .unwrap();
    }
    // "high" is blocked on the lock and donating to us.
    assert_eq!(thread::get_priority(), 40);
    assert!(journal.snapshot().is_empty());

    // The donation dominates a lower base priority.
    thread::set_priority(10);
    assert_eq!(thread::get_priority(), 40);

    lock.release();
    assert_eq!(thread::get_priority(), 10);
    assert_eq!(journal.snapshot(), [1]);

    thread::set_priority(PRI_DEFAULT);
}

pub fn donate_nested() {
    let a = Arc::new(Lock::new());
    let b = Arc::new(Lock::new());
    let done = Arc::new(AtomicUsize::new(0));

    a.acquire();
    {
        let a = a.clone();
        let b = b.clone();
        let done = done.clone();
        ThreadBuilder::new("mid")
            .priority(32)
            .spawn(move || {
                b.acquire();
                a.acquire();
                a.release();
                b.release();
                done.fetch_add(1);
            })
            .unwrap();
    }
    assert_eq!(thread::get_priority(), 32);

    {
        let b = b.clone();
        let done = done.clone();
        ThreadBuilder::new("top")
            .priority(33)
            .spawn(move || {
                b.acquire();
                b.release();
                done.fetch_add(1);
            })
            .unwrap();
    }
    assert_eq!(
        thread::get_priority(),
        33,
        "nested donation must reach the head of the chain"
    );

    a.release();
    while done.load() != 2 {
        thread::yield_now();
    }
    assert_eq!(thread::get_priority(), PRI_DEFAULT);
}

pub fn donate_multiple() {
    let a = Arc::new(Lock::new());
    let b = Arc::new(Lock::new());
    let done = Arc::new(AtomicUsize::new(0));

    a.acquire();
    b.acquire();
    {
        let a = a.clone();
        let done = done.clone();
        ThreadBuilder::new("h1")
            .priority(40)
            .spawn(move || {
                a.acquire();
                a.release();
                done.fetch_add(1);
            })
            .unwrap();
    }
    assert_eq!(thread::get_priority(), 40);
    {
        let b = b.clone();
        let done = done.clone();
        ThreadBuilder::new("h2")
            .priority(50)
            .spawn(move || {
                b.acquire();
                b.release();
                done.fetch_add(1);
            })
            .unwrap();
    }
    assert_eq!(thread::get_priority(), 50);

    a.release();
    assert_eq!(
        thread::get_priority(),
        50,
        "the donation through the still-held lock must persist"
    );

    b.release();
    while done.load() != 2 {
        thread::yield_now();
    }
    assert_eq!(thread::get_priority(), PRI_DEFAULT);
}

pub fn donate_chain() {
    const CHAIN: usize = 9;

    let locks: Arc<Vec<Lock>> = Arc::new((0..=CHAIN).map(|_| Lock::new()).collect());
    let done = Arc::new(AtomicUsize::new(0));

    locks[0].acquire();
    for i in 1..=8usize {
        let locks = locks.clone();
        let done = done.clone();
        ThreadBuilder::new(format!("link{i}"))
            .priority(31 + i as u32)
            .spawn(move || {
                locks[i].acquire();
                locks[i - 1].acquire();
                locks[i - 1].release();
                locks[i].release();
                done.fetch_add(1);
            })
            .unwrap();
        assert_eq!(thread::get_priority(), 31 + i as u32);
    }
    // Eight hops away: the donation still reaches us.
    assert_eq!(thread::get_priority(), 39);

    {
        let locks = locks.clone();
        let done = done.clone();
        ThreadBuilder::new("link9")
            .priority(40)
            .spawn(move || {
                locks[CHAIN].acquire();
                locks[CHAIN - 1].acquire();
                locks[CHAIN - 1].release();
                locks[CHAIN].release();
                done.fetch_add(1);
            })
            .unwrap();
    }
    // Nine hops away: the walk stops before it gets to us.
    assert_eq!(
        thread::get_priority(),
        39,
        "donation must not propagate past the depth cap"
    );

    locks[0].release();
    while done.load() != CHAIN {
        thread::yield_now();
    }
    assert_eq!(thread::get_priority(), PRI_DEFAULT);
}

pub fn try_acquire_no_donation() {
    let lock = Arc::new(Lock::new());
    let probed = Arc::new(AtomicBool::new(false));

    lock.acquire();
    {
        let lock = lock.clone();
        let probed = probed.clone();
        ThreadBuilder::new("prober")
            .priority(40)
            .spawn(move || {
                assert!(!lock.try_acquire(), "try_acquire must fail on a held lock");
                probed.store(true);
            })
            .unwrap();
    }
    assert!(probed.load());
    assert_eq!(
        thread::get_priority(),
        PRI_DEFAULT,
        "try_acquire must never donate"
    );
    lock.release();
}

pub fn up_resorts_for_donation() {
    let sema = Arc::new(Semaphore::new(0));
    let lock = Arc::new(Lock::new());
    let journal = Arc::new(Journal::new());

    thread::set_priority(20);

    // "low" parks on the semaphore while holding the lock.
    {
        let sema = sema.clone();
        let lock = lock.clone();
        let journal = journal.clone();
        ThreadBuilder::new("low")
            .priority(40)
            .spawn(move || {
                lock.acquire();
                sema.down();
                lock.release();
                journal.push(1);
            })
            .unwrap();
    }
    // "mid" parks behind it with a higher base priority.
    {
        let sema = sema.clone();
        let journal = journal.clone();
        ThreadBuilder::new("mid")
            .priority(45)
            .spawn(move || {
                sema.down();
                journal.push(2);
            })
            .unwrap();
    }
    // "high" donates to "low" while it is parked on the semaphore.
    {
        let lock = lock.clone();
        let journal = journal.clone();
        ThreadBuilder::new("high")
            .priority(55)
            .spawn(move || {
                lock.acquire();
                lock.release();
                journal.push(3);
            })
            .unwrap();
    }

    // The re-sort before the pop must see "low" at its donated priority.
    sema.up();
    sema.up();
    while journal.snapshot().len() < 3 {
        thread::yield_now();
    }
    assert_eq!(journal.snapshot(), [3, 1, 2]);

    thread::set_priority(PRI_DEFAULT);
}

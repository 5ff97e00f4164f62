//! Shared ordering journal for scheduler tests.

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use seos::sync::Lock;

/// Records the order in which test threads reach their checkpoints.
pub struct Journal {
    lock: Lock,
    entries: UnsafeCell<Vec<i64>>,
}

unsafe impl Send for Journal {}
unsafe impl Sync for Journal {}

impl Journal {
    pub fn new() -> Self {
        Self {
            lock: Lock::new(),
            entries: UnsafeCell::new(Vec::new()),
        }
    }

    pub fn push(&self, entry: i64) {
        self.lock.acquire();
        unsafe {
            (*self.entries.get()).push(entry);
        }
        self.lock.release();
    }

    pub fn snapshot(&self) -> Vec<i64> {
        self.lock.acquire();
        let entries = unsafe { (*self.entries.get()).clone() };
        self.lock.release();
        entries
    }
}

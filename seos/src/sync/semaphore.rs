//! Counting semaphore.

use crate::list::List;
use crate::thread::{self, Thread};
use basalt::interrupt::InterruptGuard;
use core::cell::UnsafeCell;

/// A counting semaphore.
///
/// The value counts how many [`down`]s may proceed without blocking.
/// Waiters park in effective-priority order, and [`up`] re-sorts the queue
/// before waking so that a donation received while parked is honored.
///
/// The fields are only ever touched with interrupts disabled, which is
/// what makes the `&self` interface sound on a uniprocessor.
///
/// [`down`]: Semaphore::down
/// [`up`]: Semaphore::up
pub struct Semaphore {
    value: UnsafeCell<usize>,
    waiters: UnsafeCell<List>,
}

unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// Creates a semaphore with `value` permits.
    pub const fn new(value: usize) -> Self {
        Self {
            value: UnsafeCell::new(value),
            waiters: UnsafeCell::new(List::new()),
        }
    }

    /// The current value. Only a snapshot: another thread may change it
    /// before the caller looks at it.
    pub fn value(&self) -> usize {
        let _guard = InterruptGuard::new();
        unsafe { *self.value.get() }
    }

    /// The "P" operation: waits until the value is positive, then
    /// decrements it.
    ///
    /// May block, so it must not be called from interrupt context. It may
    /// be called with interrupts disabled; if it blocks, the next thread
    /// runs with its own interrupt state.
    pub fn down(&self) {
        assert!(!crate::interrupt::context(), "semaphore down from interrupt context");

        let _guard = InterruptGuard::new();
        unsafe {
            while *self.value.get() == 0 {
                let cur = thread::current_ptr();
                (*self.waiters.get()).insert_ordered(&raw mut (*cur).ready_link, thread::ready_less);
                thread::block();
            }
            *self.value.get() -= 1;
        }
    }

    /// The "P" operation, but only if it can succeed immediately. Returns
    /// whether the value was decremented. Never blocks, so it is safe from
    /// interrupt context.
    pub fn try_down(&self) -> bool {
        let _guard = InterruptGuard::new();
        unsafe {
            if *self.value.get() > 0 {
                *self.value.get() -= 1;
                true
            } else {
                false
            }
        }
    }

    /// The "V" operation: wakes the highest-priority waiter, if any, and
    /// increments the value.
    ///
    /// Safe from interrupt context; the preemption check defers to the
    /// handler's return path there.
    pub fn up(&self) {
        {
            let _guard = InterruptGuard::new();
            unsafe {
                let waiters = self.waiters.get();
                if !(*waiters).is_empty() {
                    // Donations may have changed priorities while waiters
                    // were parked.
                    (*waiters).sort(thread::ready_less);
                    if let Some(link) = (*waiters).pop_front() {
                        thread::unblock(Thread::from_ready_link(link.as_ptr()));
                    }
                }
                *self.value.get() += 1;
            }
        }
        thread::preempt();
    }

    /// The highest-priority thread currently parked on this semaphore.
    ///
    /// # Safety
    /// Interrupts must be disabled, and the result is invalidated by the
    /// next wakeup.
    pub(crate) unsafe fn waiters_front(&self) -> Option<*mut Thread> {
        unsafe {
            (*self.waiters.get())
                .front()
                .map(|link| Thread::from_ready_link(link.as_ptr()))
        }
    }
}

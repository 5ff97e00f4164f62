//! Condition variable.

use crate::list::{Link, List};
use crate::sync::{Lock, Semaphore};
use crate::thread;
use basalt::interrupt::InterruptGuard;
use core::cell::UnsafeCell;
use core::mem::offset_of;

/// A condition variable with Mesa semantics.
///
/// Signalling does not transfer the associated lock: a woken waiter simply
/// becomes ready and contends for the lock like anyone else, so callers
/// must re-check their predicate in a loop around [`wait`].
///
/// Each waiting thread parks on its own binary semaphore, allocated on its
/// stack for the duration of the wait. The waiters list orders those slots
/// by the priority of the thread parked on each one, re-sorted at signal
/// time because donations may have moved priorities in the meantime.
///
/// [`wait`]: Condition::wait
pub struct Condition {
    waiters: UnsafeCell<List>,
}

unsafe impl Send for Condition {}
unsafe impl Sync for Condition {}

#[repr(C)]
struct Waiter {
    sema: Semaphore,
    link: Link,
}

impl Waiter {
    unsafe fn from_link(link: *const Link) -> *const Waiter {
        unsafe { link.byte_sub(offset_of!(Waiter, link)) as *const Waiter }
    }
}

/// Priority of the thread parked on a waiter slot. A slot that has just
/// been inserted has no parked thread yet; it sorts lowest until the
/// signal-time re-sort sees the real priority.
unsafe fn parked_priority(waiter: *const Waiter) -> u32 {
    unsafe {
        (*waiter)
            .sema
            .waiters_front()
            .map(|th| (*th).priority)
            .unwrap_or(thread::PRI_MIN)
    }
}

fn waiter_less(a: *const Link, b: *const Link) -> bool {
    unsafe { parked_priority(Waiter::from_link(a)) > parked_priority(Waiter::from_link(b)) }
}

impl Condition {
    /// Creates a condition variable with no waiters.
    pub const fn new() -> Self {
        Self {
            waiters: UnsafeCell::new(List::new()),
        }
    }

    /// Atomically releases `lock` and waits for a signal; reacquires
    /// `lock` before returning.
    ///
    /// The caller must hold `lock`. Because the semantics are Mesa-style,
    /// the condition is not guaranteed to hold on return; re-check it in a
    /// loop.
    pub fn wait(&self, lock: &Lock) {
        assert!(!crate::interrupt::context(), "condition wait from interrupt context");
        assert!(lock.held_by_current_thread(), "condition wait without the lock");

        let mut waiter = Waiter {
            sema: Semaphore::new(0),
            link: Link::new(),
        };
        {
            let _guard = InterruptGuard::new();
            unsafe {
                (*self.waiters.get()).insert_ordered(&raw mut waiter.link, waiter_less);
            }
        }
        lock.release();
        waiter.sema.down();
        lock.acquire();
    }

    /// Wakes the highest-priority waiter, if any.
    ///
    /// The caller must hold `lock`. The wakeup is not atomic with respect
    /// to the lock; see the Mesa note on [`Condition::wait`].
    pub fn signal(&self, lock: &Lock) {
        assert!(!crate::interrupt::context(), "condition signal from interrupt context");
        assert!(lock.held_by_current_thread(), "condition signal without the lock");

        let waiter = {
            let _guard = InterruptGuard::new();
            unsafe {
                let waiters = self.waiters.get();
                if (*waiters).is_empty() {
                    None
                } else {
                    // Priorities may have shifted since the waiters parked.
                    (*waiters).sort(waiter_less);
                    (*waiters).pop_front().map(|link| Waiter::from_link(link.as_ptr()))
                }
            }
        };
        // The popped slot lives on its waiter's stack, which cannot unwind
        // past the wait until this up() lands.
        if let Some(waiter) = waiter {
            unsafe {
                (*waiter).sema.up();
            }
        }
    }

    /// Wakes every waiter, one signal at a time.
    ///
    /// The caller must hold `lock`.
    pub fn broadcast(&self, lock: &Lock) {
        while {
            let _guard = InterruptGuard::new();
            unsafe { !(*self.waiters.get()).is_empty() }
        } {
            self.signal(lock);
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new()
    }
}

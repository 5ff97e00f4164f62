//! Mutual-exclusion lock with priority donation.
//!
//! A lock is a binary semaphore with an owner. Ownership is what makes
//! priority inversion curable: when a thread blocks on a held lock it
//! donates its effective priority to the holder, transitively through a
//! chain of holders that are themselves blocked, so that a low-priority
//! holder cannot be starved by the middle of the priority range while a
//! high-priority thread waits.

use crate::thread::{self, Thread};
use basalt::interrupt::InterruptGuard;
use core::cell::UnsafeCell;
use core::ptr::{null, null_mut};

/// Bound on the number of holders a single donation propagates through.
///
/// The head of a blocked chain is always raised first, so correctness
/// survives the cutoff; deeper holders simply keep the priority they
/// already have.
pub const MAX_DONATION_DEPTH: usize = 8;

/// A mutual-exclusion lock.
///
/// Non-recursive: acquiring a lock the caller already holds is a
/// programmer error and panics. Only the holder may release.
pub struct Lock {
    holder: UnsafeCell<*mut Thread>,
    sema: crate::sync::Semaphore,
}

unsafe impl Send for Lock {}
unsafe impl Sync for Lock {}

impl Lock {
    /// Creates an unheld lock.
    pub const fn new() -> Self {
        Self {
            holder: UnsafeCell::new(null_mut()),
            sema: crate::sync::Semaphore::new(1),
        }
    }

    /// Acquires the lock, blocking until it is available.
    ///
    /// While blocked, the caller donates its effective priority to the
    /// holder, and onward through holders that are themselves blocked on
    /// other locks, up to [`MAX_DONATION_DEPTH`] hops.
    pub fn acquire(&self) {
        assert!(!crate::interrupt::context(), "lock acquire from interrupt context");
        assert!(!self.held_by_current_thread(), "recursive lock acquire");

        let _guard = InterruptGuard::new();
        unsafe {
            let holder = *self.holder.get();
            if !holder.is_null() {
                let cur = thread::current_ptr();
                // Tag which lock this donation came through, so release
                // can withdraw exactly these donations and no others.
                (*cur).waiting_lock = self as *const Lock;
                (*holder)
                    .donors
                    .insert_ordered(&raw mut (*cur).donation_link, thread::donation_less);
                donate(holder, (*cur).priority);
            }
        }
        self.sema.down();
        unsafe {
            let cur = thread::current_ptr();
            *self.holder.get() = cur;
            (*cur).waiting_lock = null();
        }
    }

    /// Tries to acquire the lock without blocking; returns whether it
    /// succeeded.
    ///
    /// Never donates: donation is confined to the blocking path. Safe from
    /// interrupt context.
    pub fn try_acquire(&self) -> bool {
        assert!(!self.held_by_current_thread(), "recursive lock acquire");

        let _guard = InterruptGuard::new();
        if self.sema.try_down() {
            unsafe {
                *self.holder.get() = thread::current_ptr();
            }
            true
        } else {
            false
        }
    }

    /// Releases the lock, which the current thread must hold.
    ///
    /// Donations received through this lock are withdrawn; donations
    /// through other locks the thread still holds persist.
    pub fn release(&self) {
        assert!(
            self.held_by_current_thread(),
            "lock released by a thread that does not hold it"
        );

        {
            let _guard = InterruptGuard::new();
            unsafe {
                let cur = thread::current_ptr();
                let donors = &raw mut (*cur).donors;
                for link in (*donors).iter() {
                    let donor = Thread::from_donation_link(link.as_ptr());
                    if (*donor).waiting_lock == self as *const Lock {
                        (*donors).remove(link.as_ptr());
                    }
                }
                thread::recompute_priority(cur);
                *self.holder.get() = null_mut();
            }
        }
        self.sema.up();
    }

    /// Whether the current thread holds this lock.
    ///
    /// Only meaningful for the current thread; asking about another
    /// thread's ownership would be stale by the time the answer arrives.
    pub fn held_by_current_thread(&self) -> bool {
        let _guard = InterruptGuard::new();
        unsafe { *self.holder.get() == thread::current_ptr() }
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

/// The donation walk. Raises each holder in the blocked chain to at least
/// `priority`, following `waiting_lock` edges, for at most
/// [`MAX_DONATION_DEPTH`] hops.
///
/// Mutates effective priority only; base priorities are untouched.
unsafe fn donate(mut holder: *mut Thread, priority: u32) {
    unsafe {
        for _ in 0..MAX_DONATION_DEPTH {
            if holder.is_null() {
                break;
            }
            if (*holder).priority < priority {
                (*holder).priority = priority;
            }
            let waiting = (*holder).waiting_lock;
            if waiting.is_null() {
                break;
            }
            holder = *(*waiting).holder.get();
        }
    }
}

//! The scheduler.
//!
//! Every suspension point funnels into [`do_schedule`]: the caller stamps
//! its new status, the reaping queue is drained, and [`schedule`] hands the
//! CPU to the highest-priority ready thread, or to the idle thread when
//! the queue is empty. Dying threads cannot free their own stack while
//! still running on it, so they are queued and reclaimed here on the next
//! scheduling point.

use super::{Status, Thread, context_switch, current_ptr, ready_less};
use crate::list::List;
use alloc::boxed::Box;
use basalt::interrupt::InterruptState;
use core::ptr::null_mut;

/// Timer ticks each thread gets before the timer interrupt forces a yield.
pub const TIME_SLICE: u32 = 4;

/// Ticks since the running thread was dispatched.
pub(crate) static mut THREAD_TICKS: u32 = 0;

static mut READY_LIST: List = List::new();
static mut DESTRUCTION_REQ: List = List::new();

static mut IDLE_THREAD: *mut Thread = null_mut();
static mut INITIAL_THREAD: *mut Thread = null_mut();

pub(crate) fn set_idle(th: *mut Thread) {
    unsafe {
        IDLE_THREAD = th;
    }
}

pub(crate) fn idle_thread() -> *mut Thread {
    unsafe { IDLE_THREAD }
}

pub(crate) fn set_initial(th: *mut Thread) {
    unsafe {
        INITIAL_THREAD = th;
    }
}

/// Inserts `th` into the ready queue in effective-priority order.
///
/// # Safety
/// Interrupts must be disabled; `th` must be live and not on another
/// queue through its `ready_link`.
pub(crate) unsafe fn ready_insert(th: *mut Thread) {
    unsafe {
        READY_LIST.insert_ordered(&raw mut (*th).ready_link, ready_less);
    }
}

/// The highest-priority ready thread, without dequeuing it.
///
/// # Safety
/// Interrupts must be disabled.
pub(crate) unsafe fn ready_front() -> Option<*mut Thread> {
    unsafe { READY_LIST.front().map(|link| Thread::from_ready_link(link.as_ptr())) }
}

unsafe fn next_thread_to_run() -> *mut Thread {
    unsafe {
        READY_LIST
            .pop_front()
            .map(|link| Thread::from_ready_link(link.as_ptr()))
            .unwrap_or(IDLE_THREAD)
    }
}

/// Reschedules away from the current thread, whose new status is `status`.
///
/// Precondition: interrupts disabled and the current thread still marked
/// running. If the current thread should remain schedulable the caller
/// must already have re-inserted it into the ready queue.
pub(crate) fn do_schedule(status: Status) {
    unsafe {
        assert_eq!(InterruptState::current(), InterruptState::Off);
        assert_eq!((*current_ptr()).status, Status::Running);

        while let Some(link) = DESTRUCTION_REQ.pop_front() {
            let victim = Thread::from_ready_link(link.as_ptr());
            drop(Box::from_raw(victim));
        }

        (*current_ptr()).status = status;
        schedule();
    }
}

unsafe fn schedule() {
    unsafe {
        let curr = current_ptr();
        let next = next_thread_to_run();

        assert_eq!(InterruptState::current(), InterruptState::Off);
        assert_ne!((*curr).status, Status::Running);
        assert!(!next.is_null());

        (*next).status = Status::Running;

        // Start a new time slice.
        THREAD_TICKS = 0;

        if curr != next {
            // A dying thread's stack is still in use right here; queue it
            // and let the next scheduling point free it.
            if (*curr).status == Status::Dying && curr != INITIAL_THREAD {
                DESTRUCTION_REQ.push_back(&raw mut (*curr).ready_link);
            }
            context_switch(&raw mut (*curr).sp, (*next).sp);
        }
    }
}

//! Scheduler grader.
//!
//! A bootable kernel that runs the scheduler test suite on the initial
//! thread and powers off. A failing assertion panics, which halts the
//! machine with the assertion message on the console.

#![no_std]
#![no_main]

extern crate alloc;
use basalt as _;

mod alarm;
mod condvar;
mod donation;
mod journal;
mod list;
mod priority;

use seos::TestDriver;

#[unsafe(no_mangle)]
fn main() {
    TestDriver::start(&[
        &list::push_pop,
        &list::ordered_insert,
        &list::sort_stable,
        &list::remove_and_refill,
        &priority::preempt_on_spawn,
        &priority::set_priority_yields,
        &priority::fifo_among_equals,
        &priority::sema_wake_order,
        &priority::lock_basics,
        &donation::donate_one,
        &donation::donate_nested,
        &donation::donate_multiple,
        &donation::donate_chain,
        &donation::try_acquire_no_donation,
        &donation::up_resorts_for_donation,
        &condvar::wake_order,
        &condvar::broadcast_wakes_all,
        &alarm::alarm_single,
        &alarm::subtick_delay,
        &alarm::alarm_ordering,
    ]);
}

//! Tick timer and sleep facility.
//!
//! The 8254 interrupts [`TIMER_FREQ`] times a second; each interrupt is
//! one tick, the unit of [`sleep`] and of the scheduler's time slice.
//! Sleeping threads sit on a list ordered by wakeup deadline, so the
//! interrupt handler only ever looks at the front: the scan stops at the
//! first thread whose deadline has not arrived.
//!
//! Delays shorter than a tick cannot block; [`msleep`] and friends fall
//! back to a calibrated busy-wait loop for those.

use crate::list::{Link, List};
use crate::thread::{self, Thread};
use basalt::interrupt::{InterruptGuard, InterruptState, barrier};

/// Timer interrupts per second.
pub const TIMER_FREQ: i64 = 100;

const _: () = assert!(TIMER_FREQ >= 19, "the 8254 timer cannot divide below 19 Hz");
const _: () = assert!(TIMER_FREQ <= 1000, "TIMER_FREQ <= 1000 recommended");

/// Ticks since boot.
static mut TICKS: i64 = 0;

/// Iterations of the busy-wait loop per timer tick, measured by
/// [`calibrate`].
static mut LOOPS_PER_TICK: u64 = 0;

/// Blocked threads keyed by `wakeup_tick`, smallest first.
static mut SLEEP_LIST: List = List::new();

fn sleep_less(a: *const Link, b: *const Link) -> bool {
    unsafe { (*Thread::from_ready_link(a)).wakeup_tick < (*Thread::from_ready_link(b)).wakeup_tick }
}

/// Programs the interval timer and registers the tick handler.
pub fn init() {
    unsafe {
        basalt::dev::pit::init(TIMER_FREQ as u32);
    }
    crate::interrupt::register(32, interrupt);
}

/// The timer interrupt handler.
fn interrupt() {
    unsafe {
        TICKS += 1;
        thread::tick();

        // Release every sleeper whose deadline has arrived.
        let mut woke_any = false;
        while let Some(link) = SLEEP_LIST.front() {
            let th = Thread::from_ready_link(link.as_ptr());
            if (*th).wakeup_tick > TICKS {
                break;
            }
            SLEEP_LIST.pop_front();
            thread::unblock(th);
            woke_any = true;
        }
        if woke_any {
            thread::preempt();
        }
    }
}

/// Ticks since boot.
pub fn ticks() -> i64 {
    let t = {
        let _guard = InterruptGuard::new();
        unsafe { TICKS }
    };
    barrier();
    t
}

/// Ticks elapsed since `then`, which must be a value [`ticks`] returned.
pub fn elapsed(then: i64) -> i64 {
    ticks() - then
}

/// Suspends execution for approximately `t` timer ticks.
///
/// The thread wakes no earlier than `t` ticks from now, and exactly then
/// unless a higher-priority thread holds the CPU.
pub fn sleep(t: i64) {
    let start = ticks();

    assert_eq!(InterruptState::current(), InterruptState::On);
    assert!(!crate::interrupt::context());

    let _guard = InterruptGuard::new();
    unsafe {
        let cur = thread::current_ptr();
        (*cur).wakeup_tick = start + t;
        SLEEP_LIST.insert_ordered(&raw mut (*cur).ready_link, sleep_less);
        thread::block();
    }
}

/// Suspends execution for approximately `ms` milliseconds.
pub fn msleep(ms: i64) {
    real_time_sleep(ms, 1000)
}

/// Suspends execution for approximately `us` microseconds.
pub fn usleep(us: i64) {
    real_time_sleep(us, 1000 * 1000)
}

/// Suspends execution for approximately `ns` nanoseconds.
pub fn nsleep(ns: i64) {
    real_time_sleep(ns, 1000 * 1000 * 1000)
}

/// Prints timer statistics.
pub fn print_stats() {
    println!("Timer: {} ticks", ticks());
}

/// Measures `LOOPS_PER_TICK`, used to implement sub-tick delays.
///
/// Approximates it as the largest power of two that finishes within one
/// tick, then refines the next eight bits.
pub fn calibrate() {
    assert_eq!(InterruptState::current(), InterruptState::On);
    print!("Calibrating timer...  ");

    unsafe {
        LOOPS_PER_TICK = 1 << 10;
        while !too_many_loops(LOOPS_PER_TICK << 1) {
            LOOPS_PER_TICK <<= 1;
            assert!(LOOPS_PER_TICK != 0);
        }

        let high_bit = LOOPS_PER_TICK;
        let mut test_bit = high_bit >> 1;
        while test_bit != high_bit >> 10 {
            if !too_many_loops(high_bit | test_bit) {
                LOOPS_PER_TICK |= test_bit;
            }
            test_bit >>= 1;
        }

        println!("{} loops/s.", LOOPS_PER_TICK as i64 * TIMER_FREQ);
    }
}

/// Whether `loops` iterations of the busy-wait loop span more than one
/// timer tick.
fn too_many_loops(loops: u64) -> bool {
    // Wait for a fresh tick so the measurement starts on a boundary.
    let start = ticks();
    while ticks() == start {
        barrier();
    }

    let start = ticks();
    busy_wait(loops as i64);

    barrier();
    start != ticks()
}

/// Spins for `loops` iterations.
///
/// Marked `inline(never)` because code alignment changes the loop's
/// timing; inlined copies would each calibrate differently.
#[inline(never)]
fn busy_wait(mut loops: i64) {
    while loops > 0 {
        loops -= 1;
        barrier();
    }
}

/// Suspends execution for approximately `num / denom` seconds: as whole
/// ticks if the interval is at least one tick, otherwise by busy-waiting.
fn real_time_sleep(num: i64, denom: i64) {
    // (num / denom) s / (1 / TIMER_FREQ) ticks/s, rounded down.
    let t = num * TIMER_FREQ / denom;

    assert_eq!(InterruptState::current(), InterruptState::On);
    if t > 0 {
        sleep(t);
    } else {
        // Scale num and denom down to avoid overflow in the product.
        assert!(denom % 1000 == 0);
        unsafe {
            busy_wait(LOOPS_PER_TICK as i64 * num / 1000 * TIMER_FREQ / (denom / 1000));
        }
    }
}

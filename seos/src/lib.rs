//! # SEOS: a small educational operating system kernel.
//!
//! SEOS is a preemptive, strict-priority thread scheduler with priority
//! donation, packaged as a minimal kernel: threads, counting semaphores,
//! locks with priority inheritance, Mesa-style condition variables, and a
//! tick-driven sleep facility. There is no user mode; everything runs as
//! kernel threads on a single CPU, and mutual exclusion comes from the
//! interrupt gate alone.
//!
//! The crate boots through [`basalt`], the machine-dependent layer, which
//! calls [`rust_main`] on an aligned boot stack. From there the heap comes
//! up, the currently-executing code becomes the initial thread, the timer
//! starts ticking, and control passes to the `main` the linked binary
//! provides.
//!
//! ## Module map
//!
//! - [`thread`] — the thread entity, ready queue and scheduler.
//! - [`sync`] — semaphores, locks with donation, condition variables.
//! - [`timer`] — the tick counter and the sleep list.
//! - [`list`] — the intrusive ordered list every queue is built from.
//! - [`interrupt`] — external interrupt registry and deferral flags.
//! - [`mm`] — the kernel heap.

#![no_std]
#![feature(allocator_api)]
#![allow(static_mut_refs)]

#[macro_use]
extern crate basalt;
extern crate alloc;

pub mod interrupt;
mod lang;
pub mod list;
pub mod mm;
pub mod sync;
pub mod thread;
pub mod timer;

pub use basalt::{QUIET, debug, info, print, println, warning};

/// Enum representing errors that can occur during a kernel operation.
///
/// Contract violations do not get a variant: blocking from an interrupt
/// handler, recursive lock acquisition and the like are programmer errors
/// and halt the kernel.
#[derive(Debug, Eq, PartialEq)]
pub enum KernelError {
    /// Out of memory. (ENOMEM)
    NoMemory,
}

/// The entry of the kernel proper, called by basalt's boot path with
/// interrupts disabled on the aligned boot stack.
///
/// Brings up each subsystem in dependency order and then hands control to
/// the `main` function the linked binary defines. When `main` returns the
/// machine powers off.
#[unsafe(no_mangle)]
pub unsafe extern "Rust" fn rust_main(heap: basalt::boot::Region) -> ! {
    info!("seos: {} MiB heap at {:#x}", heap.len >> 20, heap.start);
    mm::init(heap);
    basalt::idt::init();
    thread::init();
    timer::init();
    // The legacy PIC raises these on spurious lines even when masked.
    interrupt::register(39, || {});
    interrupt::register(47, || {});
    thread::start();
    timer::calibrate();

    unsafe extern "Rust" {
        fn main();
    }
    unsafe {
        main();
    }

    thread::print_stats();
    timer::print_stats();
    basalt::power::power_off()
}

/// A single in-kernel test.
pub trait TestCase
where
    Self: Sync,
{
    /// The test's name, as printed by the driver.
    fn name(&self) -> &'static str;
    /// Runs the test. Failure is a panic, which halts the kernel with the
    /// assertion message.
    fn run(&self);
}

impl<T> TestCase for T
where
    T: Fn() + Sync,
{
    fn name(&self) -> &'static str {
        core::any::type_name::<T>()
    }
    fn run(&self) {
        self()
    }
}

/// A driver for running tests.
pub struct TestDriver;

impl TestDriver {
    /// Runs the given tests in order on the calling thread.
    pub fn start(tests: &[&dyn TestCase]) {
        let total = tests.len();
        println!("Running {} test{}", total, if total == 1 { "" } else { "s" });
        for test in tests {
            print!("test {} ... ", test.name());
            test.run();
            println!("ok");
        }
        println!("test result: ok. {total} passed; 0 failed");
    }
}

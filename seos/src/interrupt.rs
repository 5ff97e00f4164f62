//! Interrupt management.
//!
//! Basalt owns the IDT; this module owns what happens once a vector fires.
//! External handlers are registered per vector, and the two pieces of state
//! the scheduler cares about live here: whether we are currently inside an
//! external interrupt handler, and whether that handler asked the
//! interrupted thread to yield once the handler is done.

use crate::thread;

const NR_VECTORS: usize = 224;
const INIT: Option<fn()> = None;

static mut HANDLERS: [Option<fn()>; NR_VECTORS] = [INIT; NR_VECTORS];

static mut IN_EXTERNAL: bool = false;
static mut YIELD_ON_RETURN: bool = false;

/// Registers `handler` for interrupt vector `vector` (32 or above).
///
/// Handlers run with interrupts disabled and must not block.
pub fn register(vector: usize, handler: fn()) {
    assert!((32..32 + NR_VECTORS).contains(&vector), "invalid vector {vector}");
    let _guard = basalt::interrupt::InterruptGuard::new();
    unsafe {
        HANDLERS[vector - 32] = Some(handler);
    }
}

/// Whether the caller is running inside an external interrupt handler.
///
/// Operations that can block assert this is false.
pub fn context() -> bool {
    unsafe { IN_EXTERNAL }
}

/// Asks the scheduler to yield the interrupted thread when the current
/// interrupt handler returns. Only meaningful from within a handler.
pub(crate) fn yield_on_return() {
    assert!(context());
    unsafe {
        YIELD_ON_RETURN = true;
    }
}

#[doc(hidden)]
#[unsafe(no_mangle)]
pub fn do_handle_interrupt(vector: usize) {
    // The CPU cleared IF when it took the interrupt gate.
    let handler = unsafe {
        IN_EXTERNAL = true;
        HANDLERS[vector - 32]
    };

    match handler {
        Some(handler) => handler(),
        None => panic!("Unknown interrupt #{vector}"),
    }

    let yield_requested = unsafe {
        IN_EXTERNAL = false;
        core::mem::replace(&mut YIELD_ON_RETURN, false)
    };
    if yield_requested {
        // Still on the interrupted thread's stack; the switch parks the
        // whole handler frame and resumes it when the thread is next
        // scheduled.
        thread::yield_now();
    }
}

//! The interrupt gate.
//!
//! On a uniprocessor the only concurrent actor against the running thread is
//! an interrupt handler, so disabling interrupts for the duration of a
//! critical section is the kernel's one and only mutual exclusion mechanism.
//! All of the scheduler's critical sections follow the same pattern: save
//! the prior interrupt level, disable, do the work, restore.

use core::sync::atomic::{Ordering, compiler_fence};
use x86_64::instructions::interrupts;

/// Enumeration representing the interrupt state.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum InterruptState {
    /// Interrupts are enabled.
    On,
    /// Interrupts are disabled.
    Off,
}

impl InterruptState {
    /// Reads the current interrupt state.
    ///
    /// # Returns
    /// - [`InterruptState::On`] if interrupts are enabled.
    /// - [`InterruptState::Off`] if interrupts are disabled.
    pub fn current() -> Self {
        if interrupts::are_enabled() {
            Self::On
        } else {
            Self::Off
        }
    }

    /// Enables external interrupts.
    ///
    /// # Safety
    /// The caller must not hold an [`InterruptGuard`] whose critical section
    /// is still in progress.
    pub unsafe fn enable() {
        interrupts::enable();
    }

    /// Disables external interrupts.
    ///
    /// # Safety
    /// The caller becomes responsible for re-enabling interrupts; prefer
    /// [`InterruptGuard`] unless the disable must outlive the scope.
    pub unsafe fn disable() {
        interrupts::disable();
    }
}

/// An RAII-based guard for managing interrupt disabling.
///
/// When an `InterruptGuard` is created, interrupts are disabled. When it is
/// dropped, the interrupt state is restored to what it was before the guard
/// was created; restoring an already-disabled state is a no-op, so guards
/// nest freely.
///
/// `InterruptGuard` instances must be dropped in reverse order of their
/// creation. Rust's scoping rules uphold this unless a guard is stored in a
/// struct field or `drop()` is called out of order.
pub struct InterruptGuard {
    was_enabled: bool,
}

impl !Send for InterruptGuard {}
impl !Sync for InterruptGuard {}

impl InterruptGuard {
    /// Creates a new `InterruptGuard`, disabling interrupts.
    pub fn new() -> Self {
        let was_enabled = interrupts::are_enabled();
        interrupts::disable();
        compiler_fence(Ordering::SeqCst);
        Self { was_enabled }
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        compiler_fence(Ordering::SeqCst);
        if self.was_enabled {
            interrupts::enable();
        }
    }
}

/// Forbids the compiler from reordering memory accesses across this point.
///
/// The timer calibration loops poll a counter mutated by the interrupt
/// handler; without the barrier the compiler would be free to hoist the
/// read out of the loop.
#[inline]
pub fn barrier() {
    compiler_fence(Ordering::SeqCst);
}

/// Atomically enables interrupts and halts until the next one arrives.
///
/// The idle thread uses this so that a wakeup interrupt cannot slip in
/// between the `sti` and the `hlt`.
#[inline]
pub fn enable_and_halt() {
    interrupts::enable_and_hlt();
}

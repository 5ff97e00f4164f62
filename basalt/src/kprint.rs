//! Kernel print utilities.

use core::fmt::Write;

#[doc(hidden)]
pub fn _print(fmt: core::fmt::Arguments<'_>) {
    // Interrupt handlers print too; take the gate so a handler cannot
    // deadlock against a thread holding the console lock.
    let _guard = crate::interrupt::InterruptGuard::new();
    let _ = write!(&mut *crate::dev::serial::SERIAL1.lock(), "{fmt}");
}

/// Force unlocking the console.
///
/// Only the panic path may call this; the panicking context may have been
/// holding the console lock.
#[doc(hidden)]
pub unsafe fn force_unlock() {
    unsafe {
        crate::dev::serial::SERIAL1.force_unlock();
    }
}

/// Prints out the message.
///
/// Use the format! syntax to write data to the console device.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::kprint::_print(format_args!($($arg)*)));
}

/// Prints out the message with a newline.
///
/// Use the format! syntax to write data to the console device.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// Display an information message.
#[macro_export]
macro_rules! info {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[INFO]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[INFO] {}\n", format_args!($($arg)*)) });
}

/// Display a warning message.
#[macro_export]
macro_rules! warning {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[WARN]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[WARN] {}\n", format_args!($($arg)*)) });
}

/// Display a debug message.
#[macro_export]
macro_rules! debug {
    () => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[DEBUG]\n") });
    ($($arg:tt)*) => (if !$crate::QUIET.load(core::sync::atomic::Ordering::SeqCst) { $crate::print!("[DEBUG] {}\n", format_args!($($arg)*)) });
}

//! Basalt: the machine-dependent layer of the SEOS kernel.
//!
//! Everything that talks to the CPU or a device directly lives here: the
//! Limine boot path, the interrupt gate, the IDT and the legacy PIC, the
//! 8254 interval timer, the COM1 console, and the power-off escape hatch.
//! The kernel proper is machine-independent and reaches the hardware only
//! through this crate.

#![no_std]
#![feature(abi_x86_interrupt, negative_impls)]

pub mod boot;
pub mod dev;
pub mod idt;
pub mod interrupt;
pub mod kprint;
pub mod power;

/// Suppresses [`info!`]/[`warning!`]/[`debug!`] output when set.
pub static QUIET: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

//! A wrapper around [`core::sync::atomic`].
//!
//! Kernel flags and test scaffolding have no use for relaxed orderings;
//! these wrappers pin every operation to `SeqCst` so call sites stay free
//! of ordering noise.

use core::sync::atomic::Ordering;

/// A boolean type which can be safely shared between threads.
#[derive(Default)]
pub struct AtomicBool(core::sync::atomic::AtomicBool);

impl AtomicBool {
    /// Creates a new `AtomicBool`.
    #[inline]
    #[must_use]
    pub const fn new(v: bool) -> Self {
        Self(core::sync::atomic::AtomicBool::new(v))
    }

    /// Loads the value.
    #[inline]
    pub fn load(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Stores `v`.
    #[inline]
    pub fn store(&self, v: bool) {
        self.0.store(v, Ordering::SeqCst)
    }

    /// Stores `v`, returning the previous value.
    #[inline]
    pub fn swap(&self, v: bool) -> bool {
        self.0.swap(v, Ordering::SeqCst)
    }
}

/// An unsigned integer type which can be safely shared between threads.
#[derive(Default)]
pub struct AtomicUsize(core::sync::atomic::AtomicUsize);

impl AtomicUsize {
    /// Creates a new `AtomicUsize`.
    #[inline]
    #[must_use]
    pub const fn new(v: usize) -> Self {
        Self(core::sync::atomic::AtomicUsize::new(v))
    }

    /// Loads the value.
    #[inline]
    pub fn load(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Stores `v`.
    #[inline]
    pub fn store(&self, v: usize) {
        self.0.store(v, Ordering::SeqCst)
    }

    /// Adds `v`, returning the previous value.
    #[inline]
    pub fn fetch_add(&self, v: usize) -> usize {
        self.0.fetch_add(v, Ordering::SeqCst)
    }
}

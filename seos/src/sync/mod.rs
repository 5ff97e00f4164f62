//! Synchronization primitives.
//!
//! All three primitives obtain atomicity the same way: by closing the
//! interrupt gate for the duration of their critical sections. Their wait
//! queues are kept in effective-priority order, so an [`up`] or a
//! [`signal`] always wakes the most urgent waiter, and lock contention
//! feeds the waiter's priority back to the holder through donation.
//!
//! [`up`]: Semaphore::up
//! [`signal`]: Condition::signal

pub mod atomic;
mod condvar;
mod lock;
mod semaphore;

pub use condvar::Condition;
pub use lock::{Lock, MAX_DONATION_DEPTH};
pub use semaphore::Semaphore;

//! Device drivers.

pub mod pic;
pub mod pit;
pub mod serial;

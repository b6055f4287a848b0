//! Core benchmark module
//!
//! Provides the copy strategies, the task lifecycle and the timing
//! harness that drives tasks one after another.

mod copier;
mod task;
mod timer;

pub use copier::*;
pub use task::*;
pub use timer::*;

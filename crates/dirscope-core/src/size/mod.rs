//! Background recursive directory sizes.
//!
//! [`walk::compute`] is the synchronous walker; [`SizeComputer`] runs it on
//! a fixed pool of threads and reports results over a channel.

pub mod pool;
pub mod task;
pub mod walk;

pub use pool::SizeComputer;
pub use task::{SizeHandle, SizeOutcome, SizeReport, SizeState};
pub use walk::{compute, CancelToken};

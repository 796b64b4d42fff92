//! Utility helpers including geometry math, fork-join scheduling, logging, and profiling.

pub mod logging;
pub mod math;
pub mod parallel;
pub mod profiling;

pub use math::*;
pub use parallel::WorkerPool;

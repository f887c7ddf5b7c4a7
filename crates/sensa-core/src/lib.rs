//! Core types shared by the sensa crates: tracing setup and epoch-millisecond time.

pub mod time;
pub mod tracing;

pub use time::EpochMillis;
pub use tracing::{LogFormat, TracingConfig, TracingError, init_tracing};

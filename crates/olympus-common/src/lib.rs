//! Common types, errors, and utilities for Olympus services.

pub mod error;
pub mod queue;
pub mod types;

pub use error::AppError;
pub use queue::{Backoff, Queue, RedisQueue};
pub use types::*;

//! Configuration for the execution core.
//!
//! `SCRATCH_ROOT` and the limit defaults/maxima are the core configuration
//! surface. Everything here is overridable via env var, falling back to
//! `olympus_common::limits`'s published constants.

use std::env;
use std::path::PathBuf;

use olympus_common::limits;

/// Execution configuration shared by every crate that invokes
/// `Executor::execute` (currently just `sisyphus`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory under which per-task scratch directories are created
    /// and torn down.
    pub scratch_root: PathBuf,

    /// Prometheus metrics port for this worker process.
    pub metrics_port: u16,

    pub execution: ExecutionConfig,
}

/// Execution limits configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionConfig {
    pub default_time_limit_ms: u64,
    pub max_time_limit_ms: u64,
    pub default_memory_limit_kb: u64,
    pub max_memory_limit_kb: u64,
    pub output_limit_bytes: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_time_limit_ms: limits::DEFAULT_TIME_MS,
            max_time_limit_ms: limits::MAX_TIME_MS,
            default_memory_limit_kb: limits::DEFAULT_MEM_KB,
            max_memory_limit_kb: limits::MAX_MEM_KB,
            output_limit_bytes: limits::MAX_OUTPUT_BYTES as u64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            scratch_root: PathBuf::from(
                env::var("SCRATCH_ROOT").unwrap_or_else(|_| "/mnt/data/temp".to_string()),
            ),
            metrics_port: env::var("METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9091),
            execution: ExecutionConfig::default(),
        }
    }
}

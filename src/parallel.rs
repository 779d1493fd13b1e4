//! Parallel processing configuration
//!
//! The processing kernels run their per-column work on Rayon's global
//! thread pool; this module configures that pool once at startup.

use crate::errors::{DasError, Result};
use log::info;
use rayon::ThreadPoolBuilder;

/// Thread-pool configuration for the processing kernels
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// A configuration using every available CPU core
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    /// A configuration using a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Sets up the global Rayon thread pool.
    ///
    /// Must run before the first parallel kernel; a pool that is already
    /// initialized fails here.
    pub fn setup_global_pool(&self) -> Result<()> {
        if let Some(num_threads) = self.num_threads {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    DasError::ThreadPoolError(format!(
                        "Failed to initialize thread pool with {} threads: {}",
                        num_threads, e
                    ))
                })?;
            info!("Configured parallel processing with {} threads", num_threads);
        } else {
            info!("Using default thread pool configuration");
        }
        Ok(())
    }

    /// The number of threads currently in use
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

//! Parallel processing configuration
//!
//! Grid-cell computations in [`crate::timeseries`] run on Rayon's global
//! thread pool; this module configures it.

use crate::errors::{CodeBaseError, Result};
use rayon::ThreadPoolBuilder;
use tracing::info;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Set up the global Rayon thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool was already initialised or cannot be built.
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(0) => Err(CodeBaseError::ThreadPoolError(
                "Number of threads must be at least 1".to_string(),
            )),
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        CodeBaseError::ThreadPoolError(format!(
                            "Failed to initialize thread pool with {num_threads} threads: {e}"
                        ))
                    })?;
                info!("Configured parallel processing with {} threads", num_threads);
                Ok(())
            }
            None => {
                info!(
                    "Using default thread pool configuration ({} threads)",
                    rayon::current_num_threads()
                );
                Ok(())
            }
        }
    }

    /// Use every available CPU core
    #[must_use]
    pub fn all_cores() -> Self {
        Self {
            num_threads: Some(num_cpus::get()),
        }
    }

    #[must_use]
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

impl ParallelInfo {
    #[must_use]
    pub fn collect() -> Self {
        Self {
            current_threads: rayon::current_num_threads(),
            available_cores: num_cpus::get(),
        }
    }

    pub fn print_info(&self) {
        println!("📊 Parallel Processing Information:");
        println!("   Current threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
    }
}

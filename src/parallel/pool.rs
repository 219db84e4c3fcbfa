//! Rayon thread pool configuration for soak runs.
//!
//! Each session is single-threaded; the pool only spreads independent sessions across cores.

use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};

/// Configures how many worker threads run sessions concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// Number of worker threads. If 0, use Rayon default (num_cpus).
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(n: usize) -> Self {
        Self { workers: n }
    }

    /// Run a closure with this worker count. If [workers](WorkerPool::workers) is 0 the global
    /// Rayon pool is used; otherwise a temporary pool with that many threads is built.
    pub fn install<F, R>(&self, f: F) -> Result<R, ThreadPoolBuildError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            Ok(f())
        } else {
            let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
            Ok(pool.install(f))
        }
    }
}

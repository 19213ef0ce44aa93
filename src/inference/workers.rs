//! Worker pool for the CPU-bound per-row work of a batch.
//!
//! Results always come back in row order, whatever order the workers finish in.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::common::error::{PloidyError, PloidyResult};

pub struct Pool {
    inner: ThreadPool,
}

impl Pool {
    /// `size == 0` lets rayon pick one thread per core.
    pub fn new(size: usize) -> PloidyResult<Self> {
        let inner = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|idx| format!("ploidy-worker-{idx}"))
            .build()
            .map_err(|e| PloidyError::internal(format!("cannot start worker pool: {e}")))?;
        Ok(Self { inner })
    }

    pub fn threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    /// Evaluate `job(0..n)` in parallel, returning results indexed by row.
    pub fn map_rows<R, F>(&self, n: usize, job: F) -> Vec<R>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        self.inner
            .install(|| (0..n).into_par_iter().map(&job).collect())
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("threads", &self.threads()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn results_keep_row_order() {
        let pool = Pool::new(4).unwrap();
        let out = pool.map_rows(64, |i| {
            // later rows finish first
            std::thread::sleep(Duration::from_micros(((64 - i) * 50) as u64));
            i * 10
        });
        assert_eq!(out, (0..64).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[test]
    fn default_size_uses_available_cores() {
        let pool = Pool::new(0).unwrap();
        assert!(pool.threads() >= 1);
        assert!(pool.map_rows(0, |i| i).is_empty());
    }
}

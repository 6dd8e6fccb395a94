//! Bounded worker pools for batch runs
//!
//! Batch work (one RWR job per feature set, one comparison per method pair)
//! is independent per item. [`ProcessingMode`] decides whether those items
//! run sequentially, on rayon's global pool, or on a dedicated pool with a
//! fixed number of threads.

#[cfg(feature = "parallel")]
use crate::maybe_rayon::*;
use priocomp_core::{Error, Result};
use serde::Serialize;

/// Processing mode for batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for an optional `--threads` setting: `None` uses all cores, `1` runs sequentially.
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Map `f` over `items`, preserving order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(items.iter().map(f).collect()),
            ProcessingMode::ParallelWith(0) => Err(Error::Configuration(
                "thread count must be at least 1".into(),
            )),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => Ok(items.par_iter().map(f).collect()),
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))?;
                Ok(pool.install(|| items.par_iter().map(f).collect()))
            }
            #[cfg(not(feature = "parallel"))]
            _ => Ok(items.iter().map(f).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_agree() {
        let items: Vec<u64> = (0..100).collect();
        let square = |x: &u64| x * x;
        let seq = ProcessingMode::Sequential.map(&items, square).unwrap();
        let par = ProcessingMode::Parallel.map(&items, square).unwrap();
        let bounded = ProcessingMode::ParallelWith(2).map(&items, square).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq, bounded);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let items = [1, 2, 3];
        let r = ProcessingMode::ParallelWith(0).map(&items, |x| *x);
        assert!(matches!(r, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_from_threads() {
        assert_eq!(ProcessingMode::from_threads(None), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(Some(1)), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_threads(Some(4)), ProcessingMode::ParallelWith(4));
    }
}

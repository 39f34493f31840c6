//! Scheduling of the data-parallel stages.
//!
//! Every stage except hysteresis writes exactly one output slot per
//! pixel, so rows are handed out to rayon workers with no locking.
//! [`ExecutionStrategy`] picks between the current thread, the global
//! rayon pool, and a dedicated pool; all three produce identical output.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Controls how the data-parallel stages are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// Useful for small images, debugging, or when the overhead of
    /// parallelization outweighs the benefits.
    Serial,

    /// Process rows on the global rayon thread pool.
    #[default]
    Parallel,

    /// Process rows on a dedicated rayon pool with `n` threads.
    ///
    /// The pool is created per call; the orchestrator builds it once per
    /// run and executes every stage inside it.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Run `op` inside the thread pool this strategy designates.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] for `Fixed(0)` and
    /// [`PipelineError::ThreadPool`] if rayon cannot build the pool.
    pub fn install<R, F>(self, op: F) -> Result<R, PipelineError>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self {
            Self::Fixed(0) => Err(PipelineError::Configuration(
                "fixed thread pool needs at least one thread".to_string(),
            )),
            Self::Fixed(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
                Ok(pool.install(op))
            }
            Self::Serial | Self::Parallel => Ok(op()),
        }
    }

    /// The strategy to hand to stages already running inside
    /// [`install`](Self::install): a dedicated pool is already current,
    /// so nested stages must not build another one.
    #[must_use]
    pub const fn within_pool(self) -> Self {
        match self {
            Self::Fixed(_) => Self::Parallel,
            other => other,
        }
    }
}

/// Apply `op` to every row of a row-major plane.
///
/// `op` receives the row index and the mutable row slice.
pub(crate) fn for_each_row<T, F>(
    strategy: ExecutionStrategy,
    data: &mut [T],
    width: usize,
    op: F,
) -> Result<(), PipelineError>
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    strategy.install(|| match strategy {
        ExecutionStrategy::Serial => data
            .chunks_exact_mut(width)
            .enumerate()
            .for_each(|(y, row)| op(y, row)),
        ExecutionStrategy::Parallel | ExecutionStrategy::Fixed(_) => data
            .par_chunks_exact_mut(width)
            .enumerate()
            .for_each(|(y, row)| op(y, row)),
    })
}

/// Map every row of a row-major plane to a value and fold the values
/// with `combine`.
///
/// `combine` must be associative and `identity` neutral for it; rows are
/// merged in an unspecified order in the parallel case.
pub(crate) fn reduce_rows<T, R, M, C>(
    strategy: ExecutionStrategy,
    data: &[T],
    width: usize,
    identity: R,
    map: M,
    combine: C,
) -> Result<R, PipelineError>
where
    T: Sync,
    R: Copy + Send + Sync,
    M: Fn(usize, &[T]) -> R + Send + Sync,
    C: Fn(R, R) -> R + Send + Sync,
{
    strategy.install(|| match strategy {
        ExecutionStrategy::Serial => data
            .chunks_exact(width)
            .enumerate()
            .fold(identity, |acc, (y, row)| combine(acc, map(y, row))),
        ExecutionStrategy::Parallel | ExecutionStrategy::Fixed(_) => data
            .par_chunks_exact(width)
            .enumerate()
            .map(|(y, row)| map(y, row))
            .reduce(|| identity, &combine),
    })
}

/// Apply `op` to every item, in order when serial.
pub(crate) fn for_each_item<T, F>(
    strategy: ExecutionStrategy,
    items: &[T],
    op: F,
) -> Result<(), PipelineError>
where
    T: Sync,
    F: Fn(&T) + Send + Sync,
{
    strategy.install(|| match strategy {
        ExecutionStrategy::Serial => items.iter().for_each(&op),
        ExecutionStrategy::Parallel | ExecutionStrategy::Fixed(_) => {
            items.par_iter().for_each(&op);
        }
    })
}

//! src/executors/mod.rs
//!
//! How a stage runs its map and reduce functions. Whatever the executor,
//! results come back in input order for the map phase and in group order for
//! the reduce phase, and the error reported is the earliest one in that order.

/// Runs the per-record and per-group work of a stage.
pub trait Executor: Send + Sync {
    /// Applies `map` to every input record and concatenates the emissions in
    /// input order.
    fn map_records<I, T, E, F>(&self, input: impl Iterator<Item = I>, map: F) -> Result<Vec<T>, E>
    where
        I: Send,
        T: Send,
        E: Send,
        F: Fn(I) -> Result<Vec<T>, E> + Sync;

    /// Applies `reduce` to every group and returns one batch of outputs per
    /// group, in group order.
    fn reduce_groups<G, T, E, F>(&self, groups: Vec<G>, reduce: F) -> Result<Vec<Vec<T>>, E>
    where
        G: Send,
        T: Send,
        E: Send,
        F: Fn(G) -> Result<Vec<T>, E> + Sync;
}

mod parallel;
pub use parallel::ParallelExecutor;

mod sequential;
pub use sequential::SequentialExecutor;

/// Execution mode requested for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    #[default]
    Sequential,
    Parallel {
        map_jobs: usize,
        reduce_jobs: usize,
        chunk_size: usize,
    },
}

impl ExecutorKind {
    /// Starts the worker pools the mode needs.
    pub fn build(self) -> Result<StageExecutor, rayon::ThreadPoolBuildError> {
        match self {
            ExecutorKind::Sequential => Ok(StageExecutor::Sequential(SequentialExecutor)),
            ExecutorKind::Parallel {
                map_jobs,
                reduce_jobs,
                chunk_size,
            } => ParallelExecutor::new(map_jobs, reduce_jobs, chunk_size)
                .map(StageExecutor::Parallel),
        }
    }
}

/// An executor built from an `ExecutorKind` for the duration of one run.
#[derive(Debug)]
pub enum StageExecutor {
    Sequential(SequentialExecutor),
    Parallel(ParallelExecutor),
}

impl Executor for StageExecutor {
    fn map_records<I, T, E, F>(&self, input: impl Iterator<Item = I>, map: F) -> Result<Vec<T>, E>
    where
        I: Send,
        T: Send,
        E: Send,
        F: Fn(I) -> Result<Vec<T>, E> + Sync,
    {
        match self {
            StageExecutor::Sequential(executor) => executor.map_records(input, map),
            StageExecutor::Parallel(executor) => executor.map_records(input, map),
        }
    }

    fn reduce_groups<G, T, E, F>(&self, groups: Vec<G>, reduce: F) -> Result<Vec<Vec<T>>, E>
    where
        G: Send,
        T: Send,
        E: Send,
        F: Fn(G) -> Result<Vec<T>, E> + Sync,
    {
        match self {
            StageExecutor::Sequential(executor) => executor.reduce_groups(groups, reduce),
            StageExecutor::Parallel(executor) => executor.reduce_groups(groups, reduce),
        }
    }
}

/// Returns the batches in order, or the first error among them.
pub(crate) fn ordered_join<T, E>(batches: Vec<Result<Vec<T>, E>>) -> Result<Vec<Vec<T>>, E> {
    batches.into_iter().collect()
}

//! src/executors/sequential.rs
use crate::executors::Executor;

/// Runs everything on the calling thread, pulling input lazily and stopping
/// at the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl Executor for SequentialExecutor {
    fn map_records<I, T, E, F>(&self, input: impl Iterator<Item = I>, map: F) -> Result<Vec<T>, E>
    where
        I: Send,
        T: Send,
        E: Send,
        F: Fn(I) -> Result<Vec<T>, E> + Sync,
    {
        let mut emitted = Vec::new();
        for record in input {
            emitted.extend(map(record)?);
        }
        Ok(emitted)
    }

    fn reduce_groups<G, T, E, F>(&self, groups: Vec<G>, reduce: F) -> Result<Vec<Vec<T>>, E>
    where
        G: Send,
        T: Send,
        E: Send,
        F: Fn(G) -> Result<Vec<T>, E> + Sync,
    {
        groups.into_iter().map(reduce).collect()
    }
}

//! src/executors/parallel.rs
use crate::executors::{Executor, ordered_join};
use crate::tools::chunks;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Maps input chunks and reduces groups on `rayon` thread pools.
///
/// The map phase slices the input into chunks of `chunk_size` records; each
/// chunk is mapped by one worker in record order. Chunks and groups are
/// joined back in their original order once every worker has finished, so
/// the output matches the sequential executor.
#[derive(Debug)]
pub struct ParallelExecutor {
    map_pool: ThreadPool,
    reduce_pool: ThreadPool,
    chunk_size: usize,
}

impl ParallelExecutor {
    /// A job count of 0 lets rayon pick one thread per core.
    pub fn new(
        map_jobs: usize,
        reduce_jobs: usize,
        chunk_size: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let map_pool = ThreadPoolBuilder::new()
            .num_threads(map_jobs)
            .thread_name(|i| format!("mapreduce-map-{i}"))
            .build()?;
        let reduce_pool = ThreadPoolBuilder::new()
            .num_threads(reduce_jobs)
            .thread_name(|i| format!("mapreduce-reduce-{i}"))
            .build()?;
        Ok(ParallelExecutor {
            map_pool,
            reduce_pool,
            chunk_size: chunk_size.max(1),
        })
    }

    pub fn map_jobs(&self) -> usize {
        self.map_pool.current_num_threads()
    }

    pub fn reduce_jobs(&self) -> usize {
        self.reduce_pool.current_num_threads()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Executor for ParallelExecutor {
    fn map_records<I, T, E, F>(&self, input: impl Iterator<Item = I>, map: F) -> Result<Vec<T>, E>
    where
        I: Send,
        T: Send,
        E: Send,
        F: Fn(I) -> Result<Vec<T>, E> + Sync,
    {
        let chunks: Vec<Vec<I>> = chunks(input, self.chunk_size).collect();
        tracing::debug!(chunks = chunks.len(), chunk_size = self.chunk_size, "Mapping in parallel");
        let batches: Vec<Result<Vec<T>, E>> = self.map_pool.install(|| {
            chunks
                .into_par_iter()
                .map(|chunk| -> Result<Vec<T>, E> {
                    let mut emitted = Vec::new();
                    for record in chunk {
                        emitted.extend(map(record)?);
                    }
                    Ok(emitted)
                })
                .collect()
        });
        Ok(ordered_join(batches)?.into_iter().flatten().collect())
    }

    fn reduce_groups<G, T, E, F>(&self, groups: Vec<G>, reduce: F) -> Result<Vec<Vec<T>>, E>
    where
        G: Send,
        T: Send,
        E: Send,
        F: Fn(G) -> Result<Vec<T>, E> + Sync,
    {
        tracing::debug!(groups = groups.len(), "Reducing in parallel");
        let batches: Vec<Result<Vec<T>, E>> = self
            .reduce_pool
            .install(|| groups.into_par_iter().map(&reduce).collect());
        ordered_join(batches)
    }
}

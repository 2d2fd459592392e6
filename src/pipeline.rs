//! src/pipeline.rs
//!
//! Chains stages. Stage `i`'s reduce output is the only input of stage
//! `i + 1`, and a stage starts mapping only once the previous one is
//! complete. A pipeline without stages hands its input back untouched.
use crate::error::PipelineError;
use crate::executors::{ExecutorKind, StageExecutor};
use crate::functions::{Mapper, Reducer};
use crate::stage::{LazyReduce, Stage, StageStats};
use uuid::Uuid;

type Records<'a, T> = Box<dyn Iterator<Item = T> + 'a>;
type Fallible<'a, T> = Box<dyn Streamed<T> + 'a>;

/// Output of the last stage of a streamed run, plus that stage's counters.
trait Streamed<T>: Iterator<Item = Result<T, PipelineError>> {
    fn stats(&self) -> Option<&StageStats>;
}

impl<R: Reducer> Streamed<R::Output> for LazyReduce<'_, R> {
    fn stats(&self) -> Option<&StageStats> {
        Some(LazyReduce::stats(self))
    }
}

/// Streamed output of a pipeline without stages.
struct Passthrough<'a, T>(Records<'a, T>);

impl<T> Iterator for Passthrough<'_, T> {
    type Item = Result<T, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(Ok)
    }
}

impl<T> Streamed<T> for Passthrough<'_, T> {
    fn stats(&self) -> Option<&StageStats> {
        None
    }
}

/// Type-erased prefix of a pipeline, from its input type to the output type
/// of its last stage.
trait Chain<I, O>: Send + Sync {
    fn run<'a>(
        &'a self,
        input: Records<'a, I>,
        executor: &StageExecutor,
        stats: &mut Vec<StageStats>,
    ) -> Result<Records<'a, O>, PipelineError>;

    fn stream<'a>(
        &'a self,
        input: Records<'a, I>,
        executor: &StageExecutor,
        stats: &mut Vec<StageStats>,
    ) -> Result<Fallible<'a, O>, PipelineError>;
}

struct Identity;

impl<I: 'static> Chain<I, I> for Identity {
    fn run<'a>(
        &'a self,
        input: Records<'a, I>,
        _executor: &StageExecutor,
        _stats: &mut Vec<StageStats>,
    ) -> Result<Records<'a, I>, PipelineError> {
        Ok(input)
    }

    fn stream<'a>(
        &'a self,
        input: Records<'a, I>,
        _executor: &StageExecutor,
        _stats: &mut Vec<StageStats>,
    ) -> Result<Fallible<'a, I>, PipelineError> {
        Ok(Box::new(Passthrough(input)))
    }
}

struct Then<I, M, R>
where
    M: Mapper,
{
    head: Box<dyn Chain<I, M::Input>>,
    stage: Stage<M, R>,
    index: usize,
}

impl<I, M, R> Chain<I, R::Output> for Then<I, M, R>
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
    R::Output: 'static,
{
    fn run<'a>(
        &'a self,
        input: Records<'a, I>,
        executor: &StageExecutor,
        stats: &mut Vec<StageStats>,
    ) -> Result<Records<'a, R::Output>, PipelineError> {
        let upstream = self.head.run(input, executor, stats)?;
        let (outputs, stage_stats) = self.stage.execute(self.index, executor, upstream)?;
        stats.push(stage_stats);
        Ok(Box::new(outputs.into_iter()))
    }

    fn stream<'a>(
        &'a self,
        input: Records<'a, I>,
        executor: &StageExecutor,
        stats: &mut Vec<StageStats>,
    ) -> Result<Fallible<'a, R::Output>, PipelineError> {
        let upstream = self.head.run(input, executor, stats)?;
        let reduce: LazyReduce<'a, R> = self.stage.stream(self.index, executor, upstream)?;
        Ok(Box::new(reduce))
    }
}

/// An ordered chain of stages from records of type `I` to records of type `O`.
pub struct Pipeline<I, O> {
    chain: Box<dyn Chain<I, O>>,
    names: Vec<String>,
    executor: ExecutorKind,
}

impl<I: Send + 'static> Pipeline<I, I> {
    /// The identity pipeline.
    pub fn new() -> Self {
        Pipeline {
            chain: Box::new(Identity),
            names: Vec::new(),
            executor: ExecutorKind::default(),
        }
    }
}

impl<I: Send + 'static> Default for Pipeline<I, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Appends a stage fed by the current last stage. Unnamed stages are
    /// called `stage-<index>`.
    pub fn stage<M, R>(self, stage: Stage<M, R>) -> Pipeline<I, R::Output>
    where
        M: Mapper<Input = O> + 'static,
        R: Reducer<Key = M::Key, Value = M::Value> + 'static,
        R::Output: 'static,
    {
        let Pipeline {
            chain,
            mut names,
            executor,
        } = self;
        let index = names.len();
        let stage = if stage.name().is_some() {
            stage
        } else {
            stage.named(format!("stage-{index}"))
        };
        names.push(stage.name().unwrap_or_default().to_string());
        Pipeline {
            chain: Box::new(Then {
                head: chain,
                stage,
                index,
            }),
            names,
            executor,
        }
    }

    pub fn with_executor(mut self, executor: ExecutorKind) -> Self {
        self.executor = executor;
        self
    }

    pub fn executor(&self) -> ExecutorKind {
        self.executor
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Runs every stage to completion and returns the last stage's output.
    #[tracing::instrument(
        name = "Run pipeline",
        skip_all,
        fields(run_id = tracing::field::Empty, stages = self.len())
    )]
    pub fn run<T>(&self, input: T) -> Result<PipelineOutput<O>, PipelineError>
    where
        T: IntoIterator<Item = I>,
    {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let executor = self.executor.build().map_err(PipelineError::Executor)?;

        let mut stats = Vec::with_capacity(self.len());
        let outputs: Vec<O> = self
            .chain
            .run(Box::new(input.into_iter()), &executor, &mut stats)?
            .collect();
        tracing::info!(records_out = outputs.len(), "Pipeline complete");
        Ok(PipelineOutput {
            run_id,
            outputs: outputs.into_iter(),
            stats,
        })
    }

    /// Runs every stage but the last to completion, maps and groups the last
    /// one, and reduces its groups as the returned stream is pulled.
    #[tracing::instrument(
        name = "Stream pipeline",
        skip_all,
        fields(run_id = tracing::field::Empty, stages = self.len())
    )]
    pub fn stream<'a, T>(&'a self, input: T) -> Result<ReduceStream<'a, O>, PipelineError>
    where
        T: IntoIterator<Item = I>,
        T::IntoIter: 'a,
    {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        let executor = self.executor.build().map_err(PipelineError::Executor)?;

        let mut completed = Vec::with_capacity(self.len());
        let inner = self
            .chain
            .stream(Box::new(input.into_iter()), &executor, &mut completed)?;
        Ok(ReduceStream {
            run_id,
            inner,
            completed,
        })
    }
}

/// Output of [`Pipeline::run`]: the final records plus the counters of every
/// stage.
#[derive(Debug)]
pub struct PipelineOutput<O> {
    run_id: Uuid,
    outputs: std::vec::IntoIter<O>,
    stats: Vec<StageStats>,
}

impl<O> PipelineOutput<O> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stats(&self) -> &[StageStats] {
        &self.stats
    }

    pub fn into_vec(self) -> Vec<O> {
        self.outputs.collect()
    }
}

impl<O> Iterator for PipelineOutput<O> {
    type Item = O;

    fn next(&mut self) -> Option<O> {
        self.outputs.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.outputs.size_hint()
    }
}

impl<O> ExactSizeIterator for PipelineOutput<O> {}

/// Output of [`Pipeline::stream`]. Yields at most one error, after which it
/// is exhausted.
pub struct ReduceStream<'a, O> {
    run_id: Uuid,
    inner: Fallible<'a, O>,
    completed: Vec<StageStats>,
}

impl<O> ReduceStream<'_, O> {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Counters of the stages that ran to completion before streaming began.
    pub fn completed_stages(&self) -> &[StageStats] {
        &self.completed
    }

    /// Counters of the stage being streamed. Its state is `Complete` once
    /// the stream is drained. `None` for a pipeline without stages.
    pub fn streaming_stage(&self) -> Option<&StageStats> {
        self.inner.stats()
    }
}

impl<O> Iterator for ReduceStream<'_, O> {
    type Item = Result<O, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

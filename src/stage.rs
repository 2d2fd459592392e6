//! src/stage.rs
use crate::configuration::StageSettings;
use crate::error::{Phase, PipelineError};
use crate::executors::{Executor, StageExecutor};
use crate::functions::{Mapper, Reducer};
use crate::grouper::Grouper;
use crate::ordering::{Comparator, KeyOrder, ValueOrder, comparator};
use crate::record::Group;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

type SortKeyFn<V, S> = Arc<dyn Fn(&V) -> S + Send + Sync>;

/// Grouping and ordering options of one stage.
///
/// Key and value ordering can only be switched to ascending when the key or
/// value type is `PartialOrd`; otherwise a stage keeps first-seen keys and
/// insertion-ordered values.
pub struct StageConfig<K, V, S = ()> {
    key_order: KeyOrder,
    key_cmp: Option<Comparator<K>>,
    value_order: ValueOrder,
    value_cmp: Option<Comparator<V>>,
    sort_key: Option<SortKeyFn<V, S>>,
    reverse: bool,
}

impl<K, V, S> Default for StageConfig<K, V, S> {
    fn default() -> Self {
        StageConfig {
            key_order: KeyOrder::default(),
            key_cmp: None,
            value_order: ValueOrder::default(),
            value_cmp: None,
            sort_key: None,
            reverse: false,
        }
    }
}

impl<K, V, S> Clone for StageConfig<K, V, S> {
    fn clone(&self) -> Self {
        StageConfig {
            key_order: self.key_order,
            key_cmp: self.key_cmp,
            value_order: self.value_order,
            value_cmp: self.value_cmp,
            sort_key: self.sort_key.clone(),
            reverse: self.reverse,
        }
    }
}

impl<K, V, S> fmt::Debug for StageConfig<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageConfig")
            .field("key_order", &self.key_order)
            .field("value_order", &self.value_order)
            .field("sort_key", &self.sort_key.is_some())
            .field("reverse", &self.reverse)
            .finish()
    }
}

impl<K, V, S> StageConfig<K, V, S> {
    pub fn key_order(mut self, order: KeyOrder) -> Self
    where
        K: PartialOrd,
    {
        self.key_order = order;
        self.key_cmp = match order {
            KeyOrder::FirstSeen => None,
            KeyOrder::Ascending => Some(comparator::<K>()),
        };
        self
    }

    pub fn value_order(mut self, order: ValueOrder) -> Self
    where
        V: PartialOrd,
    {
        self.value_order = order;
        self.value_cmp = match order {
            ValueOrder::Insertion => None,
            ValueOrder::Ascending => Some(comparator::<V>()),
        };
        self
    }

    /// Derives the secondary sort value of records emitted without one.
    pub fn sort_key<F>(mut self, extract: F) -> Self
    where
        F: Fn(&V) -> S + Send + Sync + 'static,
    {
        self.sort_key = Some(Arc::new(extract));
        self
    }

    /// Orders the values of each group descending.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn from_settings(settings: &StageSettings) -> Self
    where
        K: PartialOrd,
        V: PartialOrd,
    {
        StageConfig::default()
            .key_order(settings.key_order)
            .value_order(settings.value_order)
            .reverse(settings.reverse)
    }

    pub fn key_ordering(&self) -> KeyOrder {
        self.key_order
    }

    pub fn value_ordering(&self) -> ValueOrder {
        self.value_order
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    pub(crate) fn key_comparator(&self) -> Option<Comparator<K>> {
        self.key_cmp
    }

    pub(crate) fn value_comparator(&self) -> Option<Comparator<V>> {
        self.value_cmp
    }

    pub(crate) fn extract_sort(&self, value: &V) -> Option<S> {
        self.sort_key.as_ref().map(|extract| extract(value))
    }
}

/// Lifecycle of a stage within one run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StageState {
    Pending,
    Mapping,
    Grouping,
    Reducing,
    Complete,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            StageState::Pending => "pending",
            StageState::Mapping => "mapping",
            StageState::Grouping => "grouping",
            StageState::Reducing => "reducing",
            StageState::Complete => "complete",
        };
        f.write_str(state)
    }
}

/// Counters of a stage run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    index: usize,
    name: String,
    state: StageState,
    records_in: usize,
    emitted: usize,
    groups: usize,
    records_out: usize,
}

impl StageStats {
    pub(crate) fn new(index: usize, name: &str) -> Self {
        StageStats {
            index,
            name: name.to_string(),
            state: StageState::Pending,
            records_in: 0,
            emitted: 0,
            groups: 0,
            records_out: 0,
        }
    }

    pub(crate) fn advance(&mut self, next: StageState) {
        debug_assert!(next > self.state);
        tracing::debug!(
            stage = self.index,
            from = %self.state,
            to = %next,
            records_in = self.records_in,
            emitted = self.emitted,
            groups = self.groups,
            "Stage transition"
        );
        self.state = next;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Records fed to the map function.
    pub fn records_in(&self) -> usize {
        self.records_in
    }

    /// Keyed records produced by the map function.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    /// Records produced by the reduce function.
    pub fn records_out(&self) -> usize {
        self.records_out
    }
}

/// A map function, a reduce function and the grouping between them.
pub struct Stage<M, R>
where
    M: Mapper,
{
    name: Option<String>,
    mapper: M,
    reducer: R,
    config: StageConfig<M::Key, M::Value, M::SortValue>,
}

impl<M, R> Stage<M, R>
where
    M: Mapper,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    pub fn new(mapper: M, reducer: R) -> Self {
        Stage {
            name: None,
            mapper,
            reducer,
            config: StageConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StageConfig<M::Key, M::Value, M::SortValue>) -> Self {
        self.config = config;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn config(&self) -> &StageConfig<M::Key, M::Value, M::SortValue> {
        &self.config
    }

    /// The given name, or `stage-<index>`.
    fn stage_name(&self, index: usize) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("stage-{index}")),
        }
    }

    fn user_error(
        &self,
        index: usize,
        phase: Phase,
        key: Option<String>,
    ) -> impl FnOnce(anyhow::Error) -> PipelineError + '_ {
        move |source| PipelineError::UserFunction {
            stage: index,
            stage_name: self.stage_name(index).into_owned(),
            phase,
            key,
            source,
        }
    }

    /// Map and group phases, shared by the eager and the streaming run.
    fn map_and_group<'a>(
        &self,
        index: usize,
        executor: &StageExecutor,
        input: Box<dyn Iterator<Item = M::Input> + 'a>,
        stats: &mut StageStats,
    ) -> Result<Vec<Group<M::Key, M::Value>>, PipelineError> {
        stats.advance(StageState::Mapping);
        let mut records_in = 0;
        let counted = input.inspect(|_| records_in += 1);
        let emitted = executor.map_records(counted, |record| {
            self.mapper
                .map(record)
                .map(|emitted| emitted.into_iter().collect::<Vec<_>>())
                .map_err(self.user_error(index, Phase::Map, None))
        })?;
        stats.records_in = records_in;
        stats.emitted = emitted.len();

        stats.advance(StageState::Grouping);
        let mut grouper = Grouper::new(&self.config);
        grouper.extend(emitted);
        let groups = grouper.finish().map_err(|source| PipelineError::Ordering {
            stage: index,
            stage_name: self.stage_name(index).into_owned(),
            source,
        })?;
        stats.groups = groups.len();
        Ok(groups)
    }

    #[tracing::instrument(
        name = "Run stage",
        skip_all,
        fields(stage = index, name = %self.stage_name(index))
    )]
    pub(crate) fn execute<'a>(
        &self,
        index: usize,
        executor: &StageExecutor,
        input: Box<dyn Iterator<Item = M::Input> + 'a>,
    ) -> Result<(Vec<R::Output>, StageStats), PipelineError> {
        let name = self.stage_name(index);
        let mut stats = StageStats::new(index, &name);
        let groups = self
            .map_and_group(index, executor, input, &mut stats)
            .inspect_err(|e| tracing::error!(error = %e, "Stage aborted"))?;

        stats.advance(StageState::Reducing);
        let reduced = executor
            .reduce_groups(groups, |group| reduce_group(&self.reducer, index, &name, group))
            .inspect_err(|e| tracing::error!(error = %e, "Stage aborted"))?;
        let outputs: Vec<R::Output> = reduced.into_iter().flatten().collect();
        stats.records_out = outputs.len();

        stats.advance(StageState::Complete);
        tracing::info!(
            records_in = stats.records_in,
            emitted = stats.emitted,
            groups = stats.groups,
            records_out = stats.records_out,
            "Stage complete"
        );
        Ok((outputs, stats))
    }

    /// Maps and groups eagerly, then reduces one group per pull.
    #[tracing::instrument(
        name = "Stream stage",
        skip_all,
        fields(stage = index, name = %self.stage_name(index))
    )]
    pub(crate) fn stream<'a>(
        &'a self,
        index: usize,
        executor: &StageExecutor,
        input: Box<dyn Iterator<Item = M::Input> + 'a>,
    ) -> Result<LazyReduce<'a, R>, PipelineError> {
        let mut stats = StageStats::new(index, &self.stage_name(index));
        let groups = self
            .map_and_group(index, executor, input, &mut stats)
            .inspect_err(|e| tracing::error!(error = %e, "Stage aborted"))?;
        stats.advance(StageState::Reducing);
        Ok(LazyReduce {
            reducer: &self.reducer,
            name: self.stage_name(index),
            groups: groups.into_iter(),
            pending: Vec::new().into_iter(),
            stats,
            failed: false,
        })
    }
}

pub(crate) fn reduce_group<R: Reducer>(
    reducer: &R,
    index: usize,
    name: &str,
    group: Group<R::Key, R::Value>,
) -> Result<Vec<R::Output>, PipelineError> {
    let (key, values) = group.into_parts();
    match reducer.reduce(&key, values) {
        Ok(outputs) => Ok(outputs.into_iter().collect()),
        Err(source) => Err(PipelineError::UserFunction {
            stage: index,
            stage_name: name.to_string(),
            phase: Phase::Reduce,
            key: Some(format!("{key:?}")),
            source,
        }),
    }
}

/// Reduces the groups of a stage as the caller pulls outputs. Stops after
/// the first failure.
pub struct LazyReduce<'a, R: Reducer> {
    reducer: &'a R,
    name: Cow<'a, str>,
    groups: std::vec::IntoIter<Group<R::Key, R::Value>>,
    pending: std::vec::IntoIter<R::Output>,
    stats: StageStats,
    failed: bool,
}

impl<R: Reducer> LazyReduce<'_, R> {
    pub fn stats(&self) -> &StageStats {
        &self.stats
    }
}

impl<R: Reducer> Iterator for LazyReduce<'_, R> {
    type Item = Result<R::Output, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(output) = self.pending.next() {
                self.stats.records_out += 1;
                return Some(Ok(output));
            }
            if self.failed {
                return None;
            }
            let Some(group) = self.groups.next() else {
                if self.stats.state != StageState::Complete {
                    self.stats.advance(StageState::Complete);
                    tracing::info!(
                        stage = self.stats.index,
                        records_out = self.stats.records_out,
                        "Stage complete"
                    );
                }
                return None;
            };
            match reduce_group(self.reducer, self.stats.index, &self.name, group) {
                Ok(outputs) => self.pending = outputs.into_iter(),
                Err(e) => {
                    tracing::error!(error = %e, "Stage aborted");
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

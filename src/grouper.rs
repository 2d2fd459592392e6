//! src/grouper.rs
//!
//! The shuffle. Every emission of a stage's map phase is bucketed by key,
//! then keys and the values inside each bucket are put in the order the
//! stage's `StageConfig` asks for. Grouping needs the whole map output, so
//! this is the one place where intermediate data is fully materialised.
use crate::error::OrderingError;
use crate::ordering::try_sort_by;
use crate::record::{Group, KeyedRecord};
use crate::stage::StageConfig;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;

struct Bucket<V, S> {
    entries: Vec<(Option<S>, V)>,
    with_sort: usize,
}

impl<V, S> Bucket<V, S> {
    fn new() -> Self {
        Bucket {
            entries: Vec::new(),
            with_sort: 0,
        }
    }
}

/// Accumulates keyed records for one stage run.
pub struct Grouper<'c, K, V, S> {
    config: &'c StageConfig<K, V, S>,
    buckets: IndexMap<K, Bucket<V, S>>,
    received: usize,
}

impl<'c, K, V, S> Grouper<'c, K, V, S>
where
    K: Hash + Eq + Debug,
    S: PartialOrd,
{
    pub fn new(config: &'c StageConfig<K, V, S>) -> Self {
        Grouper {
            config,
            buckets: IndexMap::new(),
            received: 0,
        }
    }

    pub fn push(&mut self, record: KeyedRecord<K, V, S>) {
        let (key, value, sort) = record.into_parts();
        let sort = sort.or_else(|| self.config.extract_sort(&value));
        let bucket = self.buckets.entry(key).or_insert_with(Bucket::new);
        if sort.is_some() {
            bucket.with_sort += 1;
        }
        bucket.entries.push((sort, value));
        self.received += 1;
    }

    /// Number of records pushed so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Number of distinct keys seen so far.
    pub fn keys(&self) -> usize {
        self.buckets.len()
    }

    /// Orders keys and values and hands back the groups.
    pub fn finish(self) -> Result<Vec<Group<K, V>>, OrderingError> {
        let Grouper {
            config, buckets, ..
        } = self;

        let mut buckets: Vec<(K, Bucket<V, S>)> = buckets.into_iter().collect();
        if let Some(cmp) = config.key_comparator() {
            buckets = try_sort_by(buckets, |a, b| cmp(&a.0, &b.0), |(key, _)| format!("{key:?}"))
                .map_err(|key| OrderingError::new(Some(key), "keys cannot be compared"))?;
        }

        let mut groups = Vec::with_capacity(buckets.len());
        for (key, bucket) in buckets {
            let values = order_values(config, &key, bucket)?;
            groups.push(Group::new(key, values));
        }
        Ok(groups)
    }
}

impl<K, V, S> Extend<KeyedRecord<K, V, S>> for Grouper<'_, K, V, S>
where
    K: Hash + Eq + Debug,
    S: PartialOrd,
{
    fn extend<T: IntoIterator<Item = KeyedRecord<K, V, S>>>(&mut self, records: T) {
        for record in records {
            self.push(record);
        }
    }
}

fn order_values<K, V, S>(
    config: &StageConfig<K, V, S>,
    key: &K,
    bucket: Bucket<V, S>,
) -> Result<Vec<V>, OrderingError>
where
    K: Debug,
    S: PartialOrd,
{
    let Bucket {
        entries,
        with_sort,
    } = bucket;
    let total = entries.len();
    let by_sort = with_sort > 0;
    if by_sort && with_sort != total {
        return Err(OrderingError::new(
            Some(format!("{key:?}")),
            format!("{with_sort} of {total} values carry a sort value"),
        ));
    }

    let by_value = config.value_comparator();
    let entries = if by_sort || by_value.is_some() {
        let reverse = config.is_reversed();
        let compare = |a: &(Option<S>, V), b: &(Option<S>, V)| {
            let (a, b) = if reverse { (b, a) } else { (a, b) };
            let primary = if by_sort {
                a.0.partial_cmp(&b.0)?
            } else {
                Ordering::Equal
            };
            match (primary, by_value) {
                (Ordering::Equal, Some(cmp)) => cmp(&a.1, &b.1),
                (ordering, _) => Some(ordering),
            }
        };
        try_sort_by(entries, compare, |_| String::new()).map_err(|_| {
            let what = if by_sort { "sort values" } else { "values" };
            OrderingError::new(Some(format!("{key:?}")), format!("{what} cannot be compared"))
        })?
    } else {
        entries
    };

    Ok(entries.into_iter().map(|(_, value)| value).collect())
}

/// Groups a complete stream of keyed records in one call.
pub fn group<K, V, S, I>(
    records: I,
    config: &StageConfig<K, V, S>,
) -> Result<Vec<Group<K, V>>, OrderingError>
where
    K: Hash + Eq + Debug,
    S: PartialOrd,
    I: IntoIterator<Item = KeyedRecord<K, V, S>>,
{
    let mut grouper = Grouper::new(config);
    grouper.extend(records);
    grouper.finish()
}

//! src/tools.rs
//!
//! Helpers for feeding data into a pipeline and shaping what comes out.
use indexmap::IndexMap;
use std::hash::Hash;

/// Lazily slices an iterator into `Vec`s of at most `size` items. The last
/// chunk is short unless the input divides evenly. A `size` of 0 is treated
/// as 1.
pub fn chunks<I: IntoIterator>(iter: I, size: usize) -> Chunks<I::IntoIter> {
    Chunks {
        inner: iter.into_iter(),
        size: size.max(1),
    }
}

#[derive(Debug, Clone)]
pub struct Chunks<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if chunk.is_empty() { None } else { Some(chunk) }
    }
}

/// Pairs every value with a copy of `key`.
pub fn map_key<K, I>(key: K, values: I) -> impl Iterator<Item = (K, I::Item)>
where
    K: Clone,
    I: IntoIterator,
{
    std::iter::repeat(key).zip(values)
}

/// Gathers `(key, value)` outputs by key, keeping first-seen key order and
/// the order values arrived in.
pub fn collect_by_key<K, V, I>(pairs: I) -> IndexMap<K, Vec<V>>
where
    K: Hash + Eq,
    I: IntoIterator<Item = (K, V)>,
{
    let mut collected: IndexMap<K, Vec<V>> = IndexMap::new();
    for (key, value) in pairs {
        collected.entry(key).or_default().push(value);
    }
    collected
}

/// Keeps the first value of every key, for outputs where each key is
/// known to carry exactly one value.
pub fn single_value_output<K, V>(collected: IndexMap<K, Vec<V>>) -> IndexMap<K, V>
where
    K: Hash + Eq,
{
    collected
        .into_iter()
        .filter_map(|(key, values)| values.into_iter().next().map(|value| (key, value)))
        .collect()
}

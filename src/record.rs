//! src/record.rs
//!
//! The intermediate currency between map and reduce.

/// A single emission of a map function: the grouping key, the value handed
/// to the reducer and an optional secondary sort value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord<K, V, S = ()> {
    key: K,
    value: V,
    sort: Option<S>,
}

impl<K, V> KeyedRecord<K, V> {
    pub fn new(key: K, value: V) -> Self {
        KeyedRecord {
            key,
            value,
            sort: None,
        }
    }
}

impl<K, V, S> KeyedRecord<K, V, S> {
    /// Emission carrying a secondary sort value used to order values
    /// within the key's group.
    pub fn sorted(key: K, sort: S, value: V) -> Self {
        KeyedRecord {
            key,
            value,
            sort: Some(sort),
        }
    }

    /// Emission whose sort value may or may not be present.
    pub fn with_optional_sort(key: K, sort: Option<S>, value: V) -> Self {
        KeyedRecord { key, value, sort }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn sort(&self) -> Option<&S> {
        self.sort.as_ref()
    }

    pub fn into_parts(self) -> (K, V, Option<S>) {
        (self.key, self.value, self.sort)
    }
}

impl<K, V> From<(K, V)> for KeyedRecord<K, V> {
    fn from((key, value): (K, V)) -> Self {
        KeyedRecord::new(key, value)
    }
}

impl<K, V, S> From<(K, S, V)> for KeyedRecord<K, V, S> {
    fn from((key, sort, value): (K, S, V)) -> Self {
        KeyedRecord::sorted(key, sort, value)
    }
}

/// Every value emitted under one key, already in the configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, V> {
    key: K,
    values: Vec<V>,
}

impl<K, V> Group<K, V> {
    pub fn new(key: K, values: Vec<V>) -> Self {
        Group { key, values }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_parts(self) -> (K, Values<V>) {
        (self.key, Values::new(self.values))
    }
}

/// Owning iterator over a group's ordered values, handed to `Reducer::reduce`.
#[derive(Debug, Clone)]
pub struct Values<V> {
    inner: std::vec::IntoIter<V>,
}

impl<V> Values<V> {
    pub fn new(values: Vec<V>) -> Self {
        Values {
            inner: values.into_iter(),
        }
    }

    /// Remaining values as a slice, without consuming them.
    pub fn as_slice(&self) -> &[V] {
        self.inner.as_slice()
    }
}

impl<V> Iterator for Values<V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> DoubleEndedIterator for Values<V> {
    fn next_back(&mut self) -> Option<V> {
        self.inner.next_back()
    }
}

impl<V> ExactSizeIterator for Values<V> {}

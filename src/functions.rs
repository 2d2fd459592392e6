//! src/functions.rs
//!
//! The two user-supplied halves of a stage. A `Mapper` turns one input record
//! into any number of keyed emissions; a `Reducer` turns one key and its
//! ordered values into any number of output records. Both return their
//! emissions as an iterator so they can be produced lazily.
use crate::record::{KeyedRecord, Values};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

pub trait Mapper: Send + Sync {
    type Input: Send;
    type Key: Hash + Eq + Debug + Send;
    type Value: Send;
    type SortValue: PartialOrd + Send;

    fn map(
        &self,
        record: Self::Input,
    ) -> anyhow::Result<
        impl IntoIterator<Item = KeyedRecord<Self::Key, Self::Value, Self::SortValue>>,
    >;
}

pub trait Reducer: Send + Sync {
    type Key: Hash + Eq + Debug + Send;
    type Value: Send;
    type Output: Send;

    /// Called exactly once per key and stage run.
    fn reduce(
        &self,
        key: &Self::Key,
        values: Values<Self::Value>,
    ) -> anyhow::Result<impl IntoIterator<Item = Self::Output>>;
}

/// A `Mapper` backed by a closure. Built with [`map_fn`].
pub struct MapFn<F, I> {
    f: F,
    _input: PhantomData<fn(I)>,
}

pub fn map_fn<I, F, T>(f: F) -> MapFn<F, I>
where
    F: Fn(I) -> anyhow::Result<T>,
    T: IntoIterator,
{
    MapFn {
        f,
        _input: PhantomData,
    }
}

impl<F, I, T, K, V, S> Mapper for MapFn<F, I>
where
    F: Fn(I) -> anyhow::Result<T> + Send + Sync,
    T: IntoIterator<Item = KeyedRecord<K, V, S>>,
    I: Send,
    K: Hash + Eq + Debug + Send,
    V: Send,
    S: PartialOrd + Send,
{
    type Input = I;
    type Key = K;
    type Value = V;
    type SortValue = S;

    fn map(&self, record: I) -> anyhow::Result<impl IntoIterator<Item = KeyedRecord<K, V, S>>> {
        (self.f)(record)
    }
}

/// A `Reducer` backed by a closure. Built with [`reduce_fn`].
pub struct ReduceFn<F, K, V> {
    f: F,
    _types: PhantomData<fn(&K, V)>,
}

pub fn reduce_fn<K, V, F, T>(f: F) -> ReduceFn<F, K, V>
where
    F: Fn(&K, Values<V>) -> anyhow::Result<T>,
    T: IntoIterator,
{
    ReduceFn {
        f,
        _types: PhantomData,
    }
}

impl<F, K, V, T, O> Reducer for ReduceFn<F, K, V>
where
    F: Fn(&K, Values<V>) -> anyhow::Result<T> + Send + Sync,
    T: IntoIterator<Item = O>,
    K: Hash + Eq + Debug + Send,
    V: Send,
    O: Send,
{
    type Key = K;
    type Value = V;
    type Output = O;

    fn reduce(&self, key: &K, values: Values<V>) -> anyhow::Result<impl IntoIterator<Item = O>> {
        (self.f)(key, values)
    }
}

//! src/reducers/adder.rs
use crate::functions::Reducer;
use crate::record::Values;

/// Sums the counts of a word.
#[derive(Debug, Clone, Copy, Default)]
pub struct Adder;

impl Reducer for Adder {
    type Key = String;
    type Value = u64;
    type Output = (String, u64);

    fn reduce(
        &self,
        key: &String,
        values: Values<u64>,
    ) -> anyhow::Result<impl IntoIterator<Item = (String, u64)>> {
        Ok(Some((key.clone(), values.sum())))
    }
}

//! src/mappers/word_counter.rs
use crate::functions::Mapper;
use crate::record::KeyedRecord;

/// Emits `(word, 1)` for every alphabetic word of a line, lowercased.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCounter;

impl Mapper for WordCounter {
    type Input = String;
    type Key = String;
    type Value = u64;
    type SortValue = ();

    fn map(
        &self,
        line: String,
    ) -> anyhow::Result<impl IntoIterator<Item = KeyedRecord<String, u64>>> {
        let words: Vec<_> = line
            .to_lowercase()
            .split(|c: char| !c.is_alphabetic())
            .filter(|word| !word.is_empty())
            .map(|word| KeyedRecord::new(word.to_string(), 1))
            .collect();
        Ok(words)
    }
}

//! tests/api/grouping.rs
use claims::{assert_err, assert_ok};
use inmem_mapreduce::grouper::{Grouper, group};
use inmem_mapreduce::{KeyOrder, KeyedRecord, StageConfig, ValueOrder};
use std::collections::HashSet;

/// Deterministic spread of `(key, value)` pairs over a handful of keys.
fn emissions(count: u32) -> Vec<KeyedRecord<u32, u32>> {
    (0..count)
        .map(|n| KeyedRecord::new((n * 31 + 7) % 11, (n * 17) % 97))
        .collect()
}

#[test]
fn no_value_is_lost_or_duplicated() {
    let records = emissions(500);
    let mut emitted: Vec<(u32, u32)> = records.iter().map(|r| (*r.key(), *r.value())).collect();

    let groups = assert_ok!(group(records, &StageConfig::default()));
    let mut grouped: Vec<(u32, u32)> = groups
        .iter()
        .flat_map(|group| group.values().iter().map(|value| (*group.key(), *value)))
        .collect();

    emitted.sort_unstable();
    grouped.sort_unstable();
    assert_eq!(grouped, emitted);
}

#[test]
fn every_key_has_exactly_one_group() {
    let config = StageConfig::default().key_order(KeyOrder::Ascending);
    let groups = assert_ok!(group(emissions(500), &config));

    let keys: Vec<u32> = groups.iter().map(|group| *group.key()).collect();
    let distinct: HashSet<u32> = keys.iter().copied().collect();
    assert_eq!(keys.len(), distinct.len());
    assert_eq!(keys, (0..11).collect::<Vec<_>>());
}

#[test]
fn values_keep_emission_order_by_default() {
    let records = emissions(200);
    let groups = assert_ok!(group(records.clone(), &StageConfig::default()));

    for group in &groups {
        let expected: Vec<u32> = records
            .iter()
            .filter(|record| record.key() == group.key())
            .map(|record| *record.value())
            .collect();
        assert_eq!(group.values(), expected.as_slice());
    }
}

#[test]
fn regrouping_is_idempotent() {
    let config = StageConfig::default().value_order(ValueOrder::Ascending);
    let first = assert_ok!(group(emissions(300), &config));
    let second = assert_ok!(group(emissions(300), &config));
    assert_eq!(first, second);
}

#[test]
fn equal_sort_values_keep_emission_order() {
    let records = vec![
        KeyedRecord::sorted("k", 2, "late"),
        KeyedRecord::sorted("k", 1, "first"),
        KeyedRecord::sorted("k", 2, "later"),
        KeyedRecord::sorted("k", 1, "second"),
    ];
    let groups = assert_ok!(group(records, &StageConfig::default()));
    assert_eq!(groups[0].values(), &["first", "second", "late", "later"]);
}

#[test]
fn reverse_orders_values_descending() {
    let records: Vec<KeyedRecord<&str, u32>> = [5, 1, 4, 2, 3]
        .into_iter()
        .map(|value| KeyedRecord::new("k", value))
        .collect();
    let config = StageConfig::default()
        .value_order(ValueOrder::Ascending)
        .reverse(true);
    let groups = assert_ok!(group(records, &config));
    assert_eq!(groups[0].values(), &[5, 4, 3, 2, 1]);
}

#[test]
fn sort_key_derives_the_secondary_order() {
    let records: Vec<KeyedRecord<char, &str, usize>> = ["ccc", "a", "bb", "dddd"]
        .into_iter()
        .map(|word| KeyedRecord::with_optional_sort('w', None, word))
        .collect();
    let config = StageConfig::default().sort_key(|word: &&str| word.len());
    let groups = assert_ok!(group(records, &config));
    assert_eq!(groups[0].values(), &["a", "bb", "ccc", "dddd"]);
}

#[test]
fn incomparable_sort_values_fail_the_grouping() {
    let records = vec![
        KeyedRecord::sorted("k", 1.0, 'a'),
        KeyedRecord::sorted("k", f64::NAN, 'b'),
    ];
    let error = assert_err!(group(records, &StageConfig::default()));
    assert_eq!(error.key(), Some("\"k\""));
}

#[test]
fn the_grouper_counts_what_it_receives() {
    let config = StageConfig::default();
    let mut grouper = Grouper::new(&config);
    grouper.extend(emissions(50));
    grouper.push(KeyedRecord::new(100, 0));
    assert_eq!(grouper.received(), 51);
    assert_eq!(grouper.keys(), 12);
    assert_eq!(assert_ok!(grouper.finish()).len(), 12);
}

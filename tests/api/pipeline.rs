//! tests/api/pipeline.rs
use crate::helpers::{init_tracing, parity_sum, word_count};
use claims::{assert_err, assert_matches, assert_ok};
use inmem_mapreduce::tools::collect_by_key;
use inmem_mapreduce::{
    ExecutorKind, KeyOrder, KeyedRecord, Mapper, Phase, Pipeline, PipelineError, Reducer, Stage,
    StageConfig, StageState, ValueOrder, Values, map_fn, reduce_fn,
};

#[test]
fn parity_groups_are_summed() {
    init_tracing();
    let pipeline = Pipeline::new().stage(parity_sum());

    let output = assert_ok!(pipeline.run(vec![1u32, 2, 3, 4]));
    let stats = output.stats().to_vec();
    let outputs = output.into_vec();

    // First-seen key order: 1 is emitted before 0.
    assert_eq!(outputs, vec![(1, 4), (0, 6)]);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].name(), "parity-sum");
    assert_eq!(stats[0].state(), StageState::Complete);
    assert_eq!(stats[0].groups(), 2);
}

#[test]
fn ascending_keys_put_even_numbers_first() {
    init_tracing();
    let stage = parity_sum().with_config(StageConfig::default().key_order(KeyOrder::Ascending));
    let pipeline = Pipeline::new().stage(stage);

    let outputs = assert_ok!(pipeline.run(vec![1u32, 2, 3, 4])).into_vec();
    assert_eq!(outputs, vec![(0, 6), (1, 4)]);
}

#[test]
fn stage_output_feeds_the_next_stage() {
    init_tracing();
    let words = vec!["the", "cat", "saw", "the", "dog", "and", "the", "cat"];
    let pipeline = Pipeline::new().stage(word_count()).stage(
        Stage::new(
            map_fn(|(word, count): (&'static str, u32)| Ok(Some(KeyedRecord::new(count, word)))),
            reduce_fn(|count: &u32, words: Values<&'static str>| {
                Ok(Some((*count, words.collect::<Vec<_>>())))
            }),
        )
        .with_config(StageConfig::default().key_order(KeyOrder::Ascending))
        .named("words-by-count"),
    );

    let output = assert_ok!(pipeline.run(words));
    let stats = output.stats().to_vec();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].records_out(), 5);
    assert_eq!(stats[1].records_in(), 5);

    assert_eq!(
        output.into_vec(),
        vec![
            (1, vec!["saw", "dog", "and"]),
            (2, vec!["cat"]),
            (3, vec!["the"]),
        ]
    );
}

#[test]
fn records_mapped_to_nothing_join_no_group() {
    init_tracing();
    let pipeline = Pipeline::new().stage(Stage::new(
        map_fn(|n: u32| Ok((n % 3 == 0).then(|| KeyedRecord::new(n % 2, n)))),
        reduce_fn(|parity: &u32, values: Values<u32>| {
            Ok(Some((*parity, values.collect::<Vec<_>>())))
        }),
    ));

    let output = assert_ok!(pipeline.run(1u32..=10));
    assert_eq!(output.stats()[0].records_in(), 10);
    assert_eq!(output.stats()[0].emitted(), 3);
    assert_eq!(output.into_vec(), vec![(1, vec![3, 9]), (0, vec![6])]);
}

#[test]
fn a_failing_reduce_aborts_the_run_with_its_key() {
    init_tracing();
    let pipeline = Pipeline::new().stage(parity_sum()).stage(Stage::new(
        map_fn(|(parity, sum): (u32, u32)| Ok(Some(KeyedRecord::new(parity, sum)))),
        reduce_fn(|parity: &u32, sums: Values<u32>| {
            anyhow::ensure!(*parity != 1, "odd sums are not welcome");
            Ok(sums.collect::<Vec<_>>())
        }),
    ));

    let error = assert_err!(pipeline.run(vec![1u32, 2, 3, 4]));
    assert_eq!(error.stage(), Some(1));
    assert_eq!(error.phase(), Some(Phase::Reduce));
    assert_eq!(error.key(), Some("1"));
    let user_error = assert_ok!(error.into_user_error());
    assert_eq!(user_error.to_string(), "odd sums are not welcome");
}

#[test]
fn a_grouping_failure_aborts_the_run_with_its_stage_and_key() {
    init_tracing();
    let pipeline = Pipeline::new().stage(parity_sum()).stage(Stage::new(
        map_fn(|(parity, sum): (u32, u32)| {
            let sort = (parity == 1).then_some(sum);
            Ok(Some(KeyedRecord::with_optional_sort("sums", sort, sum)))
        }),
        reduce_fn(|_: &&'static str, sums: Values<u32>| Ok(sums)),
    ));

    let error = assert_err!(pipeline.run(vec![1u32, 2, 3, 4]));
    assert_matches!(&error, PipelineError::Ordering { stage: 1, .. });
    assert_eq!(error.stage(), Some(1));
    assert_eq!(error.key(), Some("\"sums\""));
    assert_eq!(error.phase(), None);
    assert!(error.to_string().contains("stage 1 (stage-1)"));
}

#[test]
fn incomparable_values_abort_an_ascending_stage() {
    init_tracing();
    let stage = Stage::new(
        map_fn(|n: u32| {
            let value = if n == 3 { f64::NAN } else { f64::from(n) };
            Ok(Some(KeyedRecord::new(n % 2, value)))
        }),
        reduce_fn(|parity: &u32, values: Values<f64>| Ok(Some((*parity, values.sum::<f64>())))),
    )
    .with_config(StageConfig::default().value_order(ValueOrder::Ascending))
    .named("floats");
    let pipeline = Pipeline::new().stage(stage);

    let error = assert_err!(pipeline.run(1u32..=6));
    assert_eq!(error.stage(), Some(0));
    assert_eq!(error.key(), Some("1"));
    assert_matches!(
        &error,
        PipelineError::Ordering { source, .. } if source.reason() == "values cannot be compared"
    );
}

#[test]
fn nan_sort_values_fail_the_run_instead_of_panicking() {
    init_tracing();
    for nan_every in [2u64, 7, 31, 251] {
        let pipeline = Pipeline::new().stage(Stage::new(
            map_fn(move |n: u64| {
                let sort = if n % nan_every == 1 { f64::NAN } else { (n * 7919 % 1009) as f64 };
                Ok(Some(KeyedRecord::sorted(0u8, sort, n)))
            }),
            reduce_fn(|_: &u8, values: Values<u64>| Ok(values)),
        ));
        let error = assert_err!(pipeline.run(0u64..500));
        assert_matches!(error, PipelineError::Ordering { stage: 0, .. });
    }
}

#[test]
fn a_failing_map_aborts_the_run() {
    init_tracing();
    let pipeline = Pipeline::new().stage(Stage::new(
        map_fn(|n: i64| {
            anyhow::ensure!(n >= 0, "negative input {n}");
            Ok(Some(KeyedRecord::new(n, n)))
        }),
        reduce_fn(|_: &i64, values: Values<i64>| Ok(values)),
    ));

    let error = assert_err!(pipeline.run(vec![3, -1, 4]));
    assert_eq!(error.stage(), Some(0));
    assert_eq!(error.phase(), Some(Phase::Map));
    assert!(error.to_string().contains("stage 0 (stage-0)"));
}

#[test]
fn zero_stages_hand_back_the_input() {
    init_tracing();
    let input = vec![(3, "c"), (1, "a"), (3, "c")];
    let pipeline = Pipeline::new();
    assert_eq!(assert_ok!(pipeline.run(input.clone())).into_vec(), input);
}

#[test]
fn empty_input_produces_empty_output() {
    init_tracing();
    let pipeline = Pipeline::new().stage(parity_sum()).stage(swap());
    let output = assert_ok!(pipeline.run(Vec::<u32>::new()));
    assert_eq!(output.len(), 0);
    assert!(output.stats().iter().all(|stats| stats.groups() == 0));
}

#[test]
fn every_run_has_its_own_id() {
    init_tracing();
    let pipeline = Pipeline::new().stage(parity_sum());
    let first = assert_ok!(pipeline.run(vec![1u32]));
    let second = assert_ok!(pipeline.run(vec![1u32]));
    assert_ne!(first.run_id(), second.run_id());
}

#[test]
fn streaming_yields_the_same_records_as_running() {
    init_tracing();
    let pipeline = Pipeline::new().stage(word_count()).stage(word_count_by_initial());
    let words = vec!["apple", "avocado", "banana", "apple", "cherry", "blueberry"];

    let ran = assert_ok!(pipeline.run(words.clone())).into_vec();
    let stream = assert_ok!(pipeline.stream(words));
    assert_eq!(stream.completed_stages().len(), 1);
    let streamed = assert_ok!(stream.collect::<Result<Vec<_>, _>>());
    assert_eq!(streamed, ran);
    assert_eq!(streamed, vec![('a', 3), ('b', 2), ('c', 1)]);
}

#[test]
fn parallel_runs_match_sequential_runs() {
    init_tracing();
    let input: Vec<u32> = (0..5_000).map(|n| (n * 7919) % 1013).collect();
    let sequential = Pipeline::new().stage(parity_sum()).stage(swap());
    let parallel = Pipeline::new()
        .stage(parity_sum())
        .stage(swap())
        .with_executor(ExecutorKind::Parallel {
            map_jobs: 4,
            reduce_jobs: 3,
            chunk_size: 100,
        });

    let expected = assert_ok!(sequential.run(input.clone())).into_vec();
    let actual = assert_ok!(parallel.run(input)).into_vec();
    assert_eq!(actual, expected);
}

#[test]
fn outputs_can_be_collected_by_key() {
    init_tracing();
    let pipeline = Pipeline::new().stage(Stage::new(
        map_fn(|n: u32| Ok(Some(KeyedRecord::new(n % 3, n)))),
        reduce_fn(|rest: &u32, values: Values<u32>| {
            Ok(values.map(|value| (*rest, value)).collect::<Vec<_>>())
        }),
    ));

    let collected = collect_by_key(assert_ok!(pipeline.run(0u32..7)));
    assert_eq!(collected.get(&0), Some(&vec![0, 3, 6]));
    assert_eq!(collected.get(&1), Some(&vec![1, 4]));
    assert_eq!(collected.get(&2), Some(&vec![2, 5]));
}

fn word_count_by_initial() -> Stage<
    impl Mapper<Input = (&'static str, u32), Key = char, Value = u32, SortValue = ()>,
    impl Reducer<Key = char, Value = u32, Output = (char, u32)>,
> {
    Stage::new(
        map_fn(|(word, count): (&'static str, u32)| {
            Ok(word.chars().next().map(|initial| KeyedRecord::new(initial, count)))
        }),
        reduce_fn(|initial: &char, counts: Values<u32>| Ok(Some((*initial, counts.sum::<u32>())))),
    )
    .with_config(StageConfig::default().key_order(KeyOrder::Ascending))
}

/// Re-keys `(key, value)` pairs by value.
fn swap() -> Stage<
    impl Mapper<Input = (u32, u32), Key = u32, Value = u32, SortValue = ()>,
    impl Reducer<Key = u32, Value = u32, Output = (u32, Vec<u32>)>,
> {
    Stage::new(
        map_fn(|(key, value): (u32, u32)| Ok(Some(KeyedRecord::new(value, key)))),
        reduce_fn(|value: &u32, keys: Values<u32>| {
            Ok(Some((*value, keys.collect::<Vec<_>>())))
        }),
    )
}

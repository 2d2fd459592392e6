//! tests/api/configuration.rs
use crate::helpers::test_data_dir;
use claims::{assert_err, assert_ok};
use inmem_mapreduce::configuration::{ExecutionMode, environment, load_settings};
use inmem_mapreduce::{ExecutorKind, KeyOrder, StageConfig, ValueOrder};
use std::collections::HashMap;

fn no_environment() -> config::Environment {
    environment().source(Some(HashMap::new()))
}

#[test]
fn settings_are_read_from_yaml() {
    let settings = assert_ok!(load_settings(
        Some(test_data_dir().join("settings.yaml")),
        no_environment()
    ));
    assert_eq!(settings.log_level, "warn");
    assert_eq!(settings.executor.kind, ExecutionMode::Parallel);
    assert_eq!(
        settings.executor.executor(),
        ExecutorKind::Parallel {
            map_jobs: 4,
            reduce_jobs: 2,
            chunk_size: 64,
        }
    );

    let config = StageConfig::<String, u64>::from_settings(&settings.stage);
    assert_eq!(config.key_ordering(), KeyOrder::Ascending);
    assert_eq!(config.value_ordering(), ValueOrder::Ascending);
    assert!(config.is_reversed());
}

#[test]
fn environment_wins_over_the_file() {
    let vars = HashMap::from([
        ("MAPREDUCE_EXECUTOR__KIND".to_string(), "sequential".to_string()),
        ("MAPREDUCE_LOG_LEVEL".to_string(), "debug".to_string()),
    ]);
    let settings = assert_ok!(load_settings(
        Some(test_data_dir().join("settings.yaml")),
        environment().source(Some(vars))
    ));
    assert_eq!(settings.log_level, "debug");
    assert_eq!(settings.executor.executor(), ExecutorKind::Sequential);
}

#[test]
fn a_missing_file_falls_back_to_defaults() {
    let settings = assert_ok!(load_settings(
        Some(test_data_dir().join("does-not-exist.yaml")),
        no_environment()
    ));
    assert_eq!(settings.executor.executor(), ExecutorKind::Sequential);
    assert_eq!(settings.stage.key_order, KeyOrder::FirstSeen);
}

#[test]
fn unknown_orders_are_rejected() {
    let vars = HashMap::from([(
        "MAPREDUCE_STAGE__KEY_ORDER".to_string(),
        "sideways".to_string(),
    )]);
    assert_err!(load_settings(None, environment().source(Some(vars))));
}

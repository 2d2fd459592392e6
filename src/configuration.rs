//! src/configuration.rs
use crate::executors::ExecutorKind;
use crate::ordering::{KeyOrder, ValueOrder};
use serde_aux::field_attributes::deserialize_number_from_string;
use std::path::PathBuf;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub stage: StageSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

#[derive(serde::Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecutorSettings {
    #[serde(default)]
    pub kind: ExecutionMode,
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    pub map_jobs: usize,
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    pub reduce_jobs: usize,
    #[serde(
        default = "default_chunk_size",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub chunk_size: usize,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        ExecutorSettings {
            kind: ExecutionMode::default(),
            map_jobs: 0,
            reduce_jobs: 0,
            chunk_size: default_chunk_size(),
        }
    }
}

impl ExecutorSettings {
    pub fn executor(&self) -> ExecutorKind {
        match self.kind {
            ExecutionMode::Sequential => ExecutorKind::Sequential,
            ExecutionMode::Parallel => ExecutorKind::Parallel {
                map_jobs: self.map_jobs,
                reduce_jobs: self.reduce_jobs,
                chunk_size: self.chunk_size,
            },
        }
    }
}

/// Serialisable part of a `StageConfig`.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StageSettings {
    #[serde(default)]
    pub key_order: KeyOrder,
    #[serde(default)]
    pub value_order: ValueOrder,
    #[serde(default)]
    pub reverse: bool,
}

fn default_chunk_size() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".into()
}

/// `MAPREDUCE_EXECUTOR__MAP_JOBS=8` style overrides.
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("MAPREDUCE")
        .prefix_separator("_")
        .separator("__")
}

/// Reads `configuration/base.yaml` under the current directory, if present,
/// then applies environment overrides.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let config_file = base_path.join("configuration").join("base.yaml");
    load_settings(Some(config_file), environment())
}

pub fn load_settings(
    config_file: Option<PathBuf>,
    environment: config::Environment,
) -> Result<Settings, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(config_file) = config_file {
        builder = builder.add_source(config::File::from(config_file).required(false));
    }
    let settings = builder.add_source(environment).build()?;
    settings.try_deserialize::<Settings>()
}

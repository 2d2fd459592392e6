//! src/lib.rs
//!
//! In-process MapReduce. A [`Pipeline`] runs one or more [`Stage`]s; each
//! stage maps its input into keyed records, groups and orders them by key
//! and reduces every group, and its output feeds the next stage.
pub mod configuration;
pub mod error;
pub mod executors;
pub mod functions;
pub mod grouper;
pub mod mappers;
pub mod ordering;
pub mod pipeline;
pub mod record;
pub mod reducers;
pub mod stage;
pub mod telemetry;
pub mod tools;

pub use error::{OrderingError, Phase, PipelineError};
pub use executors::ExecutorKind;
pub use functions::{Mapper, Reducer, map_fn, reduce_fn};
pub use ordering::{KeyOrder, ValueOrder};
pub use pipeline::{Pipeline, PipelineOutput, ReduceStream};
pub use record::{Group, KeyedRecord, Values};
pub use stage::{Stage, StageConfig, StageState, StageStats};

//! src/error.rs
use std::fmt;

pub fn error_chain_fmt(
    f: &mut std::fmt::Formatter<'_>,
    e: &impl std::error::Error,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}

pub(crate) fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" for key {key}"),
        None => String::new(),
    }
}

/// Which user function raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => f.write_str("map"),
            Phase::Reduce => f.write_str("reduce"),
        }
    }
}

/// Raised by the grouper when values or keys cannot be put in the
/// configured order.
#[derive(thiserror::Error)]
#[error("{reason}{}", key_suffix(.key))]
pub struct OrderingError {
    key: Option<String>,
    reason: String,
}

impl OrderingError {
    pub(crate) fn new(key: Option<String>, reason: impl Into<String>) -> Self {
        OrderingError {
            key,
            reason: reason.into(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Debug for OrderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(f, self)
    }
}

/// First failure of a pipeline run. Nothing produced by the run is
/// returned alongside it.
#[derive(thiserror::Error)]
pub enum PipelineError {
    #[error("The {phase} function of stage {stage} ({stage_name}) failed{}", key_suffix(.key))]
    UserFunction {
        stage: usize,
        stage_name: String,
        phase: Phase,
        key: Option<String>,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to group the intermediate data of stage {stage} ({stage_name})")]
    Ordering {
        stage: usize,
        stage_name: String,
        #[source]
        source: OrderingError,
    },
    #[error("Failed to start the executor thread pool")]
    Executor(#[source] rayon::ThreadPoolBuildError),
}

impl PipelineError {
    /// Index of the stage that failed, if the failure belongs to one.
    pub fn stage(&self) -> Option<usize> {
        match self {
            PipelineError::UserFunction { stage, .. } | PipelineError::Ordering { stage, .. } => {
                Some(*stage)
            }
            PipelineError::Executor(_) => None,
        }
    }

    /// `Debug` rendering of the key being processed when the failure happened.
    pub fn key(&self) -> Option<&str> {
        match self {
            PipelineError::UserFunction { key, .. } => key.as_deref(),
            PipelineError::Ordering { source, .. } => source.key(),
            PipelineError::Executor(_) => None,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            PipelineError::UserFunction { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// The error returned by the user's map or reduce function, untouched.
    pub fn user_error(&self) -> Option<&anyhow::Error> {
        match self {
            PipelineError::UserFunction { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn into_user_error(self) -> Result<anyhow::Error, Self> {
        match self {
            PipelineError::UserFunction { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

impl fmt::Debug for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(f, self)
    }
}

use std::fmt;

use thiserror::Error;

use crate::revert::RevertReason;

/// Which part of a run a failed step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Deploy,
    Wire,
    Configure,
    Upgrade,
    Scenario,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Deploy => "deploy",
            Phase::Wire => "wire",
            Phase::Configure => "configure",
            Phase::Upgrade => "upgrade",
            Phase::Scenario => "scenario",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Duplicate contract name: {0}")]
    DuplicateName(String),

    #[error("Unresolved reference '{name}' required by {required_by}")]
    UnresolvedReference { name: String, required_by: String },

    #[error("Remote call failed ({context}): {message}")]
    RemoteCall {
        context: String,
        reason: Option<RevertReason>,
        message: String,
    },

    #[error("Assertion failed at step {index} ({label}): {detail}")]
    Assertion {
        index: usize,
        label: String,
        detail: String,
    },

    #[error("{phase} step {index} ({names}) failed: {source}")]
    StepFailed {
        phase: Phase,
        index: usize,
        names: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error("Configuration item '{item}' requires wiring '{wiring}' which has not been applied")]
    NotWired { item: String, wiring: String },

    #[error("ABI error: {0}")]
    AbiError(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DeployError {
    /// Wrap an error with the step that produced it.
    pub fn at_step(self, phase: Phase, index: usize, names: impl Into<String>) -> Self {
        DeployError::StepFailed {
            phase,
            index,
            names: names.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through `StepFailed` wrappers.
    pub fn root_cause(&self) -> &DeployError {
        match self {
            DeployError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The revert reason carried by the underlying remote call failure, if any.
    pub fn revert_reason(&self) -> Option<&RevertReason> {
        match self.root_cause() {
            DeployError::RemoteCall { reason, .. } => reason.as_ref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DeployError {
    fn from(e: serde_json::Error) -> Self {
        DeployError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for DeployError {
    fn from(e: toml::de::Error) -> Self {
        DeployError::ConfigError(e.to_string())
    }
}

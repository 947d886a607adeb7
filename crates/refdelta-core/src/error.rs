//! Error types for tree construction, configuration and parsing

use std::path::PathBuf;

use thiserror::Error;

use crate::model::NodeId;

/// A tree violates the forest or id invariants. Always a bug in whatever
/// produced the tree; never recovered from inside the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("node at position {position} carries id {found}; ids must be dense")]
    NonDenseId { position: usize, found: NodeId },

    #[error("node {node} refers to missing container {container}")]
    DanglingContainer { node: NodeId, container: NodeId },

    #[error("node {node} contains itself")]
    SelfContainment { node: NodeId },

    #[error("containment cycle through node {node}")]
    ContainmentCycle { node: NodeId },

    #[error("node {node} refers to missing supertype {supertype}")]
    DanglingSupertype { node: NodeId, supertype: NodeId },

    #[error("inheritance edge {node} -> {supertype} involves a non-type node")]
    SupertypeNotAType { node: NodeId, supertype: NodeId },

    #[error("inheritance edge {sub} -> {sup} is not mirrored in the subtype list")]
    AsymmetricInheritance { sub: NodeId, sup: NodeId },
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("similarity weight `{name}` must be finite and non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("similarity weights must not all be zero")]
    ZeroWeights,

    #[error("name and signature weights must not both be zero; nodes without bodies could not be told apart")]
    BodyOnlyWeights,

    #[error("threshold `{name}` must lie in [0, 1], got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error("move threshold {moving} is below the same-container threshold {same_container}")]
    MoveBelowSameContainer { moving: f64, same_container: f64 },

    #[error("priority order must list every detector family exactly once")]
    InvalidPriority,

    #[error("invalid config file: {0}")]
    Toml(String),
}

/// A parser plugin could not structurally analyze a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {file}: {reason}")]
pub struct ParseError {
    pub file: PathBuf,
    pub reason: String,
}

impl ParseError {
    pub fn new(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error for the core crate.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("malformed tree: {0}")]
    InvariantViolation(#[from] InvariantViolation),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = DiffError> = std::result::Result<T, E>;

//! Registry-level errors (wrap domain errors)

use thiserror::Error;

use crate::domain::{DomainError, ModelPath};

/// Registry errors wrap domain errors and add orchestration-level context:
/// the originating node path and the failing rule identity.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no factory can build type {type_name} (requested for {path})")]
    UnsupportedType { type_name: String, path: ModelPath },

    #[error("rule {rule} on {path}: declared input {input} cannot resolve")]
    DanglingInput {
        path: ModelPath,
        rule: String,
        input: String,
    },

    #[error("input cycle detected: {chain}")]
    GraphCycle { chain: String },

    #[error("no rule bound for {path}")]
    NoRuleBound { path: ModelPath },

    #[error("rule {rule} failed while realizing {path}")]
    RuleFailed {
        path: ModelPath,
        rule: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("node {path} previously failed in rule {rule}")]
    NodeFailed { path: ModelPath, rule: String },

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for registry operations.
pub type ModelResult<T> = Result<T, ModelError>;

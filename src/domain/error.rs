//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::node::NodeState;
use crate::domain::path::ModelPath;
use crate::domain::value::PropertyKind;

/// Domain errors represent violations of graph and schema invariants.
/// These are independent of registry orchestration concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid model path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("type {type_name} cannot be projected: {reason}")]
    Schema { type_name: String, reason: String },

    #[error("unknown property {property} on type {type_name}")]
    UnknownProperty { type_name: String, property: String },

    #[error("property {property} expects {expected:?}, got {actual:?}")]
    TypeMismatch {
        property: String,
        expected: PropertyKind,
        actual: PropertyKind,
    },

    #[error("property {property} on type {type_name} is read-only")]
    ReadOnlyProperty { type_name: String, property: String },

    #[error("node {path} rejects mutation in state {state:?}")]
    ImmutableState { path: ModelPath, state: NodeState },

    #[error("private instance for {path} set more than once")]
    DuplicateRealization { path: ModelPath },

    #[error("node {path}: illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        path: ModelPath,
        from: NodeState,
        to: NodeState,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

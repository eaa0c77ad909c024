//! # Errors
//!
//! One error enum per layer. Connection rejection is not an error: see
//! [`ConnectOutcome`](crate::graph::ConnectOutcome).

use crate::graph::{BlockId, SnapPointId};
use thiserror::Error;

/// Errors raised while reading or mutating a [`Graph`](crate::graph::Graph).
#[derive(Debug, Error)]
pub enum GraphError {
    /// A chain traversal exceeded its hop bound, which means the chain is cyclic or malformed.
    #[error("structural error: {0}")]
    Structural(String),

    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("snap point not found: {0}")]
    SnapPointNotFound(SnapPointId),

    #[error("unknown block definition: {0}")]
    UnknownDefinition(String),

    #[error("input '{input}' not found in segment '{segment}' of block {block}")]
    InputNotFound {
        block: BlockId,
        segment: String,
        input: String,
    },
}

/// Errors raised while lowering a chain to IR.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("force-scope block '{name}' ({block}) cannot branch at segment {segment}")]
    ForceScopeBranch {
        name: String,
        block: BlockId,
        segment: String,
    },

    #[error("no entry blocks found in graph - add a 'startAgent' or 'onMessage' block")]
    NoEntryBlocks,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("program text: {0}")]
    Text(#[from] serde_json::Error),
}

/// Errors raised while saving or restoring a graph document.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("document json: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors raised by the variable store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("variable store {field} must be a string, got {got}")]
    NotAString { field: &'static str, got: String },
}

/// Errors raised while a program runs. They never escape
/// [`Runtime::execute`](crate::runtime::Runtime::execute); they end the branch that raised them
/// and are logged where the branch was invoked.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no standard library function named '{0}'")]
    UnknownFunction(String),

    #[error("{function}: invalid inputs: {reason}")]
    InvalidInputs { function: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Custom(String),
}

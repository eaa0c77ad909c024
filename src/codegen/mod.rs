//! # Chain Code Generation
//!
//! Lowers block chains into the call-tree IR interpreted by the runtime.

mod chain_codegen;
pub mod ir;
mod node_handlers;

pub use chain_codegen::*;
pub use ir::{BoundInput, Branch, CallNode, Chain, Program};

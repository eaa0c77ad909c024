//! # Blockflow
//!
//! Snap-together block programs: a connection graph of typed blocks, a compiler that lowers a
//! block chain into a typed call tree, and an event-driven runtime that interprets it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blockflow::{compile_graph, BlockMetadataProvider, Graph, Point, Runtime};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = Graph::new(BlockMetadataProvider::new());
//! let start = graph.insert_block("startAgent", Point::new(0.0, 0.0))?;
//! // ... insert more blocks and snap them below `start`
//!
//! let program = compile_graph(&graph)?;
//! let runtime = Runtime::new();
//! let summary = runtime.execute(&program).await;
//! println!("{} calls", summary.calls);
//! # let _ = start;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Metadata** - Static block definitions and the default catalog
//! 2. **Graph** - Blocks, snap points and the connection resolver
//! 3. **Code Generation** - Chains lowered to [`Program`] IR
//! 4. **Serialization** - Graph documents and multi-page projects
//! 5. **Runtime** - Event bus, variable store and the standard library interpreter

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod project;
pub mod runtime;
pub mod serialization;

// Re-export the main compilation API
pub use compiler::{compile_chain, compile_graph, generate_program};

pub use codegen::{BoundInput, Branch, CallNode, Chain, Program};
pub use config::{Config, GraphConfig, RuntimeConfig};
pub use error::{CodegenError, GraphError, RuntimeError, SerializeError, StoreError};
pub use graph::{
    Block, BlockId, ConnectOutcome, DisconnectOutcome, Graph, Point, SnapPoint, SnapPointId,
    SnapPointKind,
};
pub use metadata::{BlockDefinition, BlockMetadataProvider};
pub use project::{Page, Project};
pub use runtime::{eval_statement, ExecutionSummary, Runtime, VariableStore};
pub use serialization::{deserialize, serialize, Document};

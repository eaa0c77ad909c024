//! # Chain Code Generator
//!
//! Walks a block's primary chain and emits one call per block. Nested scopes become deferred
//! branch bodies generated recursively over their own chains.

use super::ir::{Branch, CallNode, Chain};
use super::node_handlers;
use crate::error::{CodegenError, GraphError};
use crate::graph::{Block, BlockId, Graph, SnapPointKind};
use std::collections::HashSet;

/// Lowers chains of one graph to IR.
pub struct ChainCodeGenerator<'a> {
    graph: &'a Graph,
    visited: HashSet<BlockId>,
}

impl<'a> ChainCodeGenerator<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            visited: HashSet::new(),
        }
    }

    pub(crate) fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// Generate the chain that starts at `root`.
    ///
    /// Generation stops at the first block without a primary continuation, or at a force-scope
    /// block, whose continuation becomes its body instead.
    pub fn generate_chain(&mut self, root: &BlockId) -> Result<Chain, CodegenError> {
        let mut calls = Vec::new();
        let mut current = Some(root.clone());

        while let Some(block_id) = current {
            // A block reached twice means the chain loops back on itself
            if !self.visited.insert(block_id.clone()) {
                return Err(GraphError::Structural(format!(
                    "block {} reached twice while generating chain from {}",
                    block_id, root
                ))
                .into());
            }

            let block = self.graph.block(&block_id)?;
            tracing::debug!("[CODEGEN] Generating call for block {} '{}'", block.id, block.name);

            if block.is_force_scope() {
                calls.push(node_handlers::force_scope_call(self, block)?);
                break;
            }

            calls.push(self.generate_block_call(block)?);
            current = self.graph.primary_next(&block_id)?;
        }

        Ok(Chain { calls })
    }

    /// A call with its inputs and one branch per occupied secondary notch.
    fn generate_block_call(&mut self, block: &Block) -> Result<CallNode, CodegenError> {
        let mut call = CallNode {
            target: block.name.clone(),
            block: block.id.clone(),
            inputs: node_handlers::bound_inputs(block),
            branches: Default::default(),
            scope: None,
        };

        for snap_id in &block.snap_points {
            let snap = self.graph.snap_point(snap_id)?;
            if snap.kind != SnapPointKind::SecondaryNotch {
                continue;
            }
            let Some(divot) = &snap.next else {
                continue;
            };

            let nested_root = self.graph.snap_point(divot)?.block.clone();
            let body = self.generate_chain(&nested_root)?;
            let segment_name = block
                .definition
                .segment(&snap.segment_id)
                .map(|segment| segment.name.clone())
                .unwrap_or_default();

            tracing::debug!(
                "[CODEGEN] Branch {} of '{}' holds {} calls",
                snap.segment_id,
                block.name,
                body.len()
            );
            call.branches.insert(
                snap.segment_id.clone(),
                Branch { segment_name, body },
            );
        }

        Ok(call)
    }
}

/// Generate the chain rooted at `root`.
pub fn generate_chain(graph: &Graph, root: &BlockId) -> Result<Chain, CodegenError> {
    ChainCodeGenerator::new(graph).generate_chain(root)
}

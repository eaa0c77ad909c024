//! # Block-Specific Handlers
//!
//! Input binding extraction and the force-scope call form.

use super::chain_codegen::ChainCodeGenerator;
use super::ir::{BoundInput, CallNode};
use crate::error::CodegenError;
use crate::graph::{Block, SnapPointKind};
use std::collections::BTreeMap;

/// Bound inputs of every segment that declares any, keyed by segment id.
pub(crate) fn bound_inputs(block: &Block) -> BTreeMap<String, Vec<BoundInput>> {
    block
        .inputs
        .iter()
        .filter(|(_, bindings)| !bindings.is_empty())
        .map(|(segment_id, bindings)| {
            let segment_name = block
                .definition
                .segment(segment_id)
                .map(|segment| segment.name.clone())
                .unwrap_or_default();

            let inputs = bindings
                .iter()
                .map(|binding| BoundInput {
                    id: binding.declaration.id.clone(),
                    name: binding.declaration.name.clone(),
                    internal_name: binding.declaration.internal_name.clone(),
                    input_type: binding.declaration.input_type,
                    mode: binding.declaration.mode,
                    key: binding.key.clone(),
                    segment_name: segment_name.clone(),
                })
                .collect();

            (segment_id.clone(), inputs)
        })
        .collect()
}

/// A force-scope block owns the rest of its chain: the primary continuation becomes the call's
/// single body. Secondary branches are not allowed on such blocks.
pub(crate) fn force_scope_call(
    generator: &mut ChainCodeGenerator<'_>,
    block: &Block,
) -> Result<CallNode, CodegenError> {
    let graph = generator.graph();

    for snap_id in &block.snap_points {
        let snap = graph.snap_point(snap_id)?;
        if snap.kind == SnapPointKind::SecondaryNotch && snap.next.is_some() {
            return Err(CodegenError::ForceScopeBranch {
                name: block.name.clone(),
                block: block.id.clone(),
                segment: snap.segment_id.clone(),
            });
        }
    }

    let scope = match graph.primary_next(&block.id)? {
        Some(next) => Some(generator.generate_chain(&next)?),
        None => None,
    };

    Ok(CallNode {
        target: block.name.clone(),
        block: block.id.clone(),
        inputs: bound_inputs(block),
        branches: BTreeMap::new(),
        scope,
    })
}

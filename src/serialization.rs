//! # Graph Documents
//!
//! Durable snapshot of a [`Graph`]: every block with its captured definition and input
//! bindings, plus a connection table of every live notch to divot link. Restoring rebuilds each
//! block with fresh snap points and replays the connection table through the resolver.

use crate::config::GraphConfig;
use crate::error::SerializeError;
use crate::graph::{
    BlockId, Graph, InputUpdate, Placement, Point, SnapPointId, SnapPointKind,
};
use crate::metadata::{BlockDefinition, BlockMetadataProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: BTreeMap<BlockId, SerializedBlock>,
    /// Keyed by notch id.
    pub notches: BTreeMap<SnapPointId, SerializedNotch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedBlock {
    pub id: BlockId,
    pub name: String,
    /// Canvas position of the block's origin.
    pub position: Point,
    /// Offset from the notch the block hangs from. Absent for chain roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<Point>,
    pub segments: Vec<SerializedSegment>,
    pub definition: BlockDefinition,
    pub primary_notch_id: Option<SnapPointId>,
    pub primary_divot_id: Option<SnapPointId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSegment {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<SerializedInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedInput {
    pub id: String,
    pub key: Option<String>,
    pub display_text: Option<String>,
    pub occupied: bool,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNotch {
    pub notch_block_id: BlockId,
    pub divot_block_id: BlockId,
    pub notch_id: SnapPointId,
    pub divot_id: SnapPointId,
    pub notch_segment_id: String,
    pub divot_segment_id: String,
    pub is_primary: bool,
}

impl Document {
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, SerializeError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Capture every block and every live link of `graph`.
pub fn serialize(graph: &Graph) -> Result<Document, SerializeError> {
    let mut document = Document::default();

    for block in graph.blocks() {
        let segments = block
            .definition
            .segments
            .iter()
            .map(|segment| SerializedSegment {
                id: segment.id.clone(),
                inputs: block
                    .inputs
                    .get(&segment.id)
                    .map(|bindings| {
                        bindings
                            .iter()
                            .map(|binding| SerializedInput {
                                id: binding.declaration.id.clone(),
                                key: binding.key.clone(),
                                display_text: binding.display_text.clone(),
                                occupied: binding.occupied,
                                constant: binding.constant,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        let offset = match &block.placement {
            Placement::Root { .. } => None,
            Placement::Attached { offset, .. } => Some(*offset),
        };

        document.blocks.insert(
            block.id.clone(),
            SerializedBlock {
                id: block.id.clone(),
                name: block.name.clone(),
                position: graph.global_position(&block.id)?,
                offset,
                segments,
                definition: block.definition.clone(),
                primary_notch_id: block.primary_notch.clone(),
                primary_divot_id: block.primary_divot.clone(),
            },
        );

        for snap_id in &block.snap_points {
            let notch = graph.snap_point(snap_id)?;
            if !notch.kind.is_notch() {
                continue;
            }
            let Some(divot_id) = &notch.next else {
                continue;
            };
            let divot = graph.snap_point(divot_id)?;

            document.notches.insert(
                notch.id.clone(),
                SerializedNotch {
                    notch_block_id: notch.block.clone(),
                    divot_block_id: divot.block.clone(),
                    notch_id: notch.id.clone(),
                    divot_id: divot.id.clone(),
                    notch_segment_id: notch.segment_id.clone(),
                    divot_segment_id: divot.segment_id.clone(),
                    is_primary: notch.kind == SnapPointKind::PrimaryNotch,
                },
            );
        }
    }

    tracing::debug!(
        "[SERDE] Serialized {} blocks, {} connections",
        document.blocks.len(),
        document.notches.len()
    );
    Ok(document)
}

/// Rebuild a graph from `document` with the default graph configuration.
pub fn deserialize(
    document: &Document,
    metadata: BlockMetadataProvider,
) -> Result<Graph, SerializeError> {
    deserialize_with_config(document, metadata, GraphConfig::default())
}

/// Rebuild a graph from `document`.
///
/// Blocks are recreated from their captured definitions, so they do not need to be present in
/// `metadata`. Connection entries that name missing snap points, or that the resolver would
/// reject, are logged and skipped.
pub fn deserialize_with_config(
    document: &Document,
    metadata: BlockMetadataProvider,
    config: GraphConfig,
) -> Result<Graph, SerializeError> {
    tracing::info!(
        "[SERDE] Restoring {} blocks, {} connections",
        document.blocks.len(),
        document.notches.len()
    );
    let mut graph = Graph::with_config(metadata, config);

    // Phase 1: Blocks and bindings
    for (id, block) in &document.blocks {
        graph.insert_with_id(id.clone(), block.definition.clone(), block.position)?;

        for segment in &block.segments {
            for input in &segment.inputs {
                let update = InputUpdate {
                    display_text: input.display_text.clone(),
                    key: input.key.clone(),
                    occupied: Some(input.occupied),
                    constant: Some(input.constant),
                };
                if let Err(e) = graph.update_input(id, &segment.id, &input.id, update) {
                    tracing::warn!("[SERDE] Skipping input binding: {}", e);
                }
            }
        }
    }

    // Phase 2: Links. Heights shift while the table replays, so only structural checks apply.
    for (notch_id, entry) in &document.notches {
        if !graph.is_notch(notch_id) || !graph.is_divot(&entry.divot_id) {
            tracing::warn!(
                "[SERDE] Skipping connection {} -> {}: unknown snap point",
                notch_id,
                entry.divot_id
            );
            continue;
        }
        if let Some(reason) = graph.link_rejection(notch_id, &entry.divot_id)? {
            tracing::warn!(
                "[SERDE] Skipping connection {} -> {}: {:?}",
                notch_id,
                entry.divot_id,
                reason
            );
            continue;
        }
        graph.attach(notch_id, &entry.divot_id)?;
    }

    // Phase 3: Recorded offsets of attached blocks
    for (id, block) in &document.blocks {
        let Some(offset) = block.offset else {
            continue;
        };
        if let Placement::Attached { notch, .. } = &graph.block(id)?.placement {
            let notch = notch.clone();
            graph.block_mut(id)?.placement = Placement::Attached { notch, offset };
        }
    }

    tracing::info!("[SERDE] Restored graph with {} blocks", graph.len());
    Ok(graph)
}

impl Graph {
    pub fn to_document(&self) -> Result<Document, SerializeError> {
        serialize(self)
    }

    pub fn from_document(
        document: &Document,
        metadata: BlockMetadataProvider,
    ) -> Result<Graph, SerializeError> {
        deserialize(document, metadata)
    }
}

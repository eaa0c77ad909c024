//! # Block Graph
//!
//! A [`Graph`] is one editing session: it owns every block, every snap point and the
//! Notch/Divot registries used for proximity search. All structural mutation goes through the
//! resolver methods in [`resolver`].

mod block;
pub mod layout;
mod resolver;
mod snap_point;

pub use block::{Block, BlockId, InputBinding, InputUpdate, Placement, SegmentState};
pub use layout::{Layout, LayoutResult, SegmentLayout, SnapPointSlot};
pub use resolver::{
    Candidate, ConnectOutcome, Connection, DisconnectOutcome, DragOutcome, RejectReason,
};
pub use snap_point::{Point, SnapPoint, SnapPointId, SnapPointKind};

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::metadata::{BlockDefinition, BlockMetadataProvider, SegmentKind};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
struct DragState {
    active: Option<BlockId>,
    pending: Option<Candidate>,
}

pub struct Graph {
    config: GraphConfig,
    metadata: BlockMetadataProvider,
    layout: Box<dyn Layout>,
    blocks: HashMap<BlockId, Block>,
    snap_points: HashMap<SnapPointId, SnapPoint>,
    notches: HashSet<SnapPointId>,
    divots: HashSet<SnapPointId>,
    drag: DragState,
}

impl Graph {
    pub fn new(metadata: BlockMetadataProvider) -> Self {
        Self::with_config(metadata, GraphConfig::default())
    }

    pub fn with_config(metadata: BlockMetadataProvider, config: GraphConfig) -> Self {
        Self {
            config,
            metadata,
            layout: Box::new(SegmentLayout),
            blocks: HashMap::new(),
            snap_points: HashMap::new(),
            notches: HashSet::new(),
            divots: HashSet::new(),
            drag: DragState::default(),
        }
    }

    /// Replace the layout used for heights and snap point positions.
    pub fn with_layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn metadata(&self) -> &BlockMetadataProvider {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: &BlockId) -> Result<&Block, GraphError> {
        self.blocks
            .get(id)
            .ok_or_else(|| GraphError::BlockNotFound(id.clone()))
    }

    pub(crate) fn block_mut(&mut self, id: &BlockId) -> Result<&mut Block, GraphError> {
        self.blocks
            .get_mut(id)
            .ok_or_else(|| GraphError::BlockNotFound(id.clone()))
    }

    /// Blocks sorted by id.
    pub fn blocks(&self) -> Vec<&Block> {
        let mut blocks: Vec<_> = self.blocks.values().collect();
        blocks.sort_by(|a, b| a.id.cmp(&b.id));
        blocks
    }

    pub fn snap_point(&self, id: &SnapPointId) -> Result<&SnapPoint, GraphError> {
        self.snap_points
            .get(id)
            .ok_or_else(|| GraphError::SnapPointNotFound(id.clone()))
    }

    pub(crate) fn snap_point_mut(
        &mut self,
        id: &SnapPointId,
    ) -> Result<&mut SnapPoint, GraphError> {
        self.snap_points
            .get_mut(id)
            .ok_or_else(|| GraphError::SnapPointNotFound(id.clone()))
    }

    pub fn is_notch(&self, id: &SnapPointId) -> bool {
        self.notches.contains(id)
    }

    pub fn is_divot(&self, id: &SnapPointId) -> bool {
        self.divots.contains(id)
    }

    /// Create a block from a catalog definition.
    pub fn insert_block(&mut self, name: &str, position: Point) -> Result<BlockId, GraphError> {
        let definition = self
            .metadata
            .get_block_definition(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownDefinition(name.to_string()))?;
        self.insert_definition(definition, position)
    }

    pub fn insert_definition(
        &mut self,
        definition: BlockDefinition,
        position: Point,
    ) -> Result<BlockId, GraphError> {
        self.insert_with_id(BlockId::new(), definition, position)
    }

    /// Create a block and its snap points together.
    pub(crate) fn insert_with_id(
        &mut self,
        id: BlockId,
        definition: BlockDefinition,
        position: Point,
    ) -> Result<BlockId, GraphError> {
        let segment_count = definition.segments.len();
        let mut snap_ids = Vec::new();
        let mut primary_notch = None;
        let mut primary_divot = None;
        let mut dynamic = false;

        for (index, segment) in definition.segments.iter().enumerate() {
            let mut kinds = Vec::with_capacity(2);
            if segment.divot {
                kinds.push(SnapPointKind::PrimaryDivot);
            }
            if segment.notch {
                kinds.push(match segment.kind {
                    SegmentKind::Header if segment_count == 1 => SnapPointKind::PrimaryNotch,
                    SegmentKind::Header | SegmentKind::Divider => SnapPointKind::SecondaryNotch,
                    SegmentKind::Footer => SnapPointKind::PrimaryNotch,
                });
            }

            for kind in kinds {
                let snap_id = SnapPointId::derive(&id, index, kind);
                match kind {
                    SnapPointKind::PrimaryNotch => {
                        primary_notch = Some(snap_id.clone());
                        self.notches.insert(snap_id.clone());
                    }
                    SnapPointKind::SecondaryNotch => {
                        dynamic = true;
                        self.notches.insert(snap_id.clone());
                    }
                    SnapPointKind::PrimaryDivot => {
                        primary_divot = Some(snap_id.clone());
                        self.divots.insert(snap_id.clone());
                    }
                    SnapPointKind::Joint => {}
                }

                self.snap_points.insert(
                    snap_id.clone(),
                    SnapPoint {
                        id: snap_id.clone(),
                        block: id.clone(),
                        segment_id: segment.id.clone(),
                        segment_index: index,
                        kind,
                        previous: None,
                        next: None,
                        position: Point::default(),
                    },
                );
                snap_ids.push(snap_id);
            }
        }

        let segments: BTreeMap<String, SegmentState> = definition
            .segments
            .iter()
            .map(|segment| (segment.id.clone(), SegmentState::default()))
            .collect();

        let inputs: BTreeMap<String, Vec<InputBinding>> = definition
            .segments
            .iter()
            .filter(|segment| !segment.inputs.is_empty())
            .map(|segment| {
                let bindings = segment
                    .inputs
                    .iter()
                    .cloned()
                    .map(InputBinding::unbound)
                    .collect();
                (segment.id.clone(), bindings)
            })
            .collect();

        tracing::debug!(
            "[GRAPH] Created block {} '{}' with {} snap points",
            id,
            definition.name,
            snap_ids.len()
        );

        self.blocks.insert(
            id.clone(),
            Block {
                id: id.clone(),
                name: definition.name.clone(),
                definition,
                segments,
                snap_points: snap_ids,
                primary_notch,
                primary_divot,
                deepest_child: id.clone(),
                inputs,
                height: 0.0,
                placement: Placement::Root { position },
                dynamic,
            },
        );

        self.relayout(&id)?;
        Ok(id)
    }

    /// Destroy a block and its snap points. Anything linked to it is detached first.
    pub fn remove_block(&mut self, id: &BlockId) -> Result<(), GraphError> {
        let snap_ids = self.block(id)?.snap_points.clone();
        let mut touched = Vec::new();

        for snap_id in &snap_ids {
            let snap = self.snap_point(snap_id)?.clone();
            if let Some(notch) = snap.previous {
                let owner = self.snap_point(&notch)?.block.clone();
                self.unlink(&notch, snap_id)?;
                touched.push(owner);
            }
            if let Some(divot) = snap.next {
                let owner = self.snap_point(&divot)?.block.clone();
                self.detach_to_root(&owner)?;
                self.unlink(snap_id, &divot)?;
                touched.push(owner);
            }
        }

        for snap_id in &snap_ids {
            self.snap_points.remove(snap_id);
            self.notches.remove(snap_id);
            self.divots.remove(snap_id);
        }
        self.blocks.remove(id);
        if self.drag.active.as_ref() == Some(id) {
            self.drag = DragState::default();
        }

        for owner in touched {
            self.calculate_deepest_child(&owner)?;
            self.adjust_height(&owner)?;
        }

        tracing::debug!("[GRAPH] Removed block {}", id);
        Ok(())
    }

    /// Ask the layout for the block's height and snap point positions.
    pub(crate) fn relayout(&mut self, id: &BlockId) -> Result<(), GraphError> {
        let block = self.block(id)?;
        let mut slots = Vec::with_capacity(block.snap_points.len());
        for snap_id in &block.snap_points {
            let snap = self.snap_point(snap_id)?;
            slots.push(SnapPointSlot {
                segment_index: snap.segment_index,
                kind: snap.kind,
            });
        }

        let result = self.layout.layout(&block.definition, &block.segments, &slots);
        let snap_ids = block.snap_points.clone();

        for (snap_id, position) in snap_ids.iter().zip(result.positions) {
            self.snap_point_mut(snap_id)?.position = position;
        }
        self.block_mut(id)?.height = result.height;
        Ok(())
    }

    /// Canvas position of a block's origin.
    pub fn global_position(&self, id: &BlockId) -> Result<Point, GraphError> {
        // Offsets from the block up to its root, innermost first.
        let mut offsets = Vec::new();
        let mut current = id.clone();

        for _ in 0..=self.blocks.len() {
            match &self.block(&current)?.placement {
                Placement::Root { position } => {
                    let mut global = *position;
                    for offset in offsets.iter().rev() {
                        global = global + *offset;
                    }
                    return Ok(global);
                }
                Placement::Attached { notch, offset } => {
                    let notch = self.snap_point(notch)?;
                    offsets.push(*offset);
                    offsets.push(notch.position);
                    current = notch.block.clone();
                }
            }
        }

        Err(GraphError::Structural(format!(
            "placement of block {} does not reach a root",
            id
        )))
    }

    /// Canvas position of a snap point.
    pub fn snap_point_position(&self, id: &SnapPointId) -> Result<Point, GraphError> {
        let snap = self.snap_point(id)?;
        Ok(self.global_position(&snap.block)? + snap.position)
    }

    /// Move a block so its origin lands on `position`. Attached blocks keep their attachment.
    pub fn move_block(&mut self, id: &BlockId, position: Point) -> Result<(), GraphError> {
        let placement = match &self.block(id)?.placement {
            Placement::Root { .. } => Placement::Root { position },
            Placement::Attached { notch, .. } => {
                let anchor = self.snap_point_position(notch)?;
                Placement::Attached {
                    notch: notch.clone(),
                    offset: position - anchor,
                }
            }
        };
        self.block_mut(id)?.placement = placement;
        Ok(())
    }

    /// Turn a block into a chain root at its current canvas position.
    pub(crate) fn detach_to_root(&mut self, id: &BlockId) -> Result<(), GraphError> {
        let position = self.global_position(id)?;
        self.block_mut(id)?.placement = Placement::Root { position };
        Ok(())
    }

    /// Blocks that do not hang from any notch, sorted by id.
    pub fn roots(&self) -> Vec<&Block> {
        self.blocks().into_iter().filter(|block| block.is_root()).collect()
    }

    pub fn find_input(
        &self,
        block: &BlockId,
        segment_id: &str,
        input_id: &str,
    ) -> Result<&InputBinding, GraphError> {
        self.block(block)?
            .input(segment_id, input_id)
            .ok_or_else(|| GraphError::InputNotFound {
                block: block.clone(),
                segment: segment_id.to_string(),
                input: input_id.to_string(),
            })
    }

    /// Apply an editor change to an input binding.
    pub fn update_input(
        &mut self,
        block: &BlockId,
        segment_id: &str,
        input_id: &str,
        update: InputUpdate,
    ) -> Result<&InputBinding, GraphError> {
        let binding = self.input_mut(block, segment_id, input_id)?;
        if let Some(display_text) = update.display_text {
            binding.display_text = Some(display_text);
        }
        if let Some(key) = update.key {
            binding.key = Some(key);
        }
        if let Some(occupied) = update.occupied {
            binding.occupied = occupied;
        }
        if let Some(constant) = update.constant {
            binding.constant = constant;
        }
        Ok(binding)
    }

    /// Clear an input back to its declared, unbound state.
    pub fn reset_input(
        &mut self,
        block: &BlockId,
        segment_id: &str,
        input_id: &str,
    ) -> Result<(), GraphError> {
        let binding = self.input_mut(block, segment_id, input_id)?;
        binding.key = None;
        binding.display_text = None;
        binding.occupied = false;
        Ok(())
    }

    fn input_mut(
        &mut self,
        block: &BlockId,
        segment_id: &str,
        input_id: &str,
    ) -> Result<&mut InputBinding, GraphError> {
        self.block_mut(block)?
            .input_mut(segment_id, input_id)
            .ok_or_else(|| GraphError::InputNotFound {
                block: block.clone(),
                segment: segment_id.to_string(),
                input: input_id.to_string(),
            })
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("config", &self.config)
            .field("blocks", &self.blocks.len())
            .field("notches", &self.notches.len())
            .field("divots", &self.divots.len())
            .finish()
    }
}

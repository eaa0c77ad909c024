//! # Blocks
//!
//! A block is an instance of a [`BlockDefinition`] placed on the canvas. Link fields live on
//! its snap points and are only changed by the connection resolver.

use super::{Point, SnapPointId};
use crate::metadata::{BlockDefinition, InputDeclaration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable per-segment state. Derived from the chain structure; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentState {
    /// Combined height of the blocks nested in this segment's scope.
    pub extra_height: f64,
}

/// An input slot together with its current binding.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub declaration: InputDeclaration,
    /// Variable store key this input reads or writes.
    pub key: Option<String>,
    pub display_text: Option<String>,
    pub occupied: bool,
    pub constant: bool,
}

impl InputBinding {
    pub(crate) fn unbound(declaration: InputDeclaration) -> Self {
        Self {
            declaration,
            key: None,
            display_text: None,
            occupied: false,
            constant: false,
        }
    }

    /// Text the renderer should show on the input.
    pub fn label(&self) -> &str {
        self.display_text
            .as_deref()
            .unwrap_or(&self.declaration.name)
    }
}

/// Partial update for an input binding; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct InputUpdate {
    pub display_text: Option<String>,
    pub key: Option<String>,
    pub occupied: Option<bool>,
    pub constant: Option<bool>,
}

/// Where a block sits on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// A chain root, positioned in canvas coordinates.
    Root { position: Point },
    /// Hangs from a notch; moves with it.
    Attached { notch: SnapPointId, offset: Point },
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub definition: BlockDefinition,
    /// Keyed by segment id.
    pub segments: BTreeMap<String, SegmentState>,
    /// Owned snap points in segment order.
    pub snap_points: Vec<SnapPointId>,
    pub primary_notch: Option<SnapPointId>,
    pub primary_divot: Option<SnapPointId>,
    /// Last block of the primary chain starting here.
    pub deepest_child: BlockId,
    /// Input bindings keyed by segment id, in declaration order.
    pub inputs: BTreeMap<String, Vec<InputBinding>>,
    pub height: f64,
    pub placement: Placement,
    pub(crate) dynamic: bool,
}

impl Block {
    /// A block with at least one nested scope.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn is_force_scope(&self) -> bool {
        self.definition.configuration.force_scope
    }

    pub fn is_root(&self) -> bool {
        matches!(self.placement, Placement::Root { .. })
    }

    pub fn input(&self, segment_id: &str, input_id: &str) -> Option<&InputBinding> {
        self.inputs
            .get(segment_id)?
            .iter()
            .find(|binding| binding.declaration.id == input_id)
    }

    pub(crate) fn input_mut(
        &mut self,
        segment_id: &str,
        input_id: &str,
    ) -> Option<&mut InputBinding> {
        self.inputs
            .get_mut(segment_id)?
            .iter_mut()
            .find(|binding| binding.declaration.id == input_id)
    }

    pub fn extra_height(&self, segment_id: &str) -> f64 {
        self.segments
            .get(segment_id)
            .map(|state| state.extra_height)
            .unwrap_or_default()
    }
}

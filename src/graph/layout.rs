//! # Layout
//!
//! The seam to the renderer. The graph asks a [`Layout`] for a block's height and the local
//! positions of its snap points whenever the block is created or its nested scopes change
//! height.

use super::{Point, SegmentState, SnapPointKind};
use crate::metadata::{BlockDefinition, SegmentKind};
use std::collections::BTreeMap;

/// One snap point the layout must place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapPointSlot {
    pub segment_index: usize,
    pub kind: SnapPointKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub height: f64,
    /// Local positions, one per requested slot, in the same order.
    pub positions: Vec<Point>,
}

pub trait Layout {
    fn layout(
        &self,
        definition: &BlockDefinition,
        segments: &BTreeMap<String, SegmentState>,
        slots: &[SnapPointSlot],
    ) -> LayoutResult;
}

const SCALE: f64 = 0.75;
pub const WALL_THICKNESS: f64 = 30.0 * SCALE;
pub const HEADER_HEIGHT: f64 = 80.0 * SCALE;
pub const DIVIDER_HEIGHT: f64 = 20.0 * SCALE;
pub const FOOTER_HEIGHT: f64 = 30.0 * SCALE;
pub const NOTCH_DEPTH: f64 = 15.0 * SCALE;
pub const NOTCH_WIDTH: f64 = 40.0 * SCALE;
pub const SLOT_HEIGHT: f64 = 120.0 * SCALE;

/// Stacked-segment geometry: segments stack top to bottom, and every segment except the last
/// of a multi-segment block is followed by a slot that grows with its nested scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentLayout;

impl SegmentLayout {
    fn segment_height(kind: SegmentKind, has_text: bool) -> f64 {
        match kind {
            SegmentKind::Header => HEADER_HEIGHT,
            SegmentKind::Divider if has_text => HEADER_HEIGHT,
            SegmentKind::Divider => DIVIDER_HEIGHT,
            SegmentKind::Footer if has_text => HEADER_HEIGHT,
            SegmentKind::Footer => FOOTER_HEIGHT,
        }
    }
}

impl Layout for SegmentLayout {
    fn layout(
        &self,
        definition: &BlockDefinition,
        segments: &BTreeMap<String, SegmentState>,
        slots: &[SnapPointSlot],
    ) -> LayoutResult {
        let count = definition.segments.len();
        let mut tops = Vec::with_capacity(count);
        let mut bottoms = Vec::with_capacity(count);
        let mut current = 0.0;

        for (index, segment) in definition.segments.iter().enumerate() {
            tops.push(current);
            current += Self::segment_height(segment.kind, segment.text.is_some());
            bottoms.push(current);

            if count != 1 && index != count - 1 {
                let extra = segments
                    .get(&segment.id)
                    .map(|state| state.extra_height)
                    .unwrap_or_default();
                current += SLOT_HEIGHT + extra;
            }
        }

        let positions = slots
            .iter()
            .map(|slot| {
                let top = tops.get(slot.segment_index).copied().unwrap_or_default();
                let bottom = bottoms.get(slot.segment_index).copied().unwrap_or_default();
                match slot.kind {
                    SnapPointKind::PrimaryDivot => {
                        Point::new(WALL_THICKNESS + NOTCH_WIDTH / 2.0, top + NOTCH_DEPTH)
                    }
                    SnapPointKind::SecondaryNotch => Point::new(
                        2.0 * WALL_THICKNESS + NOTCH_WIDTH / 2.0,
                        bottom + NOTCH_DEPTH,
                    ),
                    SnapPointKind::PrimaryNotch | SnapPointKind::Joint => {
                        Point::new(WALL_THICKNESS + NOTCH_WIDTH / 2.0, bottom + NOTCH_DEPTH)
                    }
                }
            })
            .collect();

        LayoutResult {
            height: current,
            positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::BlockMetadataProvider;

    #[test]
    fn single_segment_block_height() {
        let provider = BlockMetadataProvider::new();
        let definition = provider.get_block_definition("broadcast").unwrap();
        let result = SegmentLayout.layout(definition, &BTreeMap::new(), &[]);
        assert_eq!(result.height, HEADER_HEIGHT);
    }

    #[test]
    fn slot_grows_with_extra_height() {
        let provider = BlockMetadataProvider::new();
        let definition = provider.get_block_definition("if").unwrap();
        let slots = [SnapPointSlot {
            segment_index: 1,
            kind: SnapPointKind::PrimaryNotch,
        }];

        let empty = SegmentLayout.layout(definition, &BTreeMap::new(), &slots);
        assert_eq!(empty.height, HEADER_HEIGHT + SLOT_HEIGHT + FOOTER_HEIGHT);

        let mut states = BTreeMap::new();
        states.insert("if.if".to_string(), SegmentState { extra_height: 50.0 });
        let grown = SegmentLayout.layout(definition, &states, &slots);
        assert_eq!(grown.height, empty.height + 50.0);
        assert_eq!(grown.positions[0].y, empty.positions[0].y + 50.0);
    }
}

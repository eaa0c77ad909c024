//! # Connection Resolver
//!
//! Proximity search, connect/disconnect, and the chain-derived caches (`deepest_child`,
//! per-segment `extra_height`). Every traversal is bounded by `max_chain_hops`; exceeding the
//! bound means the chain is cyclic and raises [`GraphError::Structural`].

use super::{BlockId, Graph, Placement, Point, SnapPointId, SnapPointKind};
use crate::error::GraphError;

/// A notch/divot pair close enough to snap.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub notch: SnapPointId,
    pub divot: SnapPointId,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub notch: SnapPointId,
    pub divot: SnapPointId,
    /// Blocks whose height changed and must be redrawn.
    pub relayout: Vec<BlockId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    NotANotch,
    NotADivot,
    AlreadyLinked,
    SameBlock,
    WouldCycle,
    /// The joined chains would nest or run deeper than `max_chain_hops` blocks.
    TooDeep { depth: usize, limit: usize },
    OutOfRange { dx: f64, dy: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    Connected(Connection),
    /// Nothing changed.
    Rejected(RejectReason),
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectOutcome::Connected(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectOutcome {
    /// The divot's block became a new chain root.
    Detached {
        notch: SnapPointId,
        divot: SnapPointId,
        relayout: Vec<BlockId>,
    },
    /// Displacement was within the snap radius; the block was moved back by `correction`.
    Realigned { correction: Point },
    NotLinked,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Another block holds the drag token, or this block never started a drag.
    Ignored,
    Finished {
        disconnect: Option<DisconnectOutcome>,
        connect: Option<ConnectOutcome>,
    },
}

impl Graph {
    /// Link `notch` to `divot` if their kinds are compatible, both are free, and they lie within
    /// the snap radius on both axes.
    pub fn connect(
        &mut self,
        notch: &SnapPointId,
        divot: &SnapPointId,
    ) -> Result<ConnectOutcome, GraphError> {
        if let Some(reason) = self.link_rejection(notch, divot)? {
            tracing::debug!("[GRAPH] Rejected {} -> {}: {:?}", notch, divot, reason);
            return Ok(ConnectOutcome::Rejected(reason));
        }

        let notch_position = self.snap_point_position(notch)?;
        let divot_position = self.snap_point_position(divot)?;
        if !divot_position.within(notch_position, self.config.snap_radius) {
            let delta = divot_position - notch_position;
            return Ok(ConnectOutcome::Rejected(RejectReason::OutOfRange {
                dx: delta.x,
                dy: delta.y,
            }));
        }

        Ok(ConnectOutcome::Connected(self.attach(notch, divot)?))
    }

    /// Kind, occupancy and acyclicity checks shared by [`Graph::connect`] and document replay.
    pub(crate) fn link_rejection(
        &self,
        notch: &SnapPointId,
        divot: &SnapPointId,
    ) -> Result<Option<RejectReason>, GraphError> {
        let notch_point = self.snap_point(notch)?;
        let divot_point = self.snap_point(divot)?;

        if !notch_point.kind.is_notch() {
            return Ok(Some(RejectReason::NotANotch));
        }
        if !divot_point.kind.is_divot() {
            return Ok(Some(RejectReason::NotADivot));
        }
        if notch_point.next.is_some() || divot_point.previous.is_some() {
            return Ok(Some(RejectReason::AlreadyLinked));
        }
        if notch_point.block == divot_point.block {
            return Ok(Some(RejectReason::SameBlock));
        }
        if self.would_cycle(&notch_point.block, &divot_point.block)? {
            return Ok(Some(RejectReason::WouldCycle));
        }

        let depth = self.depth_above(&notch_point.block)? + self.depth_below(&divot_point.block)?;
        let limit = self.config.max_chain_hops;
        if depth > limit {
            return Ok(Some(RejectReason::TooDeep { depth, limit }));
        }
        Ok(None)
    }

    /// Set the link fields, hang the divot's block from the notch so the two coincide, then
    /// recompute chain caches on both sides.
    pub(crate) fn attach(
        &mut self,
        notch: &SnapPointId,
        divot: &SnapPointId,
    ) -> Result<Connection, GraphError> {
        let divot_local = self.snap_point(divot)?.position;
        let notch_block = self.snap_point(notch)?.block.clone();
        let divot_block = self.snap_point(divot)?.block.clone();

        self.snap_point_mut(notch)?.next = Some(divot.clone());
        self.snap_point_mut(divot)?.previous = Some(notch.clone());
        self.block_mut(&divot_block)?.placement = Placement::Attached {
            notch: notch.clone(),
            offset: -divot_local,
        };

        self.calculate_deepest_child(&notch_block)?;
        self.calculate_deepest_child(&divot_block)?;

        let mut relayout = self.adjust_height(&notch_block)?;
        for id in self.adjust_height(&divot_block)? {
            if !relayout.contains(&id) {
                relayout.push(id);
            }
        }

        tracing::debug!("[GRAPH] Connected {} -> {}", notch, divot);
        Ok(Connection {
            notch: notch.clone(),
            divot: divot.clone(),
            relayout,
        })
    }

    pub(crate) fn unlink(
        &mut self,
        notch: &SnapPointId,
        divot: &SnapPointId,
    ) -> Result<(), GraphError> {
        self.snap_point_mut(notch)?.next = None;
        self.snap_point_mut(divot)?.previous = None;
        Ok(())
    }

    /// Break the link above `divot` if its block was dragged out of snap range, otherwise pull
    /// the block back so the connection still lines up.
    pub fn disconnect(&mut self, divot: &SnapPointId) -> Result<DisconnectOutcome, GraphError> {
        let divot_point = self.snap_point(divot)?;
        let Some(notch) = divot_point.previous.clone() else {
            return Ok(DisconnectOutcome::NotLinked);
        };
        let divot_block = divot_point.block.clone();
        let notch_block = self.snap_point(&notch)?.block.clone();

        let divot_position = self.snap_point_position(divot)?;
        let notch_position = self.snap_point_position(&notch)?;
        let delta = divot_position - notch_position;

        if !divot_position.within(notch_position, self.config.snap_radius) {
            self.detach_to_root(&divot_block)?;
            self.unlink(&notch, divot)?;

            self.calculate_deepest_child(&notch_block)?;
            self.calculate_deepest_child(&divot_block)?;

            let mut relayout = self.adjust_height(&notch_block)?;
            for id in self.adjust_height(&divot_block)? {
                if !relayout.contains(&id) {
                    relayout.push(id);
                }
            }

            tracing::debug!("[GRAPH] Disconnected {} from {}", divot, notch);
            return Ok(DisconnectOutcome::Detached {
                notch,
                divot: divot.clone(),
                relayout,
            });
        }

        let position = self.global_position(&divot_block)? - delta;
        self.move_block(&divot_block, position)?;
        Ok(DisconnectOutcome::Realigned { correction: -delta })
    }

    /// Best pairing for a dragged block: its chain tail's notch against every free divot, and
    /// its own divot against every free notch. Closest wins, strictly inside the snap radius.
    pub fn find_nearest_connection(
        &self,
        active: &BlockId,
    ) -> Result<Option<Candidate>, GraphError> {
        let block = self.block(active)?;
        let tail = self.block(&block.deepest_child)?;
        let mut best: Option<Candidate> = None;

        let anchor = tail
            .primary_notch
            .clone()
            .or_else(|| block.primary_notch.clone());

        if let Some(anchor) = anchor {
            let anchor_point = self.snap_point(&anchor)?;
            if anchor_point.next.is_none() {
                let origin = self.snap_point_position(&anchor)?;
                for divot in &self.divots {
                    let candidate = self.snap_point(divot)?;
                    if candidate.block == *active || candidate.previous.is_some() {
                        continue;
                    }
                    if self.would_cycle(&anchor_point.block, &candidate.block)? {
                        continue;
                    }
                    let distance = origin.distance_to(self.snap_point_position(divot)?);
                    consider(&mut best, &anchor, divot, distance, self.config.snap_radius);
                }
            }
        }

        if let Some(own_divot) = &block.primary_divot {
            let origin = self.snap_point_position(own_divot)?;
            for notch in &self.notches {
                let candidate = self.snap_point(notch)?;
                if candidate.next.as_ref().is_some_and(|next| next != own_divot) {
                    continue;
                }
                if self.would_cycle(&candidate.block, active)? {
                    continue;
                }
                let distance = origin.distance_to(self.snap_point_position(notch)?);
                consider(&mut best, notch, own_divot, distance, self.config.snap_radius);
            }
        }

        Ok(best)
    }

    /// Recompute nested-scope heights for `id` and every enclosing block above it. Returns the
    /// blocks that were re-laid-out, innermost first.
    pub fn adjust_height(&mut self, id: &BlockId) -> Result<Vec<BlockId>, GraphError> {
        let mut relayout = Vec::new();
        let mut current = Some(id.clone());
        let mut hops = 0;

        while let Some(block_id) = current {
            hops += 1;
            if hops > self.config.max_chain_hops {
                return Err(GraphError::Structural(format!(
                    "height propagation from block {} exceeded {} hops",
                    id, self.config.max_chain_hops
                )));
            }

            let block = self.block(&block_id)?;
            if block.is_dynamic() {
                let mut scopes = Vec::new();
                for snap_id in &block.snap_points {
                    let snap = self.snap_point(snap_id)?;
                    if snap.kind == SnapPointKind::SecondaryNotch {
                        scopes.push((snap.segment_id.clone(), snap.next.clone()));
                    }
                }

                for (segment_id, next) in scopes {
                    let extra_height = match next {
                        Some(divot) => self.scope_height(&divot)?,
                        None => 0.0,
                    };
                    if let Some(state) = self.block_mut(&block_id)?.segments.get_mut(&segment_id) {
                        state.extra_height = extra_height;
                    }
                }

                self.relayout(&block_id)?;
                relayout.push(block_id.clone());
            }

            current = self.predecessor(&block_id)?;
        }

        Ok(relayout)
    }

    /// Cache the primary-chain tail on `id`, then on every block above it. Returns the tail of
    /// the chain starting at `id`.
    pub fn calculate_deepest_child(&mut self, id: &BlockId) -> Result<BlockId, GraphError> {
        let tail = self.chain_tail(id)?;
        self.block_mut(id)?.deepest_child = tail.clone();

        let mut current = self.predecessor(id)?;
        let mut hops = 0;
        while let Some(block_id) = current {
            hops += 1;
            if hops > self.config.max_chain_hops {
                return Err(GraphError::Structural(format!(
                    "deepest-child propagation from block {} exceeded {} hops",
                    id, self.config.max_chain_hops
                )));
            }
            let upper_tail = self.chain_tail(&block_id)?;
            self.block_mut(&block_id)?.deepest_child = upper_tail;
            current = self.predecessor(&block_id)?;
        }

        Ok(tail)
    }

    /// Block linked below `id` through its primary notch.
    pub fn primary_next(&self, id: &BlockId) -> Result<Option<BlockId>, GraphError> {
        let Some(notch) = &self.block(id)?.primary_notch else {
            return Ok(None);
        };
        match &self.snap_point(notch)?.next {
            Some(divot) => Ok(Some(self.snap_point(divot)?.block.clone())),
            None => Ok(None),
        }
    }

    /// Block whose notch `id` hangs from, whether as a sibling statement or a nested scope.
    pub fn predecessor(&self, id: &BlockId) -> Result<Option<BlockId>, GraphError> {
        let Some(divot) = &self.block(id)?.primary_divot else {
            return Ok(None);
        };
        match &self.snap_point(divot)?.previous {
            Some(notch) => Ok(Some(self.snap_point(notch)?.block.clone())),
            None => Ok(None),
        }
    }

    /// The primary chain starting at `id`, `id` included.
    pub fn primary_chain(&self, id: &BlockId) -> Result<Vec<BlockId>, GraphError> {
        let mut chain = vec![id.clone()];
        let mut current = id.clone();
        while let Some(next) = self.primary_next(&current)? {
            if chain.len() >= self.config.max_chain_hops {
                return Err(GraphError::Structural(format!(
                    "primary chain from block {} exceeded {} blocks (cycle?)",
                    id, self.config.max_chain_hops
                )));
            }
            chain.push(next.clone());
            current = next;
        }
        Ok(chain)
    }

    fn chain_tail(&self, id: &BlockId) -> Result<BlockId, GraphError> {
        let chain = self.primary_chain(id)?;
        Ok(chain.last().cloned().unwrap_or_else(|| id.clone()))
    }

    /// Sum of block heights along the chain that starts at `divot`'s block.
    fn scope_height(&self, divot: &SnapPointId) -> Result<f64, GraphError> {
        let first = self.snap_point(divot)?.block.clone();
        let mut total = 0.0;
        for block_id in self.primary_chain(&first)? {
            total += self.block(&block_id)?.height;
        }
        Ok(total)
    }

    /// Linking a notch of `notch_block` to the divot of `divot_block` closes a loop exactly when
    /// `divot_block` already sits above (or is) `notch_block`.
    fn would_cycle(
        &self,
        notch_block: &BlockId,
        divot_block: &BlockId,
    ) -> Result<bool, GraphError> {
        let mut current = Some(notch_block.clone());
        let mut hops = 0;
        while let Some(block_id) = current {
            if block_id == *divot_block {
                return Ok(true);
            }
            hops += 1;
            if hops > self.blocks.len() {
                return Err(GraphError::Structural(format!(
                    "ancestry of block {} does not reach a root",
                    notch_block
                )));
            }
            current = self.predecessor(&block_id)?;
        }
        Ok(false)
    }

    /// Blocks from the root of `id`'s tree down to `id`, both included.
    fn depth_above(&self, id: &BlockId) -> Result<usize, GraphError> {
        let mut depth = 1;
        let mut current = self.predecessor(id)?;
        while let Some(block_id) = current {
            depth += 1;
            if depth > self.blocks.len() {
                return Err(GraphError::Structural(format!(
                    "ancestry of block {} does not reach a root",
                    id
                )));
            }
            current = self.predecessor(&block_id)?;
        }
        Ok(depth)
    }

    /// Blocks on the longest downward path from `id`, through any notch, `id` included.
    fn depth_below(&self, id: &BlockId) -> Result<usize, GraphError> {
        let mut deepest = 0;
        let mut visited = 0;
        let mut stack = vec![(id.clone(), 1)];

        while let Some((block_id, depth)) = stack.pop() {
            visited += 1;
            if visited > self.blocks.len() {
                return Err(GraphError::Structural(format!(
                    "blocks below {} do not form a tree",
                    id
                )));
            }
            deepest = deepest.max(depth);

            for snap_id in &self.block(&block_id)?.snap_points {
                let snap = self.snap_point(snap_id)?;
                if !snap.kind.is_notch() {
                    continue;
                }
                if let Some(divot) = &snap.next {
                    stack.push((self.snap_point(divot)?.block.clone(), depth + 1));
                }
            }
        }
        Ok(deepest)
    }

    /// Move the block being dragged and remember the best snap candidate. Only the block that
    /// started the drag is processed until [`Graph::drag_end`].
    pub fn drag_move(
        &mut self,
        id: &BlockId,
        position: Point,
    ) -> Result<Option<Candidate>, GraphError> {
        if let Some(active) = &self.drag.active {
            if active != id {
                tracing::debug!("[GRAPH] Ignoring drag of {} while {} is active", id, active);
                return Ok(None);
            }
        }
        self.drag.active = Some(id.clone());

        self.move_block(id, position)?;
        let candidate = self.find_nearest_connection(id)?;
        self.drag.pending = candidate.clone();
        Ok(candidate)
    }

    /// Finish a drag: break the block's incoming link if it moved away, then snap to the
    /// candidate found during the drag.
    pub fn drag_end(&mut self, id: &BlockId) -> Result<DragOutcome, GraphError> {
        if self.drag.active.as_ref() != Some(id) {
            return Ok(DragOutcome::Ignored);
        }
        self.drag.active = None;
        let pending = self.drag.pending.take();

        let disconnect = match self.block(id)?.primary_divot.clone() {
            Some(divot) if self.snap_point(&divot)?.previous.is_some() => {
                Some(self.disconnect(&divot)?)
            }
            _ => None,
        };

        let connect = match pending {
            Some(candidate) => Some(self.connect(&candidate.notch, &candidate.divot)?),
            None => None,
        };

        Ok(DragOutcome::Finished { disconnect, connect })
    }

    /// Block currently holding the drag token.
    pub fn active_block(&self) -> Option<&BlockId> {
        self.drag.active.as_ref()
    }

    /// Endpoints of the pending snap, for drawing the connection indicator.
    pub fn drag_indicator(&self) -> Result<Option<(Point, Point)>, GraphError> {
        match &self.drag.pending {
            Some(candidate) => Ok(Some((
                self.snap_point_position(&candidate.notch)?,
                self.snap_point_position(&candidate.divot)?,
            ))),
            None => Ok(None),
        }
    }
}

fn consider(
    best: &mut Option<Candidate>,
    notch: &SnapPointId,
    divot: &SnapPointId,
    distance: f64,
    radius: f64,
) {
    if distance >= radius {
        return;
    }
    let better = match best {
        None => true,
        Some(current) => {
            distance < current.distance
                || (distance == current.distance
                    && (notch, divot) < (&current.notch, &current.divot))
        }
    };
    if better {
        *best = Some(Candidate {
            notch: notch.clone(),
            divot: divot.clone(),
            distance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::BlockMetadataProvider;

    fn graph() -> Graph {
        Graph::new(BlockMetadataProvider::new())
    }

    #[test]
    fn cycle_is_a_structural_error() {
        let mut graph = graph();
        let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
        let b = graph.insert_block("broadcast", Point::new(0.0, 500.0)).unwrap();
        let a_notch = graph.block(&a).unwrap().primary_notch.clone().unwrap();
        let a_divot = graph.block(&a).unwrap().primary_divot.clone().unwrap();
        let b_notch = graph.block(&b).unwrap().primary_notch.clone().unwrap();
        let b_divot = graph.block(&b).unwrap().primary_divot.clone().unwrap();

        // Forge a two-block loop behind the resolver's back.
        graph.snap_point_mut(&a_notch).unwrap().next = Some(b_divot.clone());
        graph.snap_point_mut(&b_divot).unwrap().previous = Some(a_notch);
        graph.snap_point_mut(&b_notch).unwrap().next = Some(a_divot.clone());
        graph.snap_point_mut(&a_divot).unwrap().previous = Some(b_notch);

        let err = graph.calculate_deepest_child(&a).unwrap_err();
        assert!(matches!(err, GraphError::Structural(_)));
        assert!(matches!(graph.adjust_height(&a), Err(GraphError::Structural(_))));
    }

    #[test]
    fn connect_refuses_to_close_a_loop() {
        let mut graph = graph();
        let a = graph.insert_block("broadcast", Point::new(0.0, 0.0)).unwrap();
        let b = graph.insert_block("broadcast", Point::new(0.0, 60.0)).unwrap();
        let a_notch = graph.block(&a).unwrap().primary_notch.clone().unwrap();
        let b_divot = graph.block(&b).unwrap().primary_divot.clone().unwrap();
        assert!(graph.connect(&a_notch, &b_divot).unwrap().is_connected());

        let b_notch = graph.block(&b).unwrap().primary_notch.clone().unwrap();
        let a_divot = graph.block(&a).unwrap().primary_divot.clone().unwrap();
        assert_eq!(
            graph.link_rejection(&b_notch, &a_divot).unwrap(),
            Some(RejectReason::WouldCycle)
        );
    }

    #[test]
    fn consider_prefers_closer_then_lower_ids() {
        let mut best = None;
        let n1 = SnapPointId::derive(&BlockId::from("a"), 0, SnapPointKind::PrimaryNotch);
        let n2 = SnapPointId::derive(&BlockId::from("b"), 0, SnapPointKind::PrimaryNotch);
        let d = SnapPointId::derive(&BlockId::from("c"), 0, SnapPointKind::PrimaryDivot);

        consider(&mut best, &n2, &d, 10.0, 40.0);
        consider(&mut best, &n1, &d, 10.0, 40.0);
        assert_eq!(best.as_ref().unwrap().notch, n1);

        consider(&mut best, &n2, &d, 5.0, 40.0);
        assert_eq!(best.as_ref().unwrap().notch, n2);

        consider(&mut best, &n1, &d, 40.0, 40.0);
        assert_eq!(best.as_ref().unwrap().distance, 5.0);
    }
}

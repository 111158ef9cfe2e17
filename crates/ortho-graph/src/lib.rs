//! The abstract graph value consumed by `ortho-layout`.
//!
//! This crate owns nothing about layout: no ranks, no grid, no routing. It is the
//! upstream contract described by the layout core's external interface — stable
//! id iteration over nodes and edges, plus the handful of attributes layout reads
//! off each element (`flow`, `rank`, `label`, `style`, `offset`).
//!
//! Baseline: a from-scratch port of the `graphlib`-shaped "plain value graph that
//! a layout engine consumes" contract, scoped down to what grid layout needs
//! (no compound/subgraph support — grouped nodes are out of scope).

mod graph;
mod ids;

pub use graph::{EdgeData, Graph, NodeData};
pub use ids::{EdgeId, NodeId};

/// Global axis orientation biasing placement and fixing the rank axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Flow {
    #[default]
    East,
    West,
    North,
    South,
}

/// Visual treatment of an edge's path. Purely descriptive — the layout core
/// threads it through to the renderer unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeStyle {
    #[default]
    Solid,
    Double,
    Dotted,
    Dashed,
    Wave,
}

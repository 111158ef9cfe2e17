/// Failure surfaced by [`crate::LayoutEngine::run`] (§7).
///
/// Strategy-level failures (a `NodePlacer` strategy returning `None`, an A\*
/// search exhausting its frontier) are recovered locally via backtracking and
/// never constructed as a `LayoutError` themselves; only exhaustion of the
/// engine's overall retry/deadline budget bubbles up here.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// `max_backtracks` or `deadline_ms` was exhausted before the action stack
    /// drained. The engine still returns a partial [`crate::LayoutResult`]
    /// alongside this error; callers may render it with a marker or re-run
    /// with a larger budget.
    #[error("layout incomplete after {backtracks_used} backtracks ({actions_remaining} actions left)")]
    LayoutIncomplete {
        backtracks_used: u32,
        actions_remaining: usize,
    },

    /// A write attempted onto a cell already owned by a node, or a committed
    /// edge path was not 4-connected. This is a bug in the pipeline, not a
    /// user error in the input graph.
    #[error("invariant violated at ({x}, {y}): {detail}")]
    InvariantViolated { x: i64, y: i64, detail: String },

    /// The input graph had no nodes. Not an error in the sense of aborting —
    /// callers get an empty layout with bounds `(0, 0, 0, 0)` — but worth a
    /// distinct variant since an empty `LayoutResult` is observably different
    /// from a real one.
    #[error("graph has no nodes")]
    EmptyGraph,
}

/// Internal result type for code paths that can raise [`LayoutError`].
pub type Result<T> = std::result::Result<T, LayoutError>;

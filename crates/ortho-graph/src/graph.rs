use crate::{EdgeId, EdgeStyle, Flow, NodeId};
use rustc_hash::FxHashSet;

/// A node's data as seen by the layout core.
///
/// `size` is the node's footprint in grid cells (`cx, cy`), derived upstream from
/// label width/height; `user_rank` is `Some` when the caller pinned the node to a
/// specific rank (§4.2: user ranks are positive, auto ranks negative).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeData {
    pub name: String,
    pub label: String,
    pub size: (u32, u32),
    pub user_rank: Option<i32>,
}

/// An edge's data as seen by the layout core.
///
/// `user_offset` is an optional caller-supplied parallel-offset hint; when absent
/// the `ActionStackBuilder` assigns offsets itself (§4.4).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeData {
    pub source: NodeId,
    pub target: NodeId,
    pub directed: bool,
    pub label: Option<String>,
    pub style: EdgeStyle,
    pub user_offset: Option<i32>,
}

/// The abstract graph value the layout core consumes.
///
/// Iteration order for both nodes and edges is always ascending id order, which
/// is assignment order: the first node added is id 0, and so on. There is no
/// subgraph/compound-node concept — grouped nodes are out of scope for this
/// layout core.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Graph {
    flow: Flow,
    nodes: Vec<NodeData>,
    edges: Vec<EdgeData>,
    out_adj: Vec<Vec<EdgeId>>,
    in_adj: Vec<Vec<EdgeId>>,
}

impl Graph {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            ..Default::default()
        }
    }

    pub fn flow(&self) -> Flow {
        self.flow
    }

    pub fn set_flow(&mut self, flow: Flow) {
        self.flow = flow;
    }

    /// Add a node with a default 1x1 footprint. Panics are reserved for
    /// malformed-edge construction (see `add_edge`); adding a node never fails.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node_with(name, String::new(), (1, 1))
    }

    pub fn add_node_with(
        &mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        size: (u32, u32),
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let (cx, cy) = size;
        self.nodes.push(NodeData {
            name: name.into(),
            label: label.into(),
            size: (cx.max(1), cy.max(1)),
            user_rank: None,
        });
        self.out_adj.push(Vec::new());
        self.in_adj.push(Vec::new());
        id
    }

    pub fn set_node_rank(&mut self, node: NodeId, rank: i32) {
        self.nodes[node.index()].user_rank = Some(rank);
    }

    /// Add a directed or undirected edge. `source`/`target` must be ids returned
    /// by `add_node` on this graph.
    ///
    /// # Panics
    ///
    /// Panics if `source` or `target` is out of range. The graph value is built
    /// by trusted upstream code (a parser), not by end users, so a dangling
    /// endpoint is a programmer error rather than a recoverable runtime error.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, directed: bool) -> EdgeId {
        self.add_edge_with(source, target, directed, None, EdgeStyle::default(), None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_edge_with(
        &mut self,
        source: NodeId,
        target: NodeId,
        directed: bool,
        label: Option<String>,
        style: EdgeStyle,
        user_offset: Option<i32>,
    ) -> EdgeId {
        assert!(source.index() < self.nodes.len(), "dangling edge source");
        assert!(target.index() < self.nodes.len(), "dangling edge target");

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(EdgeData {
            source,
            target,
            directed,
            label,
            style,
            user_offset,
        });

        self.out_adj[source.index()].push(id);
        self.in_adj[target.index()].push(id);
        if !directed && source != target {
            // An undirected edge is traversable from either endpoint.
            self.out_adj[target.index()].push(id);
            self.in_adj[source.index()].push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &EdgeData {
        &self.edges[id.index()]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut EdgeData {
        &mut self.edges[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes in ascending id (insertion) order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Edges in ascending id (insertion) order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len() as u32).map(EdgeId)
    }

    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.out_adj[node.index()]
    }

    pub fn in_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.in_adj[node.index()]
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.out_adj[node.index()].len()
    }

    pub fn in_degree(&self, node: NodeId) -> usize {
        self.in_adj[node.index()].len()
    }

    /// The node at the far end of `edge` from `from`'s perspective (works for
    /// both directed and undirected edges).
    pub fn other_end(&self, edge: EdgeId, from: NodeId) -> NodeId {
        let e = self.edge(edge);
        if e.source == from { e.target } else { e.source }
    }

    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.out_edges(node).iter().map(move |&e| self.other_end(e, node))
    }

    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.in_edges(node).iter().map(move |&e| self.other_end(e, node))
    }

    /// All distinct nodes without a predecessor (graph roots). Sorted by id for
    /// determinism.
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes().filter(|&n| self.in_degree(n) == 0).collect()
    }

    /// True if `node` appears on both ends of some edge.
    pub fn has_self_loop(&self, node: NodeId) -> bool {
        self.out_edges(node).iter().any(|&e| {
            let e = self.edge(e);
            e.source == node && e.target == node
        })
    }

    /// Distinct unordered neighbor set (used by spacing / gutter checks, never by
    /// layout decisions themselves, since those must stay id-ordered).
    pub fn neighbor_set(&self, node: NodeId) -> FxHashSet<NodeId> {
        self.successors(node).chain(self.predecessors(node)).collect()
    }
}

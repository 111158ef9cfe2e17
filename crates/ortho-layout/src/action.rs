//! ActionStackBuilder (§4.4): turns chains into an ordered action list.

use ortho_graph::{EdgeId, Graph, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::chain::Chain;
use crate::rank::Ranks;

/// A unit of layout work (§3 `Action`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PlaceNode {
        node: NodeId,
    },
    PlaceChained {
        node: NodeId,
        parent: NodeId,
        parent_edge: EdgeId,
    },
    TraceEdge {
        edge: EdgeId,
    },
    SelfLoop {
        edge: EdgeId,
    },
}

/// An action plus its backtracking bookkeeping (§9: a tagged record with a
/// mutable cursor, not strategy state re-derived from a bare counter).
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub action: Action,
    pub tries: u32,
    pub cursor: usize,
}

impl ActionEntry {
    fn new(action: Action) -> Self {
        Self {
            action,
            tries: 0,
            cursor: 0,
        }
    }
}

pub struct ActionStackBuilder;

impl ActionStackBuilder {
    /// Build the ordered action stack and the parallel-edge offset table
    /// (§4.4). `ranks` is used only to estimate the eventual Manhattan span of
    /// a cross-chain edge for ordering purposes — real positions don't exist
    /// yet, since `NodePlacer` hasn't run.
    #[tracing::instrument(skip(graph, chains, ranks))]
    pub fn build(
        graph: &Graph,
        chains: &[Chain],
        ranks: &Ranks,
    ) -> (Vec<ActionEntry>, FxHashMap<EdgeId, i32>) {
        let mut entries = Vec::new();
        let mut consumed: FxHashSet<EdgeId> = FxHashSet::default();

        for chain in chains {
            entries.push(ActionEntry::new(Action::PlaceNode { node: chain.head() }));
            for (parent, node, parent_edge) in chain.links(graph) {
                entries.push(ActionEntry::new(Action::PlaceChained {
                    node,
                    parent,
                    parent_edge,
                }));
                consumed.insert(parent_edge);
            }
        }

        let offsets = assign_parallel_offsets(graph);

        let mut self_loops = Vec::new();
        let mut cross_edges = Vec::new();
        for edge in graph.edges() {
            if consumed.contains(&edge) {
                continue;
            }
            let e = graph.edge(edge);
            if e.source == e.target {
                self_loops.push(edge);
            } else {
                cross_edges.push(edge);
            }
        }

        cross_edges.sort_by(|&a, &b| {
            let ea = graph.edge(a);
            let eb = graph.edge(b);
            let da = estimated_span(ranks, ea.source, ea.target);
            let db = estimated_span(ranks, eb.source, eb.target);
            da.cmp(&db)
                .then_with(|| ea.source.cmp(&eb.source))
                .then_with(|| ea.target.cmp(&eb.target))
        });
        for edge in cross_edges {
            entries.push(ActionEntry::new(Action::TraceEdge { edge }));
        }

        self_loops.sort();
        for edge in self_loops {
            entries.push(ActionEntry::new(Action::SelfLoop { edge }));
        }

        (entries, offsets)
    }
}

fn estimated_span(ranks: &Ranks, source: NodeId, target: NodeId) -> i64 {
    (ranks.get(target) as i64 - ranks.get(source) as i64).abs()
}

/// Group edges by endpoint pair — lexicographic (unordered) for undirected
/// edges, ordered for directed ones — and assign `0, +1, -1, +2, -2, ...` in
/// insertion (edge id) order within each group (§4.4, §9 open question: this
/// spec pins lexicographic grouping for undirected parallels).
fn assign_parallel_offsets(graph: &Graph) -> FxHashMap<EdgeId, i32> {
    let mut groups: FxHashMap<(NodeId, NodeId), Vec<EdgeId>> = FxHashMap::default();

    for edge in graph.edges() {
        let e = graph.edge(edge);
        let key = if e.directed {
            (e.source, e.target)
        } else if e.source <= e.target {
            (e.source, e.target)
        } else {
            (e.target, e.source)
        };
        groups.entry(key).or_default().push(edge);
    }

    let mut offsets = FxHashMap::default();
    let mut keys: Vec<_> = groups.keys().copied().collect();
    keys.sort();
    for key in keys {
        let ids = groups.get_mut(&key).unwrap();
        ids.sort();
        for (i, &edge) in ids.iter().enumerate() {
            let offset = if i == 0 {
                0
            } else if i % 2 == 1 {
                (i as i32 + 1) / 2
            } else {
                -(i as i32 / 2)
            };
            offsets.insert(edge, offset);
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainDetector;
    use crate::rank::RankAssigner;
    use ortho_graph::Flow;

    #[test]
    fn chain_edges_become_place_chained_not_trace_edge() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        g.add_edge(a, b, true);

        let ranks = RankAssigner::assign(&g);
        let chains = ChainDetector::detect(&g);
        let (entries, _) = ActionStackBuilder::build(&g, &chains, &ranks);

        assert!(matches!(entries[0].action, Action::PlaceNode { .. }));
        assert!(matches!(entries[1].action, Action::PlaceChained { .. }));
        assert!(entries.iter().all(|e| !matches!(e.action, Action::TraceEdge { .. })));
    }

    #[test]
    fn cross_chain_edge_becomes_trace_edge() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        let d = g.add_node("D");
        g.add_edge(a, b, true);
        g.add_edge(a, c, true);
        g.add_edge(b, d, true);
        g.add_edge(c, d, true);

        let ranks = RankAssigner::assign(&g);
        let chains = ChainDetector::detect(&g);
        let (entries, _) = ActionStackBuilder::build(&g, &chains, &ranks);

        let trace_count = entries
            .iter()
            .filter(|e| matches!(e.action, Action::TraceEdge { .. }))
            .count();
        assert!(trace_count >= 1);
    }

    #[test]
    fn self_loops_come_last() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        g.add_edge(a, b, true);
        g.add_edge(a, a, true);

        let ranks = RankAssigner::assign(&g);
        let chains = ChainDetector::detect(&g);
        let (entries, _) = ActionStackBuilder::build(&g, &chains, &ranks);

        assert!(matches!(entries.last().unwrap().action, Action::SelfLoop { .. }));
    }

    #[test]
    fn parallel_directed_edges_get_0_plus1_minus1() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let e0 = g.add_edge(a, b, true);
        let e1 = g.add_edge(a, b, true);
        let e2 = g.add_edge(a, b, true);

        let offsets = assign_parallel_offsets(&g);
        assert_eq!(offsets[&e0], 0);
        assert_eq!(offsets[&e1], 1);
        assert_eq!(offsets[&e2], -1);
    }

    #[test]
    fn undirected_parallels_group_lexicographically() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let e0 = g.add_edge(b, a, false);
        let e1 = g.add_edge(a, b, false);

        let offsets = assign_parallel_offsets(&g);
        assert_eq!(offsets[&e0], 0);
        assert_eq!(offsets[&e1], 1);
    }
}

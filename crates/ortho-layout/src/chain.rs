//! ChainDetector (§4.3): maximal linear spines of nodes with a single
//! directed successor, merged greedily in ascending node-id order.

use ortho_graph::{EdgeId, Graph, NodeId};
use rustc_hash::FxHashSet;

/// A maximal linear run of nodes. `nodes[i]` connects to `nodes[i+1]` by a
/// directed edge; isolated nodes are length-1 chains.
#[derive(Debug, Clone)]
pub struct Chain {
    pub nodes: Vec<NodeId>,
}

impl Chain {
    pub fn head(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `(parent, child, connecting edge)` triples for every non-head node.
    pub fn links<'a>(&'a self, graph: &'a Graph) -> impl Iterator<Item = (NodeId, NodeId, EdgeId)> + 'a {
        self.nodes.windows(2).map(move |w| {
            let (parent, child) = (w[0], w[1]);
            let edge = graph
                .out_edges(parent)
                .iter()
                .copied()
                .find(|&e| {
                    let e = graph.edge(e);
                    e.directed && e.source == parent && e.target == child
                })
                .expect("chain link must be backed by a directed edge");
            (parent, child, edge)
        })
    }
}

pub struct ChainDetector;

impl ChainDetector {
    /// Discover chains over the whole graph (§4.3). Returns chains sorted by
    /// descending length then ascending head id.
    #[tracing::instrument(skip(graph))]
    pub fn detect(graph: &Graph) -> Vec<Chain> {
        let mut chained: FxHashSet<NodeId> = FxHashSet::default();
        let mut chains = Vec::new();

        for node in graph.nodes() {
            if chained.contains(&node) {
                continue;
            }
            let mut path_set = FxHashSet::default();
            path_set.insert(node);
            let nodes = extend(graph, node, &chained, &mut path_set);
            for &n in &nodes {
                chained.insert(n);
            }
            chains.push(Chain { nodes });
        }

        chains.sort_by(|a, b| b.len().cmp(&a.len()).then(a.head().cmp(&b.head())));
        chains
    }
}

/// Directed successors of `node` (undirected edges and self-loops never
/// participate in chain building — the former have no "outgoing" side, the
/// latter are handled as `SELF_LOOP` actions).
fn out_candidates(graph: &Graph, node: NodeId) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = graph
        .out_edges(node)
        .iter()
        .filter_map(|&eid| {
            let e = graph.edge(eid);
            (e.directed && e.source == node && e.target != node).then_some(e.target)
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

fn directed_in_degree(graph: &Graph, node: NodeId) -> usize {
    graph
        .in_edges(node)
        .iter()
        .filter(|&&eid| {
            let e = graph.edge(eid);
            e.directed && e.target == node && e.source != node
        })
        .count()
}

fn extend(
    graph: &Graph,
    tail: NodeId,
    chained: &FxHashSet<NodeId>,
    path_set: &mut FxHashSet<NodeId>,
) -> Vec<NodeId> {
    let all_candidates = out_candidates(graph, tail);
    let available: Vec<NodeId> = all_candidates
        .iter()
        .copied()
        .filter(|m| !chained.contains(m) && !path_set.contains(m))
        .collect();

    if available.is_empty() {
        return vec![tail];
    }

    if all_candidates.len() == 1 && available.len() == 1 {
        let m = available[0];
        if directed_in_degree(graph, m) == 1 {
            path_set.insert(m);
            let mut rest = extend(graph, m, chained, path_set);
            let mut result = vec![tail];
            result.append(&mut rest);
            return result;
        }
        return vec![tail];
    }

    // Multiple live candidates: explore each, splice on the longest
    // (ties broken by lowest next-node id), leave the rest for their own
    // future chain starts.
    let mut best: Vec<NodeId> = Vec::new();
    for m in available {
        let mut path2 = path_set.clone();
        path2.insert(m);
        let sub = extend(graph, m, chained, &mut path2);
        let better = sub.len() > best.len() || (sub.len() == best.len() && (best.is_empty() || sub[0] < best[0]));
        if better {
            best = sub;
        }
    }
    let mut result = vec![tail];
    result.extend(best);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ortho_graph::Flow;

    #[test]
    fn linear_chain_is_one_chain() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.add_edge(a, b, true);
        g.add_edge(b, c, true);

        let chains = ChainDetector::detect(&g);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].nodes, vec![a, b, c]);
    }

    #[test]
    fn isolated_node_is_length_one_chain() {
        let mut g = Graph::new(Flow::East);
        g.add_node("A");
        let chains = ChainDetector::detect(&g);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 1);
    }

    #[test]
    fn branching_node_splits_into_multiple_chains() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.add_edge(a, b, true);
        g.add_edge(a, c, true);

        let chains = ChainDetector::detect(&g);
        // a splices onto the longer of its two single-node successors,
        // the other becomes its own length-1 chain.
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].len(), 2);
        assert_eq!(chains[1].len(), 1);
    }

    #[test]
    fn cycle_does_not_loop_forever() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        g.add_edge(a, b, true);
        g.add_edge(b, a, true);

        let chains = ChainDetector::detect(&g);
        let total: usize = chains.iter().map(Chain::len).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn chains_sorted_by_descending_length_then_head_id() {
        let mut g = Graph::new(Flow::East);
        let a = g.add_node("A");
        let b = g.add_node("B");
        let c = g.add_node("C");
        g.add_edge(a, b, true);
        g.add_edge(b, c, true);
        g.add_node("Z");

        let chains = ChainDetector::detect(&g);
        assert!(chains[0].len() >= chains.last().unwrap().len());
    }
}

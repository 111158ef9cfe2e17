//! RankAssigner (§4.2): a priority-queue topological walk, not network simplex.
//!
//! Every node ends up with an integer rank; user-fixed ranks win, auto ranks
//! grow in magnitude with distance from a root. The heap breaks ties by node
//! id rather than hash-iteration order so two runs over the same graph always
//! assign the same ranks (§9 determinism).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ortho_graph::{Graph, NodeId};
use rustc_hash::{FxHashMap, FxHashSet};

/// `rank(node) -> i32` for every node in the graph.
#[derive(Debug, Clone, Default)]
pub struct Ranks {
    by_node: FxHashMap<NodeId, i32>,
}

impl Ranks {
    pub fn get(&self, node: NodeId) -> i32 {
        self.by_node[&node]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, i32)> + '_ {
        self.by_node.iter().map(|(&n, &r)| (n, r))
    }
}

/// A heap entry ordered by `|rank|` ascending, ties broken by node id ascending
/// (both reversed, since `BinaryHeap` is a max-heap and we want the smallest
/// out first).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct HeapEntry {
    rank: i32,
    node: NodeId,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .rank
            .abs()
            .cmp(&self.rank.abs())
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct RankAssigner;

impl RankAssigner {
    /// Assign ranks to every node in `graph` (§4.2).
    #[tracing::instrument(skip(graph))]
    pub fn assign(graph: &Graph) -> Ranks {
        let mut assigned: FxHashMap<NodeId, i32> = FxHashMap::default();
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();

        for node in graph.nodes() {
            if let Some(r) = graph.node(node).user_rank {
                heap.push(HeapEntry { rank: r, node });
            } else if graph.in_degree(node) == 0 {
                heap.push(HeapEntry { rank: -1, node });
            }
        }

        while let Some(HeapEntry { rank, node }) = heap.pop() {
            if assigned.contains_key(&node) {
                continue;
            }
            assigned.insert(node, rank);

            for succ in ordered_successors(graph, node) {
                if graph.node(succ).user_rank.is_some() {
                    // User-fixed rank wins; record the edge implicitly by
                    // leaving the successor's own push (below) to seed it.
                    if !assigned.contains_key(&succ) {
                        heap.push(HeapEntry {
                            rank: graph.node(succ).user_rank.unwrap(),
                            node: succ,
                        });
                    }
                    continue;
                }
                if assigned.contains_key(&succ) {
                    continue;
                }
                let next_rank = if rank >= 0 { rank + 1 } else { rank - 1 };
                heap.push(HeapEntry {
                    rank: next_rank,
                    node: succ,
                });
            }
        }

        // Cycles / disconnected components leave some nodes unranked by the
        // wave above. Sweep the remaining nodes in ascending id order,
        // seeding each as a fresh root, until everything has a rank.
        let mut remaining: Vec<NodeId> = graph
            .nodes()
            .filter(|n| !assigned.contains_key(n))
            .collect();
        remaining.sort();

        while let Some(&node) = remaining.first() {
            if assigned.contains_key(&node) {
                remaining.remove(0);
                continue;
            }
            assigned.insert(node, -1);
            let mut wave = BinaryHeap::new();
            for succ in ordered_successors(graph, node) {
                if !assigned.contains_key(&succ) {
                    wave.push(HeapEntry { rank: -2, node: succ });
                }
            }
            while let Some(HeapEntry { rank, node: n }) = wave.pop() {
                if assigned.contains_key(&n) {
                    continue;
                }
                assigned.insert(n, rank);
                for succ in ordered_successors(graph, n) {
                    if !assigned.contains_key(&succ) {
                        let next = if rank >= 0 { rank + 1 } else { rank - 1 };
                        wave.push(HeapEntry { rank: next, node: succ });
                    }
                }
            }
            remaining.retain(|n| !assigned.contains_key(n));
        }

        Ranks { by_node: assigned }
    }
}

/// Successors in ascending id order (determinism: never hash-iteration order).
fn ordered_successors(graph: &Graph, node: NodeId) -> Vec<NodeId> {
    let mut seen = FxHashSet::default();
    let mut out: Vec<NodeId> = graph
        .successors(node)
        .filter(|n| seen.insert(*n))
        .collect();
    out.sort();
    out
}

use ortho_graph::{EdgeStyle, Flow, Graph};

#[test]
fn nodes_and_edges_iterate_in_insertion_order() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    let c = g.add_node("C");
    g.add_edge(a, b, true);
    g.add_edge(b, c, true);

    let ids: Vec<_> = g.nodes().collect();
    assert_eq!(ids, vec![a, b, c]);
    assert_eq!(g.edges().count(), 2);
}

#[test]
fn directed_edge_populates_one_direction() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    g.add_edge(a, b, true);

    assert_eq!(g.out_degree(a), 1);
    assert_eq!(g.in_degree(a), 0);
    assert_eq!(g.out_degree(b), 0);
    assert_eq!(g.in_degree(b), 1);
    assert_eq!(g.successors(a).collect::<Vec<_>>(), vec![b]);
}

#[test]
fn undirected_edge_populates_both_directions() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    g.add_edge(a, b, false);

    assert_eq!(g.out_degree(a), 1);
    assert_eq!(g.out_degree(b), 1);
    assert_eq!(g.in_degree(a), 1);
    assert_eq!(g.in_degree(b), 1);
    assert!(g.successors(a).any(|n| n == b));
    assert!(g.successors(b).any(|n| n == a));
}

#[test]
fn parallel_edges_all_recorded() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    g.add_edge(a, b, true);
    g.add_edge(a, b, true);
    g.add_edge(a, b, true);

    assert_eq!(g.out_degree(a), 3);
    assert_eq!(g.edge_count(), 3);
}

#[test]
fn self_loop_detected() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    g.add_edge(a, a, true);
    assert!(g.has_self_loop(a));
}

#[test]
fn roots_are_nodes_without_predecessors() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    let c = g.add_node("C");
    g.add_edge(a, b, true);
    g.add_edge(a, c, true);

    assert_eq!(g.roots(), vec![a]);
}

#[test]
fn node_and_edge_attributes_round_trip() {
    let mut g = Graph::new(Flow::South);
    let a = g.add_node_with("A", "Alpha", (2, 1));
    let b = g.add_node("B");
    g.set_node_rank(a, 3);
    let e = g.add_edge_with(a, b, true, Some("likes".into()), EdgeStyle::Dashed, Some(1));

    assert_eq!(g.node(a).label, "Alpha");
    assert_eq!(g.node(a).size, (2, 1));
    assert_eq!(g.node(a).user_rank, Some(3));
    assert_eq!(g.edge(e).style, EdgeStyle::Dashed);
    assert_eq!(g.edge(e).user_offset, Some(1));
}

#[test]
#[should_panic(expected = "dangling edge target")]
fn dangling_edge_endpoint_panics() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");

    let mut other = Graph::new(Flow::East);
    other.add_node("X");
    let foreign = other.add_node("Y");

    g.add_edge(a, foreign, true);
}

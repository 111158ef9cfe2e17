use ortho_graph::{Flow, Graph};
use ortho_layout::{LayoutConfig, LayoutEngine};
use ortho_render::render;

#[test]
fn diamond_renders_all_four_labels_on_separate_lines_or_columns() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    let c = g.add_node("C");
    let d = g.add_node("D");
    g.add_edge(a, b, true);
    g.add_edge(a, c, true);
    g.add_edge(b, d, true);
    g.add_edge(c, d, true);

    let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
    let text = render(&g, &result, false);
    for label in ["A", "B", "C", "D"] {
        assert!(text.contains(label), "missing label {label} in:\n{text}");
    }
}

#[test]
fn undirected_edge_never_gets_an_arrowhead() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    g.add_edge(a, b, false);

    let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
    let ascii = render(&g, &result, false);
    let boxart = render(&g, &result, true);
    for ch in ['^', '>', 'v', '<'] {
        assert!(!ascii.contains(ch), "unexpected arrowhead glyph {ch} on an undirected edge");
    }
    for ch in ['▲', '▶', '▼', '◀'] {
        assert!(!boxart.contains(ch), "unexpected arrowhead glyph {ch} on an undirected edge");
    }
}

#[test]
fn render_is_stable_across_identical_inputs() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    let b = g.add_node("B");
    let c = g.add_node("C");
    g.add_edge(a, b, true);
    g.add_edge(b, c, true);

    let r1 = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
    let r2 = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
    assert_eq!(render(&g, &r1, false), render(&g, &r2, false));
    assert_eq!(render(&g, &r1, true), render(&g, &r2, true));
}

#[test]
fn self_loop_renders_a_loop_shape_next_to_its_node() {
    let mut g = Graph::new(Flow::East);
    let a = g.add_node("A");
    g.add_edge(a, a, true);

    let result = LayoutEngine::run(&g, LayoutConfig::default()).unwrap();
    let text = render(&g, &result, false);
    assert!(text.contains('A'));
    assert!(text.contains('-') || text.contains('|'), "self-loop must leave routed cells visible");
}

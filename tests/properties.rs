//! Property-based invariants for layout, routing and gestures.
//!
//! Verifies:
//! 1. Top-level children alternate sides and descendants inherit
//! 2. Every node root sits in the zone matching its direction
//! 3. One connector per parent/child pair
//! 4. Panning past the threshold translates by exactly the pointer travel
//! 5. Connector paths start and end on their anchors
//! 6. Transform attributes parse back to the same translation

use futures::executor::block_on;
use mindmap_rs_canvas::layout::Zone;
use mindmap_rs_canvas::layout::routing::ConnectorPath;
use mindmap_rs_canvas::{
    Config, Direction, Engine, MindEngine, NodeRecord, PointerButton, PointerEvent,
    PressedButtons, Surface, SvgSurface, Translate,
};
use proptest::prelude::*;
use proptest::sample::Index;

// ── Strategy helpers ──────────────────────────────────────────────────

/// A random tree: entry `i` picks the parent of node `i + 1` among the
/// nodes before it.
fn arb_tree() -> impl Strategy<Value = NodeRecord> {
    prop::collection::vec(any::<Index>(), 0..24).prop_map(|parents| {
        let count = parents.len() + 1;
        let mut kids: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (offset, parent) in parents.iter().enumerate() {
            let child = offset + 1;
            kids[parent.index(child)].push(child);
        }
        build(0, &kids)
    })
}

fn build(index: usize, kids: &[Vec<usize>]) -> NodeRecord {
    NodeRecord::new(format!("n{index}"), "0", format!("label {index}"))
        .with_children(kids[index].iter().map(|&child| build(child, kids)).collect())
}

fn rendered(root: NodeRecord) -> MindEngine<SvgSurface> {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    let surface = SvgSurface::new(1000.0, 800.0).with_fast_text_metrics(true);
    let mut engine = MindEngine::new(surface, config, "p").expect("engine");
    block_on(engine.render_body(vec![root])).expect("render");
    engine
}

// ── Layout ────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn directions_alternate_then_inherit(tree in arb_tree()) {
        let engine = rendered(tree);
        let root = &engine.tree().roots()[0];
        for (position, child) in root.children.iter().enumerate() {
            let expected = Direction::for_top_level_child(position + 1);
            let mut seen = Vec::new();
            child.walk(&mut |node| seen.push(node.direction));
            prop_assert!(seen.iter().all(|direction| *direction == expected));
        }
    }

    #[test]
    fn node_roots_sit_in_their_direction_zone(tree in arb_tree()) {
        let engine = rendered(tree);
        let keys = engine.keys();
        let mut pairs = Vec::new();
        for root in engine.tree().roots() {
            root.walk(&mut |node| {
                for child in &node.children {
                    pairs.push((node.id.clone(), child.id.clone(), child.direction));
                }
            });
        }
        for (parent, child, direction) in pairs {
            let zone = Zone::for_direction(direction).expect("direction assigned");
            prop_assert_eq!(
                engine.surface().parent(&keys.node_root(&child)),
                Some(keys.zone(zone, &parent))
            );
        }
    }

    #[test]
    fn one_connector_per_edge(tree in arb_tree()) {
        let engine = rendered(tree);
        let lines = engine.surface().children(&engine.keys().line_group());
        prop_assert_eq!(lines.len(), engine.tree().len() - 1);
    }
}

// ── Gestures ──────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pan_translation_matches_travel(dx in -20i32..=20, dy in -20i32..=20) {
        let tree = NodeRecord::new("r", "0", "root")
            .with_children(vec![NodeRecord::new("a", "r", "a")]);
        let mut engine = rendered(tree);
        let (dx, dy) = (dx as f32, dy as f32);
        block_on(async {
            engine
                .handle_pointer(PointerEvent::down(PointerButton::Secondary, (100.0, 100.0), None))
                .await;
            engine
                .handle_pointer(PointerEvent::moved(
                    PressedButtons::only(PointerButton::Secondary),
                    (100.0 + dx, 100.0 + dy),
                ))
                .await;
        });
        let threshold = engine.config().layout.drag_threshold;
        let expected = if dx.abs() > threshold || dy.abs() > threshold {
            Translate::new(dx, dy)
        } else {
            Translate::default()
        };
        prop_assert_eq!(engine.surface().translate(&engine.keys().group_root()), Ok(expected));
        prop_assert_eq!(engine.surface().children(&engine.keys().line_group()).len(), 1);
    }
}

// ── Geometry ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn connector_paths_keep_their_anchors(
        x1 in -500.0f32..500.0,
        y1 in -500.0f32..500.0,
        x2 in -500.0f32..500.0,
        y2 in -500.0f32..500.0,
        level in 1usize..5,
    ) {
        let path = ConnectorPath::route((x1, y1), (x2, y2), level);
        prop_assert_eq!(path.endpoints(), ((x1, y1), (x2, y2)));
        let d = path.to_path_data();
        let starts_with_move = d.starts_with('M');
        prop_assert!(starts_with_move);
    }

    #[test]
    fn translate_attribute_parses_back(x in -1.0e4f32..1.0e4, y in -1.0e4f32..1.0e4) {
        let translate = Translate::new(x, y);
        let parsed: Translate = translate.to_string().parse().expect("parse");
        prop_assert_eq!(parsed, translate);
    }
}

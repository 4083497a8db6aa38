//! Property tests over arbitrary (often corrupt) family data.

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;

use pedigree_kernel::store::InMemoryFamilyStore;
use pedigree_kernel::{
    FamilyId, FamilyRecord, FamilyTreeBuilder, LayoutConfig, PersonId, PersonRecord, Sex, TreeView,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

type Families = Vec<(Vec<usize>, Vec<usize>)>;

/// People `0..n` and families over them; duplicates, self-parentage and
/// cycles are all allowed.
fn family_data() -> impl Strategy<Value = (usize, Families)> {
    (2usize..25).prop_flat_map(|n| {
        let family = (
            prop::collection::vec(0..n, 1..=2),
            prop::collection::vec(0..n, 0..4),
        );
        (Just(n), prop::collection::vec(family, 0..12))
    })
}

fn make_store(n: usize, families: &Families) -> Arc<InMemoryFamilyStore> {
    let pid = |i: usize| PersonId::new(i as i64 + 1);
    let mut store = InMemoryFamilyStore::new();
    for i in 0..n {
        store.add_person(PersonRecord::new(pid(i), Sex::Unknown));
    }
    for (k, (partners, children)) in families.iter().enumerate() {
        store.add_family(FamilyRecord::new(
            FamilyId::new(1000 + k as i64),
            partners.iter().map(|&p| pid(p)).collect(),
            children.iter().map(|&c| pid(c)).collect(),
        ));
    }
    Arc::new(store)
}

fn build(store: Arc<InMemoryFamilyStore>, up: i32, down: i32) -> TreeView {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime
        .block_on(FamilyTreeBuilder::with_defaults(store).build(PersonId::new(1), up, down))
        .unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn generations_stay_within_requested_depths(
        (n, families) in family_data(),
        up in 0i32..5,
        down in 0i32..5,
    ) {
        let view = build(make_store(n, &families), up, down);
        for node in &view.nodes {
            prop_assert!(node.node.generation >= -up, "generation {} below -{}", node.node.generation, up);
            prop_assert!(node.node.generation <= down, "generation {} above {}", node.node.generation, down);
        }
        prop_assert_eq!(view.node(PersonId::new(1)).map(|n| n.node.generation), Some(0));
    }

    #[test]
    fn zero_depth_yields_only_the_focus((n, families) in family_data()) {
        let view = build(make_store(n, &families), 0, 0);
        prop_assert_eq!(view.num_nodes(), 1);
        prop_assert!(view.edges.is_empty());
        prop_assert!(view.couples.is_empty());
    }

    #[test]
    fn identical_input_yields_identical_output((n, families) in family_data(), depth in 0i32..4) {
        let store = make_store(n, &families);
        let first = build(Arc::clone(&store), depth, depth);
        let second = build(store, depth, depth);
        prop_assert_eq!(&first.layout_fingerprint, &second.layout_fingerprint);
        prop_assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }

    #[test]
    fn cards_never_overlap_within_a_band((n, families) in family_data(), depth in 0i32..4) {
        let config = LayoutConfig::default();
        let view = build(make_store(n, &families), depth, depth);

        let min_x = view.nodes.iter().map(|n| n.x).fold(f64::MAX, f64::min);
        let min_y = view.nodes.iter().map(|n| n.y).fold(f64::MAX, f64::min);
        prop_assert!((min_x - config.margin).abs() < 1e-9);
        prop_assert!((min_y - config.margin).abs() < 1e-9);

        let generations: BTreeSet<i32> = view.nodes.iter().map(|n| n.node.generation).collect();
        for gen in generations {
            let mut xs: Vec<f64> = view.nodes.iter().filter(|n| n.node.generation == gen).map(|n| n.x).collect();
            xs.sort_by(f64::total_cmp);
            for pair in xs.windows(2) {
                prop_assert!(
                    pair[1] - pair[0] >= config.node_width + config.partner_gap - 1e-9,
                    "overlap in generation {}: {:?}", gen, xs
                );
            }
        }
    }

    #[test]
    fn edges_reference_nodes_and_junctions((n, families) in family_data(), depth in 0i32..4) {
        let view = build(make_store(n, &families), depth, depth);
        let junctions: BTreeSet<_> = view.junctions.iter().map(|j| j.id).collect();

        for edge in &view.edges {
            prop_assert!(view.node(edge.parent_id).is_some());
            prop_assert!(view.node(edge.child_id).is_some());
            if let Some(junction) = edge.routed_source {
                prop_assert!(junctions.contains(&junction));
            }
        }
    }
}

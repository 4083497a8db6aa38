//! Performance benchmarks for sibling merging and layout.
//!
//! Run with: `cargo bench --bench layout`
//!
//! Layout cost is dominated by the centering passes, which touch every
//! sibling group once per pass, so wide trees are the interesting case.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pedigree_kernel::{
    Edge, FamilyId, FamilyUnit, LayoutEngine, PersonId, PersonNode, SiblingGroups,
};

/// Focus couple with `width` children, each married with `width` children.
fn make_wide_tree(width: i64) -> (Vec<PersonNode>, Vec<Edge>, Vec<FamilyUnit>) {
    let mut nodes = vec![PersonNode::bare(PersonId::new(1), 0), PersonNode::bare(PersonId::new(2), 0)];
    let mut edges = Vec::new();
    let mut couples = vec![FamilyUnit::new(FamilyId::new(1), vec![PersonId::new(1), PersonId::new(2)])];

    for i in 0..width {
        let child = PersonId::new(100 + i);
        let spouse = PersonId::new(500 + i);
        nodes.push(PersonNode::bare(child, 1));
        nodes.push(PersonNode::bare(spouse, 1));
        for parent in [1, 2] {
            edges.push(Edge::biological(PersonId::new(parent), child, FamilyId::new(1)));
        }

        let family = FamilyId::new(10 + i);
        couples.push(FamilyUnit::new(family, vec![child, spouse]));
        for j in 0..width {
            let grandchild = PersonId::new(10_000 + i * width + j);
            nodes.push(PersonNode::bare(grandchild, 2));
            edges.push(Edge::biological(child, grandchild, family));
            edges.push(Edge::biological(spouse, grandchild, family));
        }
    }
    (nodes, edges, couples)
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let engine = LayoutEngine::default();

    for width in [4, 16, 48] {
        let (nodes, edges, couples) = make_wide_tree(width);
        let groups = SiblingGroups::build(&couples, &edges);
        group.throughput(Throughput::Elements(nodes.len() as u64));

        group.bench_with_input(BenchmarkId::new("wide", width), &width, |b, _| {
            b.iter(|| engine.layout(black_box(&nodes), black_box(&edges), black_box(&couples), &groups))
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for width in [4, 16, 48] {
        let (_, edges, couples) = make_wide_tree(width);
        group.throughput(Throughput::Elements(edges.len() as u64));

        group.bench_with_input(BenchmarkId::new("wide", width), &width, |b, _| {
            b.iter(|| SiblingGroups::build(black_box(&couples), black_box(&edges)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_layout, bench_merge);
criterion_main!(benches);

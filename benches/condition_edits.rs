//! Condition Edit Benchmark (Criterion)
//!
//! Measures the cost of applying edits to documents of increasing size.
//! Every edit clones the document, so cost grows with tree size.

use azure_policy_builder::{
    apply, Condition, ConditionPath, Edit, MoveDirection, PolicyDocument,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// A document whose root holds `width` groups of `width` leaves each.
fn sample_document(width: usize) -> PolicyDocument {
    let groups = (0..width)
        .map(|g| {
            Condition::any_of(
                (0..width)
                    .map(|i| Condition::equals(format!("tags['k{}-{}']", g, i), "v"))
                    .collect(),
            )
        })
        .collect();

    PolicyDocument::builder()
        .display_name("Benchmark policy")
        .condition(Condition::all_of(groups))
        .build()
        .expect("benchmark document is valid")
}

fn benchmark_tree_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_edits");

    for width in [4, 16, 64].iter() {
        let document = sample_document(*width);
        let leaf_group = ConditionPath::root().child(width / 2);
        let edits = [
            ("add_simple", Edit::AddSimple { path: leaf_group.clone() }),
            (
                "toggle_negation",
                Edit::ToggleNegation {
                    path: leaf_group.child(0),
                },
            ),
            (
                "move_child",
                Edit::MoveChild {
                    path: leaf_group.clone(),
                    index: 0,
                    direction: MoveDirection::Down,
                },
            ),
        ];

        group.throughput(Throughput::Elements(1));
        for (name, edit) in edits.iter() {
            group.bench_with_input(BenchmarkId::new(*name, width), &document, |b, document| {
                b.iter(|| std::hint::black_box(apply(document, edit).unwrap()));
            });
        }
    }

    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for width in [4, 16, 64].iter() {
        let document = sample_document(*width);
        group.bench_with_input(BenchmarkId::new("to_json", width), &document, |b, document| {
            b.iter(|| std::hint::black_box(document.to_json().unwrap()));
        });

        let text = document.to_json().expect("renders");
        group.bench_with_input(BenchmarkId::new("from_json", width), &text, |b, text| {
            b.iter(|| std::hint::black_box(PolicyDocument::from_json(text).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_tree_edits, benchmark_render);
criterion_main!(benches);

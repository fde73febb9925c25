//! Propagation benchmarks.
//!
//! Measures one pass after a single source edit, for a long chain and for a
//! wide fan-out where only one branch is affected.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use nodeflow_core::behavior::{Add, Constant, Fields};
use nodeflow_core::{Graph, NodeId};

fn wire(graph: &mut Graph, from: NodeId, to: NodeId, input: usize) {
    let out = graph.output_port(from, 0).unwrap();
    let inp = graph.input_port(to, input).unwrap();
    graph.connect(out, inp).unwrap();
}

fn chain(len: usize) -> (Graph, NodeId) {
    let mut graph = Graph::new();
    let source = graph.add_node(Box::new(Constant::with_value(1.0)));
    let mut prev = source;
    for _ in 0..len {
        let next = graph.add_node(Box::new(Add::new()));
        wire(&mut graph, prev, next, 0);
        prev = next;
    }
    graph.propagate();
    (graph, source)
}

fn branches(width: usize) -> (Graph, NodeId) {
    let mut graph = Graph::new();
    let mut first = None;
    for _ in 0..width {
        let source = graph.add_node(Box::new(Constant::with_value(1.0)));
        let sum = graph.add_node(Box::new(Add::new()));
        wire(&mut graph, source, sum, 0);
        first.get_or_insert(source);
    }
    graph.propagate();
    (graph, first.unwrap())
}

fn bench_propagate(c: &mut Criterion) {
    let mut fields = Fields::new();
    fields.insert("value".to_string(), serde_json::json!(2.0));

    let mut group = c.benchmark_group("propagate");
    for size in [16usize, 256, 1024] {
        let (mut graph, source) = chain(size);
        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            b.iter(|| {
                graph.set_external_data(source, &fields).unwrap();
                black_box(graph.propagate())
            })
        });

        let (mut graph, source) = branches(size);
        group.bench_with_input(BenchmarkId::new("one_branch_of", size), &size, |b, _| {
            b.iter(|| {
                graph.set_external_data(source, &fields).unwrap();
                black_box(graph.propagate())
            })
        });
    }
    group.finish();

    c.bench_function("propagate_clean", |b| {
        let (mut graph, _) = chain(256);
        b.iter(|| black_box(graph.propagate()))
    });
}

criterion_group!(benches, bench_propagate);
criterion_main!(benches);

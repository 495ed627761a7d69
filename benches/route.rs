use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ferry::record::{EdgeRecord, NodeRecord};
use ferry::route::graph::LiquidityGraph;
use ferry::route::path::{k_shortest_paths, Combine};
use ferry::route::router::{Router, RouterConfig};

/// Generate a random two-chain pool network with a guaranteed backbone so
/// the benched endpoints are always connected.
fn generate_records(assets_per_chain: usize, extra_pools: usize) -> (Vec<EdgeRecord>, Vec<NodeRecord>) {
    fastrand::seed(7);

    let mut nodes = Vec::new();
    for chain in ["Ethereum", "Polygon"] {
        for i in 0..assets_per_chain {
            nodes.push(NodeRecord {
                name: format!("{chain}:T{i}"),
                liquidity: 1e6 + fastrand::f64() * 1e6,
                label: None,
            });
        }
    }

    let pool = |u: &str, v: &str, bridge: bool| EdgeRecord {
        u: u.to_string(),
        v: v.to_string(),
        fee: fastrand::f64() * 5.0,
        liquidity: 1e6 + fastrand::f64() * 1e7,
        rate: 0.995 + fastrand::f64() * 0.01,
        bridge,
    };

    let mut edges = Vec::new();
    // Backbone: a chain-local line per chain plus one bridge.
    for chain in ["Ethereum", "Polygon"] {
        for i in 1..assets_per_chain {
            edges.push(pool(
                &format!("{chain}:T{}", i - 1),
                &format!("{chain}:T{i}"),
                false,
            ));
        }
    }
    edges.push(pool("Ethereum:T0", "Polygon:T0", true));

    // Random extra pools.
    for _ in 0..extra_pools {
        let a = fastrand::usize(..nodes.len());
        let mut b = fastrand::usize(..nodes.len());
        while b == a {
            b = fastrand::usize(..nodes.len());
        }
        let (u, v) = (nodes[a].name.clone(), nodes[b].name.clone());
        let bridge = u.split(':').next() != v.split(':').next();
        edges.push(pool(&u, &v, bridge));
    }

    (edges, nodes)
}

fn bench_paths(c: &mut Criterion) {
    let (edges, nodes) = generate_records(10, 40);
    let graph = LiquidityGraph::build(&edges, &nodes).unwrap();
    let source = "Ethereum:T5".into();
    let target = "Polygon:T5".into();

    let mut group = c.benchmark_group("k_shortest_paths");
    for k in [1, 5, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |b, &k| {
            b.iter(|| {
                k_shortest_paths(black_box(&graph), &source, &target, k, Combine::Sum).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_route(c: &mut Criterion) {
    let (edges, nodes) = generate_records(10, 40);
    let graph = LiquidityGraph::build(&edges, &nodes).unwrap();
    let router = Router::new(graph, RouterConfig::default());
    let source = "Ethereum:T5".into();
    let target = "Polygon:T5".into();

    c.bench_function("route", |b| {
        b.iter(|| router.route(black_box(&source), &target, 100.0));
    });
}

criterion_group!(benches, bench_paths, bench_route);
criterion_main!(benches);

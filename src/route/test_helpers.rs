use crate::record::{EdgeRecord, NodeRecord};
use crate::route::curve::LineParams;
use crate::route::graph::LiquidityGraph;
use crate::route::path::Path;

#[allow(dead_code)]
pub fn node(name: &str, liquidity: f64) -> NodeRecord {
    NodeRecord {
        name: name.to_string(),
        liquidity,
        label: None,
    }
}

#[allow(dead_code)]
pub fn edge(u: &str, v: &str, fee: f64, liquidity: f64, rate: f64) -> EdgeRecord {
    EdgeRecord {
        u: u.to_string(),
        v: v.to_string(),
        fee,
        liquidity,
        rate,
        bridge: false,
    }
}

#[allow(dead_code)]
#[allow(clippy::unwrap_used)]
pub fn graph(edges: &[EdgeRecord], nodes: &[NodeRecord]) -> LiquidityGraph {
    LiquidityGraph::build(edges, nodes).unwrap()
}

#[allow(dead_code)]
pub fn line(slope: f64, intercept: f64, min_price: f64) -> LineParams {
    LineParams {
        slope,
        intercept,
        min_price,
    }
}

/// Builds a path along the given asset ids, taking the first pool found
/// between each consecutive pair.
#[allow(dead_code)]
#[allow(clippy::unwrap_used)]
pub fn path_between(graph: &LiquidityGraph, ids: &[&str]) -> Path {
    let nodes: Vec<usize> = ids
        .iter()
        .map(|&id| graph.node(&id.into()).unwrap())
        .collect();
    let edges: Vec<usize> = nodes
        .windows(2)
        .map(|pair| {
            (0..graph.pool_count())
                .find(|&i| {
                    let pool = graph.pool(i);
                    (pool.u == pair[0] && pool.v == pair[1])
                        || (pool.u == pair[1] && pool.v == pair[0])
                })
                .unwrap()
        })
        .collect();
    let weight: f64 = edges.iter().map(|&e| graph.pool(e).weight).sum();
    Path {
        nodes,
        edges,
        weight,
    }
}

#[allow(dead_code)]
pub fn one_hop_path(graph: &LiquidityGraph, a: &str, b: &str) -> Path {
    path_between(graph, &[a, b])
}

#[allow(dead_code)]
pub fn two_hop_path(graph: &LiquidityGraph, a: &str, b: &str, c: &str) -> Path {
    path_between(graph, &[a, b, c])
}

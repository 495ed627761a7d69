//! Simple-path enumeration over the liquidity graph.
//!
//! [`ShortestPaths`] is a lazy Yen's-algorithm enumerator: it yields simple
//! paths in non-decreasing total weight, deviating from previously yielded
//! paths at every node and keeping candidate deviations in a priority
//! queue. Every instance re-derives its paths from scratch; nothing is
//! cached across queries.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::error::RouteError;
use super::graph::{AssetId, LiquidityGraph};

/// How per-edge weights combine into a path's total weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combine {
    /// Total weight is the sum of edge weights.
    #[default]
    Sum,
    /// Total weight is the product of edge weights. Ranking is guaranteed
    /// for weights of at least one; lighter edges are treated as
    /// impassable under this combiner.
    Product,
}

impl Combine {
    /// Additive search cost of one edge weight, or `None` when the edge is
    /// unusable under this combiner.
    fn cost(self, weight: f64) -> Option<f64> {
        match self {
            Self::Sum => (weight.is_finite() && weight >= 0.0).then_some(weight),
            Self::Product => (weight.is_finite() && weight >= 1.0).then(|| weight.ln()),
        }
    }
}

/// An ordered sequence of pools from a source asset to a target asset
/// visiting no asset twice.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Asset indices visited, source first, target last.
    pub nodes: Vec<usize>,
    /// Pool index taken for each hop; one fewer than `nodes`.
    pub edges: Vec<usize>,
    /// Combined total weight, fixed at enumeration time.
    pub weight: f64,
}

impl Path {
    /// Number of hops.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    /// The asset ids along this path, source first.
    #[must_use]
    pub fn route(&self, graph: &LiquidityGraph) -> Vec<AssetId> {
        self.nodes.iter().map(|&n| graph.asset(n).id.clone()).collect()
    }
}

/// A frontier entry for the internal Dijkstra search, ordered as a min-heap
/// by cost with the node index as tie-break.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Visit {
    /// Accumulated additive cost from the search source.
    cost: f64,
    /// Asset index.
    node: usize,
}

impl Eq for Visit {}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A deviation candidate held by the enumerator, ordered as a min-heap by
/// cost with discovery order as tie-break.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    /// Additive cost of the whole candidate path.
    cost: f64,
    /// Discovery sequence number.
    seq: usize,
    /// Asset indices of the candidate.
    nodes: Vec<usize>,
    /// Pool indices of the candidate.
    edges: Vec<usize>,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lowest-cost path between two assets avoiding banned nodes and edges.
/// Returns the node sequence, edge sequence, and additive cost.
fn shortest_path(
    graph: &LiquidityGraph,
    combine: Combine,
    source: usize,
    target: usize,
    banned_nodes: &HashSet<usize>,
    banned_edges: &HashSet<usize>,
) -> Option<(Vec<usize>, Vec<usize>, f64)> {
    let n = graph.asset_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    heap.push(Visit {
        cost: 0.0,
        node: source,
    });

    while let Some(Visit { cost, node }) = heap.pop() {
        if node == target {
            break;
        }
        if cost > dist[node] {
            continue;
        }
        for &pool_idx in graph.adjacent(node) {
            if banned_edges.contains(&pool_idx) {
                continue;
            }
            let pool = graph.pool(pool_idx);
            if !pool.is_passable() {
                continue;
            }
            let Some(step) = combine.cost(pool.weight) else {
                continue;
            };
            let next = pool.other_end(node);
            if next == node || banned_nodes.contains(&next) {
                continue;
            }
            let next_cost = cost + step;
            if next_cost < dist[next] {
                dist[next] = next_cost;
                prev[next] = Some((node, pool_idx));
                heap.push(Visit {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    if !dist[target].is_finite() {
        return None;
    }

    let mut nodes = vec![target];
    let mut edges = Vec::new();
    let mut cursor = target;
    while let Some((from, via)) = prev[cursor] {
        nodes.push(from);
        edges.push(via);
        cursor = from;
    }
    nodes.reverse();
    edges.reverse();
    Some((nodes, edges, dist[target]))
}

/// Lazy enumerator of simple paths in non-decreasing weight order.
///
/// Obtained from [`ShortestPaths::new`]; finite (exhausts once every simple
/// path has been yielded) and terminates on cyclic graphs because only
/// simple paths are ever generated.
pub struct ShortestPaths<'a> {
    /// Graph being searched.
    graph: &'a LiquidityGraph,
    /// Weight combiner in effect.
    combine: Combine,
    /// Source asset index.
    source: usize,
    /// Target asset index.
    target: usize,
    /// Paths yielded so far, in order.
    found: Vec<Path>,
    /// Pending deviation candidates.
    candidates: BinaryHeap<Candidate>,
    /// Edge sequences already queued or yielded. Keyed by pools, not
    /// assets, so parallel pools over the same pair stay distinct.
    seen: HashSet<Vec<usize>>,
    /// Discovery counter for candidate tie-breaks.
    seq: usize,
    /// Whether the initial shortest path has been produced.
    primed: bool,
}

impl<'a> ShortestPaths<'a> {
    /// Creates an enumerator between two assets.
    ///
    /// # Errors
    ///
    /// [`RouteError::NoPath`] when either id is unknown to the graph or the
    /// source equals the target (a simple path needs at least one hop).
    pub fn new(
        graph: &'a LiquidityGraph,
        source: &AssetId,
        target: &AssetId,
        combine: Combine,
    ) -> Result<Self, RouteError> {
        let no_path = || RouteError::NoPath {
            src: source.clone(),
            target: target.clone(),
        };
        let source_idx = graph.node(source).ok_or_else(no_path)?;
        let target_idx = graph.node(target).ok_or_else(no_path)?;
        if source_idx == target_idx {
            return Err(no_path());
        }
        Ok(Self {
            graph,
            combine,
            source: source_idx,
            target: target_idx,
            found: Vec::new(),
            candidates: BinaryHeap::new(),
            seen: HashSet::new(),
            seq: 0,
            primed: false,
        })
    }

    /// Materializes a path, computing its combined weight from the raw edge
    /// weights.
    fn to_path(&self, nodes: Vec<usize>, edges: Vec<usize>) -> Path {
        let weights = edges.iter().map(|&e| self.graph.pool(e).weight);
        let weight = match self.combine {
            Combine::Sum => weights.sum(),
            Combine::Product => weights.product(),
        };
        Path {
            nodes,
            edges,
            weight,
        }
    }

    /// Queues every deviation of `prev` not yet seen.
    fn push_deviations(&mut self, prev: &Path) {
        for j in 0..prev.nodes.len() - 1 {
            let spur = prev.nodes[j];
            let root_nodes = &prev.nodes[..=j];
            let root_edges = &prev.edges[..j];

            // Edges already taken out of this root by earlier paths are
            // banned so the spur search finds a genuinely new deviation.
            // Roots compare by edge prefix: parallel pools over the same
            // assets are different roots.
            let mut banned_edges = HashSet::new();
            for path in &self.found {
                if path.edges.len() > j && path.edges[..j] == *root_edges {
                    banned_edges.insert(path.edges[j]);
                }
            }
            let banned_nodes: HashSet<usize> = root_nodes[..j].iter().copied().collect();

            let Some((spur_nodes, spur_edges, spur_cost)) = shortest_path(
                self.graph,
                self.combine,
                spur,
                self.target,
                &banned_nodes,
                &banned_edges,
            ) else {
                continue;
            };

            let mut nodes = root_nodes.to_vec();
            nodes.extend_from_slice(&spur_nodes[1..]);
            let mut edges = root_edges.to_vec();
            edges.extend_from_slice(&spur_edges);

            if self.seen.insert(edges.clone()) {
                let root_cost: f64 = root_edges
                    .iter()
                    .map(|&e| {
                        self.combine
                            .cost(self.graph.pool(e).weight)
                            .unwrap_or(f64::INFINITY)
                    })
                    .sum();
                self.candidates.push(Candidate {
                    cost: root_cost + spur_cost,
                    seq: self.seq,
                    nodes,
                    edges,
                });
                self.seq += 1;
            }
        }
    }
}

impl Iterator for ShortestPaths<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        if !self.primed {
            self.primed = true;
            let (nodes, edges, _) = shortest_path(
                self.graph,
                self.combine,
                self.source,
                self.target,
                &HashSet::new(),
                &HashSet::new(),
            )?;
            self.seen.insert(edges.clone());
            let path = self.to_path(nodes, edges);
            self.found.push(path.clone());
            return Some(path);
        }

        let prev = self.found.last()?.clone();
        self.push_deviations(&prev);

        let next = self.candidates.pop()?;
        let path = self.to_path(next.nodes, next.edges);
        self.found.push(path.clone());
        Some(path)
    }
}

/// Up to `k` least-weight simple paths from `source` to `target`, ordered
/// by non-decreasing total weight. Returns every simple path when fewer
/// than `k` exist.
///
/// # Errors
///
/// [`RouteError::NoPath`] when the assets are not connected in the
/// passable graph.
pub fn k_shortest_paths(
    graph: &LiquidityGraph,
    source: &AssetId,
    target: &AssetId,
    k: usize,
    combine: Combine,
) -> Result<Vec<Path>, RouteError> {
    let paths: Vec<Path> = ShortestPaths::new(graph, source, target, combine)?
        .take(k)
        .collect();
    if paths.is_empty() {
        return Err(RouteError::NoPath {
            src: source.clone(),
            target: target.clone(),
        });
    }
    Ok(paths)
}

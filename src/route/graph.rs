//! Assets, pools, and the liquidity graph they form.
//!
//! The graph is an explicit adjacency structure: an asset table, a pool
//! table, and per-asset lists of incident pool indices. It is rebuilt from
//! the persisted record set for every routing query and never mutated while
//! a query runs, apart from `assign_weight`.

use std::collections::HashMap;

use derive_more::Display;

use super::error::RouteError;
use crate::record::{EdgeRecord, NodeRecord};

/// A chain-qualified asset identifier, e.g. `"Ethereum:ETH"`.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{_0}")]
pub struct AssetId(String);

impl AssetId {
    /// Creates an asset id from a chain-qualified name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The chain prefix of this id (the part before `:`), or the whole id
    /// when it carries no chain qualifier.
    #[must_use]
    pub fn chain(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An asset node with its reserve liquidity snapshot.
#[derive(Debug, Clone)]
pub struct Asset {
    /// Chain-qualified identifier.
    pub id: AssetId,
    /// Reserve liquidity at this asset, non-negative.
    pub liquidity: f64,
    /// Optional display label carried from the records.
    pub label: Option<String>,
}

/// A liquidity pool connecting two assets.
///
/// Pricing reserves are derived from the pool's own `liquidity` and implied
/// `rate`: half of the pooled liquidity sits on the `v` side and the
/// rate-divided half on the `u` side. Endpoint snapshots (`u_liquidity`,
/// `v_liquidity`) are copied from the asset nodes at build time.
#[derive(Debug, Clone)]
pub struct Pool {
    /// Index of the `u` endpoint in the asset table.
    pub u: usize,
    /// Index of the `v` endpoint in the asset table.
    pub v: usize,
    /// Pool fee, non-negative.
    pub fee: f64,
    /// Pooled liquidity of this venue.
    pub liquidity: f64,
    /// Implied exchange rate from `u` to `v`.
    pub rate: f64,
    /// Whether this pool connects assets on different chains.
    pub bridge: bool,
    /// Reserve liquidity of the `u` asset node when the graph was built.
    pub u_liquidity: f64,
    /// Reserve liquidity of the `v` asset node when the graph was built.
    pub v_liquidity: f64,
    /// Ranking weight; set by [`LiquidityGraph::assign_weight`] and used
    /// only for path ordering, never for exchange math.
    pub weight: f64,
}

impl Pool {
    /// The endpoint opposite to `node`.
    #[must_use]
    pub fn other_end(&self, node: usize) -> usize {
        if node == self.u {
            self.v
        } else {
            self.u
        }
    }

    /// Pricing reserves `(reserve_in, reserve_out)` for a trade entering at
    /// `from`. Entering at `u` feeds the rate-divided half and receives the
    /// plain half; entering at `v` swaps the two.
    #[must_use]
    pub fn reserves_from(&self, from: usize) -> (f64, f64) {
        let half = 0.5 * self.liquidity;
        if from == self.u {
            (half / self.rate, half)
        } else {
            (half, half / self.rate)
        }
    }

    /// Whether this pool can carry a trade at all. Pools with empty or
    /// non-finite reserves are excluded from path search.
    #[must_use]
    pub fn is_passable(&self) -> bool {
        self.liquidity > 0.0 && self.rate > 0.0 && self.liquidity.is_finite() && self.rate.is_finite()
    }
}

/// Default ranking weight: fee plus inverse liquidity, so cheap and deep
/// pools sort first. Empty pools weigh infinity.
#[must_use]
pub fn default_weight(fee: f64, liquidity: f64) -> f64 {
    if liquidity > 0.0 {
        fee + 1.0 / liquidity
    } else {
        f64::INFINITY
    }
}

/// An undirected multigraph of assets and liquidity pools.
#[derive(Debug, Clone)]
pub struct LiquidityGraph {
    /// Asset table.
    assets: Vec<Asset>,
    /// Id-to-index lookup for the asset table.
    index: HashMap<AssetId, usize>,
    /// Pool table.
    pools: Vec<Pool>,
    /// Incident pool indices per asset.
    adjacency: Vec<Vec<usize>>,
}

impl LiquidityGraph {
    /// Builds a graph from flat edge and node records.
    ///
    /// Each pool is annotated with the reserve liquidity of both endpoints
    /// as of construction, and receives the [`default_weight`] ranking
    /// weight. Pools whose record omits the bridge flag are still marked as
    /// bridges when their endpoints live on different chains.
    ///
    /// # Errors
    ///
    /// [`RouteError::MalformedRecord`] if an edge references an asset id
    /// absent from the node records. Surfaced before any computation.
    pub fn build(edges: &[EdgeRecord], nodes: &[NodeRecord]) -> Result<Self, RouteError> {
        let mut assets = Vec::with_capacity(nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let id = AssetId::new(node.name.clone());
            // A repeated node record overwrites the earlier snapshot.
            if let Some(&existing) = index.get(&id) {
                let slot: &mut Asset = &mut assets[existing];
                slot.liquidity = node.liquidity;
                slot.label.clone_from(&node.label);
            } else {
                index.insert(id.clone(), assets.len());
                assets.push(Asset {
                    id,
                    liquidity: node.liquidity,
                    label: node.label.clone(),
                });
            }
        }

        let mut pools = Vec::with_capacity(edges.len());
        let mut adjacency = vec![Vec::new(); assets.len()];

        for edge in edges {
            let u_id = AssetId::new(edge.u.clone());
            let v_id = AssetId::new(edge.v.clone());
            let u = *index
                .get(&u_id)
                .ok_or_else(|| RouteError::MalformedRecord(u_id.clone()))?;
            let v = *index
                .get(&v_id)
                .ok_or_else(|| RouteError::MalformedRecord(v_id.clone()))?;

            let pool_idx = pools.len();
            pools.push(Pool {
                u,
                v,
                fee: edge.fee,
                liquidity: edge.liquidity,
                rate: edge.rate,
                bridge: edge.bridge || u_id.chain() != v_id.chain(),
                u_liquidity: assets[u].liquidity,
                v_liquidity: assets[v].liquidity,
                weight: default_weight(edge.fee, edge.liquidity),
            });

            adjacency[u].push(pool_idx);
            if u != v {
                adjacency[v].push(pool_idx);
            }
        }

        Ok(Self {
            assets,
            index,
            pools,
            adjacency,
        })
    }

    /// Recomputes every pool's ranking weight from `(fee, liquidity)`.
    ///
    /// Idempotent and free of side effects beyond the weight attribute.
    pub fn assign_weight<F>(&mut self, weight_fn: F)
    where
        F: Fn(f64, f64) -> f64,
    {
        for pool in &mut self.pools {
            pool.weight = weight_fn(pool.fee, pool.liquidity);
        }
    }

    /// Resolves an asset id to its table index.
    #[must_use]
    pub fn node(&self, id: &AssetId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// The asset at `idx`.
    #[must_use]
    pub fn asset(&self, idx: usize) -> &Asset {
        &self.assets[idx]
    }

    /// The pool at `idx`.
    #[must_use]
    pub fn pool(&self, idx: usize) -> &Pool {
        &self.pools[idx]
    }

    /// All pools.
    #[must_use]
    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Number of assets.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Number of pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Pool indices incident to `node`.
    #[must_use]
    pub fn adjacent(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::route::test_helpers::*;

    #[test]
    fn test_build_annotates_endpoint_liquidity() {
        let graph = graph(
            &[edge("Ethereum:ETH", "Ethereum:USDC", 1.0, 1_000.0, 2.0)],
            &[node("Ethereum:ETH", 500.0), node("Ethereum:USDC", 800.0)],
        );

        assert_eq!(graph.asset_count(), 2);
        assert_eq!(graph.pool_count(), 1);

        let pool = graph.pool(0);
        assert_eq!(pool.u_liquidity, 500.0);
        assert_eq!(pool.v_liquidity, 800.0);
        assert!(!pool.bridge);
    }

    #[test]
    fn test_build_rejects_unknown_asset() {
        let err = LiquidityGraph::build(
            &[edge("Ethereum:ETH", "Ethereum:DAI", 1.0, 1_000.0, 2.0)],
            &[node("Ethereum:ETH", 500.0)],
        )
        .err()
        .unwrap();

        assert_eq!(err, RouteError::MalformedRecord(AssetId::from("Ethereum:DAI")));
        assert_eq!(err.to_string(), "edge references unknown asset Ethereum:DAI");
    }

    #[test]
    fn test_cross_chain_edge_is_bridge() {
        let graph = graph(
            &[edge("Ethereum:ETH", "Polygon:ETH", 1.0, 1_000.0, 1.0)],
            &[node("Ethereum:ETH", 500.0), node("Polygon:ETH", 500.0)],
        );
        assert!(graph.pool(0).bridge);
    }

    #[test]
    fn test_assign_weight_is_idempotent() {
        let mut graph = graph(
            &[
                edge("A:X", "A:Y", 2.0, 100.0, 1.0),
                edge("A:Y", "A:Z", 4.0, 200.0, 1.0),
            ],
            &[node("A:X", 10.0), node("A:Y", 10.0), node("A:Z", 10.0)],
        );

        graph.assign_weight(|fee, _| fee * 10.0);
        assert_eq!(graph.pool(0).weight, 20.0);
        assert_eq!(graph.pool(1).weight, 40.0);

        graph.assign_weight(|fee, _| fee * 10.0);
        assert_eq!(graph.pool(0).weight, 20.0);
        assert_eq!(graph.pool(1).weight, 40.0);
    }

    #[test]
    fn test_oriented_reserves() {
        let graph = graph(
            &[edge("A:X", "A:Y", 0.0, 200.0, 2.0)],
            &[node("A:X", 10.0), node("A:Y", 10.0)],
        );
        let pool = graph.pool(0);

        // Entering at u: the rate-divided half feeds in.
        assert_eq!(pool.reserves_from(pool.u), (50.0, 100.0));
        // Entering at v: the sides swap.
        assert_eq!(pool.reserves_from(pool.v), (100.0, 50.0));
    }

    #[test]
    fn test_empty_pool_is_impassable() {
        let graph = graph(
            &[edge("A:X", "A:Y", 0.0, 0.0, 2.0)],
            &[node("A:X", 10.0), node("A:Y", 10.0)],
        );
        assert!(!graph.pool(0).is_passable());
        assert_eq!(graph.pool(0).weight, f64::INFINITY);
    }
}

//! Query facade: one call from (source, target, amount) to a settled
//! allocation.
//!
//! A router owns the graph it routes over; both exist for a single query
//! and share nothing with concurrent queries. The pipeline is graph →
//! candidate paths → per-path curves → joint allocation → settlement.

use log::warn;

use super::allocate::{allocate, CurveSet};
use super::curve::{combine_lines, fit_path_sqrt, path_lines, LineParams, SqrtParams};
use super::error::RouteError;
use super::graph::{AssetId, LiquidityGraph};
use super::path::{k_shortest_paths, Combine};
use super::report::{clean_allocations, settle, AllocationResult};

/// Policy applied when the square-root fit fails for a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitFallback {
    /// Price every path with the first-order linear model instead.
    #[default]
    LinearApprox,
    /// Drop the failing path and keep the concave program for the rest.
    ExcludePath,
}

/// Tunables for one routing query.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Candidate paths to enumerate.
    pub paths: usize,
    /// Slippage tolerance applied to the marginal-price floor.
    pub slippage: f64,
    /// Weight combiner for path ranking.
    pub combine: Combine,
    /// Curve-fit failure policy.
    pub fallback: FitFallback,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            paths: 5,
            slippage: 0.95,
            combine: Combine::Sum,
            fallback: FitFallback::LinearApprox,
        }
    }
}

/// One-query routing facade over a liquidity graph.
pub struct Router {
    /// Graph snapshot this router routes over.
    graph: LiquidityGraph,
    /// Query tunables.
    config: RouterConfig,
}

impl Router {
    /// Creates a router over a freshly built graph snapshot.
    #[must_use]
    pub fn new(graph: LiquidityGraph, config: RouterConfig) -> Self {
        Self { graph, config }
    }

    /// The underlying graph snapshot.
    #[must_use]
    pub fn graph(&self) -> &LiquidityGraph {
        &self.graph
    }

    /// Routes `amount` of `source` into `target` across up to the
    /// configured number of candidate paths and settles the optimal split.
    ///
    /// # Errors
    ///
    /// * [`RouteError::NoPath`] when the assets are not connected
    /// * [`RouteError::InfeasibleAllocation`] when no split meets every
    ///   price floor; never an empty result
    /// * [`RouteError::CurveFit`] is handled per the configured fallback
    ///   policy and only surfaces through the result notes
    pub fn route(
        &self,
        source: &AssetId,
        target: &AssetId,
        amount: f64,
    ) -> Result<AllocationResult, RouteError> {
        let paths = k_shortest_paths(
            &self.graph,
            source,
            target,
            self.config.paths,
            self.config.combine,
        )?;
        let mut notes = Vec::new();

        // Hop lines carry each path's price floor and, on demand, its
        // linear fallback model.
        let hop_lines: Vec<Vec<LineParams>> = paths
            .iter()
            .map(|path| path_lines(&self.graph, path, amount, self.config.slippage))
            .collect();
        let floors: Vec<f64> = hop_lines
            .iter()
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| line.min_price)
                    .fold(f64::NEG_INFINITY, f64::max)
            })
            .collect();

        let mut fits: Vec<Option<SqrtParams>> = Vec::with_capacity(paths.len());
        let mut any_failed = false;
        for (i, path) in paths.iter().enumerate() {
            match fit_path_sqrt(&self.graph, path, amount) {
                Ok(params) => fits.push(Some(params)),
                Err(err) => {
                    warn!("path {i}: {err}");
                    notes.push(format!("path {i}: {err}"));
                    fits.push(None);
                    any_failed = true;
                }
            }
        }

        // Survivors index into `paths` so allocations map back onto the
        // full candidate list.
        let mut survivors = Vec::with_capacity(paths.len());
        let set = if any_failed && self.config.fallback == FitFallback::LinearApprox {
            notes.push("pricing all paths with the linear model".to_string());
            let mut lines = Vec::new();
            for (i, hops) in hop_lines.iter().enumerate() {
                match combine_lines(hops) {
                    Ok(line) => {
                        survivors.push(i);
                        lines.push(line);
                    }
                    Err(err) => {
                        warn!("path {i} excluded: {err}");
                        notes.push(format!("path {i} excluded: {err}"));
                    }
                }
            }
            CurveSet::Linear(lines)
        } else {
            let mut curves = Vec::new();
            for (i, fit) in fits.iter().enumerate() {
                if let Some(params) = fit {
                    survivors.push(i);
                    curves.push((*params, floors[i]));
                } else {
                    notes.push(format!("path {i} excluded from allocation"));
                }
            }
            CurveSet::Sqrt(curves)
        };

        let allocated = allocate(&set, amount)?;
        let mut amounts = vec![0.0; paths.len()];
        for (slot, &path_idx) in survivors.iter().enumerate() {
            amounts[path_idx] = allocated[slot];
        }

        let cleaned = clean_allocations(&amounts);
        Ok(settle(&self.graph, &paths, &cleaned, notes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::route::test_helpers::*;

    /// Two equal two-hop arms between the endpoints, deep enough that the
    /// default slippage floor stays satisfiable.
    fn two_arm_graph() -> LiquidityGraph {
        let nodes = [
            node("Ethereum:ETH", 1e7),
            node("Ethereum:USDC", 1e7),
            node("Polygon:USDC", 1e7),
            node("Polygon:MATIC", 1e7),
        ];
        let edges = [
            edge("Ethereum:ETH", "Ethereum:USDC", 1.0, 1e6, 1.0),
            edge("Ethereum:USDC", "Polygon:MATIC", 1.0, 1e6, 1.0),
            edge("Ethereum:ETH", "Polygon:USDC", 1.0, 1e6, 1.0),
            edge("Polygon:USDC", "Polygon:MATIC", 1.0, 1e6, 1.0),
        ];
        graph(&edges, &nodes)
    }

    #[test]
    fn test_route_conserves_amount() {
        let router = Router::new(two_arm_graph(), RouterConfig::default());
        let result = router
            .route(&"Ethereum:ETH".into(), &"Polygon:MATIC".into(), 100.0)
            .unwrap();

        let deployed: f64 = result.fills.iter().map(|f| f.amount_in).sum();
        assert!((deployed - 100.0).abs() / 100.0 < 1e-3);
        assert!(result.total_out > 0.0);

        for fill in &result.fills {
            assert_eq!(fill.route.first().unwrap().as_str(), "Ethereum:ETH");
            assert_eq!(fill.route.last().unwrap().as_str(), "Polygon:MATIC");
            assert!(fill.amount_in >= 0.0);
            assert!(fill.amount_out >= 0.0);
        }
    }

    #[test]
    fn test_route_splits_symmetric_arms() {
        let router = Router::new(two_arm_graph(), RouterConfig::default());
        let result = router
            .route(&"Ethereum:ETH".into(), &"Polygon:MATIC".into(), 100.0)
            .unwrap();

        // Both identical arms carry an even share.
        assert_eq!(result.fills.len(), 2);
        let ratio = result.fills[0].amount_in / result.fills[1].amount_in;
        assert!((ratio - 1.0).abs() < 0.01, "uneven split {ratio}");
    }

    #[test]
    fn test_route_disconnected_fails() {
        let g = graph(
            &[edge("X:A", "X:B", 1.0, 1e6, 1.0)],
            &[node("X:A", 1e6), node("X:B", 1e6), node("Y:C", 1e6)],
        );
        let router = Router::new(g, RouterConfig::default());

        let err = router
            .route(&"X:A".into(), &"Y:C".into(), 10.0)
            .unwrap_err();
        assert!(matches!(err, RouteError::NoPath { .. }));
    }

    #[test]
    fn test_route_shallow_pool_is_infeasible() {
        // One shallow pool: the slippage floor caps deployment at a few
        // units, far under the requested amount.
        let g = graph(
            &[edge("X:A", "X:B", 0.0, 100.0, 1.0)],
            &[node("X:A", 100.0), node("X:B", 100.0)],
        );
        let router = Router::new(g, RouterConfig::default());

        let err = router
            .route(&"X:A".into(), &"X:B".into(), 100.0)
            .unwrap_err();
        assert!(matches!(err, RouteError::InfeasibleAllocation(_)));
    }
}

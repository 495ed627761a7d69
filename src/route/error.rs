//! Typed failures surfaced by the routing pipeline.

use thiserror::Error;

use super::graph::AssetId;

/// Errors raised by graph construction, path enumeration, curve fitting,
/// and trade allocation.
///
/// Structural errors (`MalformedRecord`, `NoPath`) fail a query before any
/// computation proceeds. `CurveFit` is path-local and may be handled by a
/// fallback policy. `InfeasibleAllocation` is always query-fatal: it is
/// never downgraded to an empty or partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// An edge record references an asset missing from the node records.
    #[error("edge references unknown asset {0}")]
    MalformedRecord(AssetId),

    /// The source and target assets are not connected in the passable graph.
    #[error("no path from {src} to {target}")]
    NoPath {
        /// Requested source asset.
        src: AssetId,
        /// Requested destination asset.
        target: AssetId,
    },

    /// The nonlinear square-root fit did not converge to a concave,
    /// monotone parameter set.
    #[error("square-root curve fit failed: {0}")]
    CurveFit(String),

    /// No closed-form linear combination rule exists for this path length.
    #[error("no linear combination rule for a path of {0} edges")]
    UnsupportedPathLength(usize),

    /// The joint allocation program has no feasible point.
    #[error("no feasible split: {0}; relax the slippage floor or add paths")]
    InfeasibleAllocation(String),
}

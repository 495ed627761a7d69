//! Allocation cleanup and settlement.
//!
//! The solver's raw split carries numerical noise: allocations below 1% of
//! the largest one are folded into that largest path. Surviving paths are
//! then settled with the exact exchange function hop by hop, so reported
//! outputs never inherit curve-fit error.

use std::fmt;

use itertools::Itertools;

use super::curve::path_exchange;
use super::graph::{AssetId, LiquidityGraph};
use super::path::Path;

/// One path's share of the trade after settlement.
#[derive(Debug, Clone)]
pub struct PathFill {
    /// Index into the candidate path list.
    pub path: usize,
    /// Asset ids along the path, source first.
    pub route: Vec<AssetId>,
    /// Amount of the source asset sent down this path.
    pub amount_in: f64,
    /// Amount of the destination asset received, per the exact model.
    pub amount_out: f64,
}

/// The final allocation across candidate paths.
#[derive(Debug, Clone)]
pub struct AllocationResult {
    /// Per-path fills, in candidate order. Paths with a zero allocation
    /// are omitted.
    pub fills: Vec<PathFill>,
    /// Total destination-asset output across all fills.
    pub total_out: f64,
    /// Diagnostic messages accumulated during the query (curve-fit
    /// fallbacks, excluded paths).
    pub notes: Vec<String>,
}

impl fmt::Display for AllocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fill in &self.fills {
            let route = fill.route.iter().map(AssetId::as_str).join(" -> ");
            writeln!(f, "{route}: in {:.6} out {:.6}", fill.amount_in, fill.amount_out)?;
        }
        write!(f, "total out: {:.6}", self.total_out)?;
        for note in &self.notes {
            write!(f, "\nnote: {note}")?;
        }
        Ok(())
    }
}

/// Folds every allocation below 1% of the maximum into the maximum path
/// and zeroes it. Totals are conserved.
#[must_use]
pub fn clean_allocations(amounts: &[f64]) -> Vec<f64> {
    let mut cleaned = amounts.to_vec();
    let Some(max_index) = (0..cleaned.len()).max_by(|&a, &b| cleaned[a].total_cmp(&cleaned[b]))
    else {
        return cleaned;
    };
    let threshold = cleaned[max_index] * 0.01;
    if threshold <= 0.0 {
        return cleaned;
    }
    for i in 0..cleaned.len() {
        if i != max_index && cleaned[i] < threshold {
            cleaned[max_index] += cleaned[i];
            cleaned[i] = 0.0;
        }
    }
    cleaned
}

/// Settles cleaned allocations into exact per-path outputs.
///
/// `amounts` is indexed like `paths`; zero-allocation paths are dropped
/// from the result.
#[must_use]
pub fn settle(
    graph: &LiquidityGraph,
    paths: &[Path],
    amounts: &[f64],
    notes: Vec<String>,
) -> AllocationResult {
    let mut fills = Vec::new();
    let mut total_out = 0.0;
    for (i, (path, &amount)) in paths.iter().zip(amounts).enumerate() {
        if amount <= 0.0 {
            continue;
        }
        let amount_out = path_exchange(graph, path, amount);
        total_out += amount_out;
        fills.push(PathFill {
            path: i,
            route: path.route(graph),
            amount_in: amount,
            amount_out,
        });
    }
    AllocationResult {
        fills,
        total_out,
        notes,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::route::curve::exchange_amount;
    use crate::route::test_helpers::*;

    #[test]
    fn test_clean_folds_near_zero_allocations() {
        let cleaned = clean_allocations(&[97.0, 0.5, 2.5]);
        assert_eq!(cleaned, vec![97.5, 0.0, 2.5]);

        // Totals are conserved.
        let before: f64 = [97.0, 0.5, 2.5].iter().sum();
        let after: f64 = cleaned.iter().sum();
        assert!((before - after).abs() < 1e-12);
    }

    #[test]
    fn test_clean_keeps_balanced_allocations() {
        let amounts = [40.0, 35.0, 25.0];
        assert_eq!(clean_allocations(&amounts), amounts.to_vec());
    }

    #[test]
    fn test_clean_handles_all_zero() {
        let amounts = [0.0, 0.0];
        assert_eq!(clean_allocations(&amounts), amounts.to_vec());
    }

    #[test]
    fn test_settle_uses_exact_exchange() {
        let g = graph(
            &[edge("X:A", "X:B", 0.0, 200.0, 2.0)],
            &[node("X:A", 10.0), node("X:B", 10.0)],
        );
        let path = one_hop_path(&g, "X:A", "X:B");

        let result = settle(&g, &[path], &[10.0], Vec::new());
        assert_eq!(result.fills.len(), 1);

        // Reserves (50, 100): y(10) = 100 - 5000/60.
        let expected = exchange_amount(10.0, 50.0, 100.0);
        assert!((result.fills[0].amount_out - expected).abs() < 1e-12);
        assert!((result.total_out - expected).abs() < 1e-12);
        assert_eq!(result.fills[0].route.len(), 2);
    }

    #[test]
    fn test_settle_drops_zero_paths() {
        let g = graph(
            &[
                edge("X:A", "X:B", 0.0, 200.0, 2.0),
                edge("X:A", "X:B", 0.0, 300.0, 2.0),
            ],
            &[node("X:A", 10.0), node("X:B", 10.0)],
        );
        let paths = [one_hop_path(&g, "X:A", "X:B"), {
            let mut p = one_hop_path(&g, "X:A", "X:B");
            p.edges = vec![1];
            p
        }];

        let result = settle(&g, &paths, &[25.0, 0.0], Vec::new());
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].path, 0);
        assert_eq!(result.fills[0].amount_in, 25.0);
    }
}

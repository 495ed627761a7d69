//! Exchange-curve models: the exact constant-product hop function, its
//! first-order linear approximation, and the concave square-root fit used
//! by the joint allocation program.
//!
//! The exact function for a single hop with reserves `(liq_in, liq_out)` is
//! `y(x) = liq_out − liq_in·liq_out/(liq_in + x)`: strictly increasing and
//! strictly concave for positive reserves, undefined when either reserve is
//! empty. Approximations are always fitted against samples of this
//! function; settlement never uses the fitted curves.

use super::error::RouteError;
use super::graph::{LiquidityGraph, Pool};
use super::path::Path;

/// Number of evenly spaced samples taken over the amount range for every
/// curve fit.
const SAMPLES: usize = 100;

/// Levenberg-Marquardt iteration cap for the square-root fit.
const MAX_FIT_ITERATIONS: usize = 60;

/// Exact constant-product output for `x` units entering a hop with
/// reserves `(liq_in, liq_out)`. Defined for `x >= 0` and positive
/// reserves.
#[must_use]
pub fn exchange_amount(x: f64, liq_in: f64, liq_out: f64) -> f64 {
    let k = liq_in * liq_out;
    liq_out - k / (liq_in + x)
}

/// `count` evenly spaced samples of `[0, upper]`, both endpoints included.
fn sample_grid(upper: f64, count: usize) -> Vec<f64> {
    let last = (count - 1) as f64;
    (0..count).map(|i| upper * (i as f64) / last).collect()
}

/// First-order local model of an exchange curve over an amount range, with
/// the slippage-adjusted worst acceptable marginal price for the hop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParams {
    /// Fitted slope.
    pub slope: f64,
    /// Fitted intercept.
    pub intercept: f64,
    /// Worst acceptable marginal price: `y(1) · slippage`.
    pub min_price: f64,
}

impl LineParams {
    /// Model output at `x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares line through [`SAMPLES`] samples of the exact exchange
/// function on `[0, amount]`, plus the slippage-adjusted price estimate.
#[must_use]
pub fn fit_line(liq_in: f64, liq_out: f64, amount: f64, slippage: f64) -> LineParams {
    let xs = sample_grid(amount, SAMPLES);
    let n = xs.len() as f64;

    let mut sx = 0.0;
    let mut sy = 0.0;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for &x in &xs {
        let y = exchange_amount(x, liq_in, liq_out);
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
    }

    let det = n * sxx - sx * sx;
    let (slope, intercept) = if det.abs() > f64::EPSILON {
        let slope = (n * sxy - sx * sy) / det;
        (slope, (sy - slope * sx) / n)
    } else {
        (0.0, sy / n)
    };

    LineParams {
        slope,
        intercept,
        min_price: exchange_amount(1.0, liq_in, liq_out) * slippage,
    }
}

/// Price-impact line of a single pool computed from its endpoint liquidity
/// snapshots rather than its own pooled reserves. Inspection helper for
/// per-edge charts; path pricing uses [`path_lines`].
#[must_use]
pub fn edge_line(pool: &Pool, amount: f64, slippage: f64) -> LineParams {
    fit_line(pool.u_liquidity, pool.v_liquidity, amount, slippage)
}

/// Concave square-root model `y = a·sqrt(b·x + c) + d`.
///
/// Valid parameter sets have `a > 0`, `b > 0`, `c >= 0`, which makes the
/// model strictly increasing and strictly concave on the fitted range:
/// the shape the joint allocation program requires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqrtParams {
    /// Outer scale.
    pub a: f64,
    /// Inner slope.
    pub b: f64,
    /// Inner offset.
    pub c: f64,
    /// Outer offset.
    pub d: f64,
}

impl SqrtParams {
    /// Model output at `x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        self.a * (self.b * x + self.c).max(0.0).sqrt() + self.d
    }

    /// Marginal output rate `dy/dx` at `x`.
    #[must_use]
    pub fn marginal(&self, x: f64) -> f64 {
        let inner = (self.b * x + self.c).max(f64::MIN_POSITIVE);
        self.a * self.b / (2.0 * inner.sqrt())
    }

    /// Whether the parameters lie in the concave, monotone domain.
    fn is_concave_increasing(&self) -> bool {
        self.a > 0.0
            && self.b > 0.0
            && self.c >= 0.0
            && self.a.is_finite()
            && self.b.is_finite()
            && self.c.is_finite()
            && self.d.is_finite()
    }
}

/// Best `(a, d)` for fixed `(b, c)` by linear least squares, with the
/// resulting residual sum of squares. `None` when the basis is degenerate.
fn solve_scale_offset(xs: &[f64], ys: &[f64], b: f64, c: f64) -> Option<(f64, f64, f64)> {
    let n = xs.len() as f64;
    let mut su = 0.0;
    let mut suu = 0.0;
    let mut suy = 0.0;
    let mut sy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let u = (b * x + c).max(0.0).sqrt();
        su += u;
        suu += u * u;
        suy += u * y;
        sy += y;
    }

    let det = n * suu - su * su;
    if det.abs() < 1e-30 || !det.is_finite() {
        return None;
    }
    let a = (n * suy - su * sy) / det;
    let d = (suu * sy - su * suy) / det;

    let mut sse = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let r = a * (b * x + c).max(0.0).sqrt() + d - y;
        sse += r * r;
    }
    (sse.is_finite()).then_some((a, d, sse))
}

/// Residual vector for fixed `(b, c)` with `(a, d)` projected out.
fn projected_residuals(xs: &[f64], ys: &[f64], b: f64, c: f64) -> Option<(Vec<f64>, f64)> {
    let (a, d, sse) = solve_scale_offset(xs, ys, b, c)?;
    let residuals = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| a * (b * x + c).max(0.0).sqrt() + d - y)
        .collect();
    Some((residuals, sse))
}

/// Nonlinear least-squares fit of the square-root model to a sample set.
///
/// The model is linear in `(a, d)` for fixed `(b, c)`, so those two are
/// projected out analytically and a Levenberg-Marquardt refinement runs on
/// `(b, c)` alone, seeded from a coarse scan. Parameter sets outside the
/// concave monotone domain are rejected.
fn fit_sqrt_samples(xs: &[f64], ys: &[f64]) -> Result<SqrtParams, RouteError> {
    let upper = xs.last().copied().unwrap_or(0.0);
    if xs.len() < 4 || upper <= 0.0 {
        return Err(RouteError::CurveFit("sample range is empty".to_string()));
    }
    let spread = ys.iter().fold(f64::NEG_INFINITY, |m, &y| m.max(y))
        - ys.iter().fold(f64::INFINITY, |m, &y| m.min(y));
    if !(spread.is_finite() && spread > 0.0) {
        return Err(RouteError::CurveFit("sampled curve is degenerate".to_string()));
    }

    // Coarse scan over the nonlinear pair; keep the best seed that leaves
    // the model increasing.
    let mut seed: Option<(f64, f64, f64)> = None;
    for bf in [0.1, 0.3, 1.0, 3.0, 10.0, 100.0] {
        let b = bf / upper;
        for c in [1e-4, 1e-3, 1e-2, 0.1, 1.0, 10.0] {
            if let Some((a, _, sse)) = solve_scale_offset(xs, ys, b, c) {
                if a > 0.0 && seed.is_none_or(|(_, _, best)| sse < best) {
                    seed = Some((b, c, sse));
                }
            }
        }
    }
    let Some((mut b, mut c, mut cost)) = seed else {
        return Err(RouteError::CurveFit(
            "no increasing seed in the scan range".to_string(),
        ));
    };

    let mut lambda = 1e-3;
    for _ in 0..MAX_FIT_ITERATIONS {
        let Some((r0, _)) = projected_residuals(xs, ys, b, c) else {
            break;
        };
        let hb = (b.abs() * 1e-6).max(1e-12);
        let hc = (c.abs() * 1e-6).max(1e-12);
        let Some((rb, _)) = projected_residuals(xs, ys, b + hb, c) else {
            break;
        };
        let Some((rc, _)) = projected_residuals(xs, ys, b, c + hc) else {
            break;
        };

        // Normal equations of the 2-parameter Jacobian.
        let mut jbb = 0.0;
        let mut jbc = 0.0;
        let mut jcc = 0.0;
        let mut gb = 0.0;
        let mut gc = 0.0;
        for i in 0..r0.len() {
            let db = (rb[i] - r0[i]) / hb;
            let dc = (rc[i] - r0[i]) / hc;
            jbb += db * db;
            jbc += db * dc;
            jcc += dc * dc;
            gb += db * r0[i];
            gc += dc * r0[i];
        }

        let abb = jbb * (1.0 + lambda);
        let acc = jcc * (1.0 + lambda);
        let det = abb * acc - jbc * jbc;
        if det.abs() < 1e-30 || !det.is_finite() {
            break;
        }
        let step_b = (-gb * acc + gc * jbc) / det;
        let step_c = (-gc * abb + gb * jbc) / det;

        let trial_b = (b + step_b).max(1e-12);
        let trial_c = (c + step_c).max(0.0);
        match projected_residuals(xs, ys, trial_b, trial_c) {
            Some((_, trial_cost)) if trial_cost < cost => {
                let improvement = cost - trial_cost;
                b = trial_b;
                c = trial_c;
                cost = trial_cost;
                lambda = (lambda * 0.3).max(1e-12);
                if improvement <= 1e-12 * cost.max(f64::MIN_POSITIVE) {
                    break;
                }
            }
            _ => {
                lambda *= 10.0;
                if lambda > 1e12 {
                    break;
                }
            }
        }
    }

    let (a, d, _) = solve_scale_offset(xs, ys, b, c)
        .ok_or_else(|| RouteError::CurveFit("projection became degenerate".to_string()))?;
    let params = SqrtParams { a, b, c, d };
    if !params.is_concave_increasing() {
        return Err(RouteError::CurveFit(
            "fit left the concave monotone domain".to_string(),
        ));
    }
    Ok(params)
}

/// Square-root model fitted to the exact single-hop exchange function over
/// `[0, amount]`.
///
/// # Errors
///
/// [`RouteError::CurveFit`] when the fit does not converge to a concave,
/// monotone parameter set. Callers fall back to the linear approximation
/// or exclude the path.
pub fn fit_sqrt(liq_in: f64, liq_out: f64, amount: f64) -> Result<SqrtParams, RouteError> {
    let xs = sample_grid(amount, SAMPLES);
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| exchange_amount(x, liq_in, liq_out))
        .collect();
    fit_sqrt_samples(&xs, &ys)
}

/// Exact output of `x` pushed through every hop of `path` in order, using
/// each pool's oriented pricing reserves.
#[must_use]
pub fn path_exchange(graph: &LiquidityGraph, path: &Path, x: f64) -> f64 {
    let mut amount = x;
    for (i, &edge) in path.edges.iter().enumerate() {
        let (liq_in, liq_out) = graph.pool(edge).reserves_from(path.nodes[i]);
        amount = exchange_amount(amount, liq_in, liq_out);
    }
    amount
}

/// Component hop lines for `path`, each fitted over the full `[0, amount]`
/// range of the requested trade.
#[must_use]
pub fn path_lines(graph: &LiquidityGraph, path: &Path, amount: f64, slippage: f64) -> Vec<LineParams> {
    path.edges
        .iter()
        .enumerate()
        .map(|(i, &edge)| {
            let (liq_in, liq_out) = graph.pool(edge).reserves_from(path.nodes[i]);
            fit_line(liq_in, liq_out, amount, slippage)
        })
        .collect()
}

/// Square-root model for a whole path, fitted to samples of the exact
/// hop-by-hop composition (the same composition settlement uses).
///
/// # Errors
///
/// [`RouteError::CurveFit`] as for [`fit_sqrt`].
pub fn fit_path_sqrt(graph: &LiquidityGraph, path: &Path, amount: f64) -> Result<SqrtParams, RouteError> {
    let xs = sample_grid(amount, SAMPLES);
    let ys: Vec<f64> = xs.iter().map(|&x| path_exchange(graph, path, x)).collect();
    fit_sqrt_samples(&xs, &ys)
}

/// Combines component hop lines into one path line by first-order
/// substitution of each hop's output into the next hop. Closed forms exist
/// for one, two, and three hops; longer paths have no rule and are
/// rejected rather than approximated.
///
/// The combined minimum price is the largest hop floor.
///
/// # Errors
///
/// [`RouteError::UnsupportedPathLength`] for zero hops or more than three.
pub fn combine_lines(lines: &[LineParams]) -> Result<LineParams, RouteError> {
    let min_price = lines
        .iter()
        .map(|line| line.min_price)
        .fold(f64::NEG_INFINITY, f64::max);

    match lines {
        [l1] => Ok(*l1),
        [l1, l2] => Ok(LineParams {
            slope: l1.slope * l2.slope,
            intercept: l2.slope * l1.intercept + l2.intercept,
            min_price,
        }),
        [l1, l2, l3] => Ok(LineParams {
            slope: l1.slope * l2.slope * l3.slope,
            intercept: l2.slope * l3.slope * l1.intercept + l3.slope * l2.intercept + l3.intercept,
            min_price,
        }),
        other => Err(RouteError::UnsupportedPathLength(other.len())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::route::test_helpers::*;

    #[test]
    fn test_exchange_curve_is_monotone_and_concave() {
        let xs = sample_grid(10.0, 100);
        let ys: Vec<f64> = xs.iter().map(|&x| exchange_amount(x, 10.0, 10.0)).collect();

        for pair in ys.windows(2) {
            assert!(pair[1] - pair[0] >= 0.0);
        }
        for triple in ys.windows(3) {
            let first = triple[1] - triple[0];
            let second = triple[2] - triple[1];
            assert!(second - first <= 1e-12);
        }
    }

    #[test]
    fn test_sample_grid_stays_inside_amount() {
        // Reserves (1, 1), amount 1: the fit never samples past the trade.
        let xs = sample_grid(1.0, SAMPLES);
        assert_eq!(xs.len(), SAMPLES);
        assert_eq!(xs[0], 0.0);
        assert_eq!(*xs.last().unwrap(), 1.0);
        assert!(xs.iter().all(|&x| x <= 1.0));
    }

    #[test]
    fn test_fit_line_on_deep_reserves() {
        // Deep pool, small trade: the curve is effectively the identity.
        let line = fit_line(1e6, 1e6, 100.0, 0.95);
        assert!((line.slope - 1.0).abs() < 1e-3);
        assert!(line.intercept.abs() < 1e-2);
        assert!((line.min_price - 0.95).abs() < 1e-3);
    }

    #[test]
    fn test_fit_sqrt_matches_exact_curve() {
        let params = fit_sqrt(100.0, 100.0, 100.0).unwrap();
        assert!(params.a > 0.0);
        assert!(params.b > 0.0);
        assert!(params.c >= 0.0);

        // The model tracks the exact curve over the fitted range.
        let xs = sample_grid(100.0, SAMPLES);
        let mut sse = 0.0;
        for &x in &xs {
            let err = params.eval(x) - exchange_amount(x, 100.0, 100.0);
            sse += err * err;
        }
        let rms = (sse / xs.len() as f64).sqrt();
        assert!(rms < 1.5, "rms {rms} too large");

        // And stays monotone on it.
        for pair in xs.windows(2) {
            assert!(params.eval(pair[1]) >= params.eval(pair[0]));
        }
        assert!(params.eval(0.0).abs() < 2.0);
    }

    #[test]
    fn test_fit_sqrt_rejects_degenerate_samples() {
        let xs = sample_grid(10.0, SAMPLES);
        let ys = vec![5.0; SAMPLES];
        let err = fit_sqrt_samples(&xs, &ys).unwrap_err();
        assert!(matches!(err, RouteError::CurveFit(_)));
    }

    #[test]
    fn test_combine_two_hops() {
        let combined = combine_lines(&[line(2.0, 0.5, 1.0), line(3.0, 0.25, 1.2)]).unwrap();
        assert_eq!(combined.slope, 6.0);
        assert_eq!(combined.intercept, 3.0 * 0.5 + 0.25);
        assert_eq!(combined.min_price, 1.2);
    }

    #[test]
    fn test_combine_three_hops() {
        let combined = combine_lines(&[
            line(2.0, 0.5, 1.0),
            line(3.0, 0.25, 1.2),
            line(0.5, 1.0, 0.7),
        ])
        .unwrap();
        assert_eq!(combined.slope, 3.0);
        assert!((combined.intercept - 1.875).abs() < 1e-12);
        assert_eq!(combined.min_price, 1.2);
    }

    #[test]
    fn test_combine_rejects_long_paths() {
        let hop = line(1.0, 0.0, 0.9);
        let err = combine_lines(&[hop, hop, hop, hop]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no linear combination rule for a path of 4 edges"
        );
    }

    #[test]
    fn test_path_exchange_folds_hops() {
        let g = graph(
            &[
                edge("X:A", "X:B", 0.0, 200.0, 2.0),
                edge("X:B", "X:C", 0.0, 100.0, 1.0),
            ],
            &[node("X:A", 10.0), node("X:B", 10.0), node("X:C", 10.0)],
        );
        let path = two_hop_path(&g, "X:A", "X:B", "X:C");

        // Hop 1: reserves (50, 100); hop 2: reserves (50, 50).
        let first = exchange_amount(10.0, 50.0, 100.0);
        assert!((first - 16.666_666_666_666_668).abs() < 1e-9);
        let second = exchange_amount(first, 50.0, 50.0);
        assert!((path_exchange(&g, &path, 10.0) - second).abs() < 1e-12);
        assert!((second - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_edge_line_uses_endpoint_snapshots() {
        let g = graph(
            &[edge("X:A", "X:B", 0.0, 1.0, 1.0)],
            &[node("X:A", 1e6), node("X:B", 1e6)],
        );
        let line = edge_line(g.pool(0), 100.0, 0.95);
        assert!((line.slope - 1.0).abs() < 1e-3);
    }
}

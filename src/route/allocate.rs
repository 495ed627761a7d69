//! Trade splitting across candidate paths.
//!
//! The preferred program maximizes the summed square-root models subject to
//! the full amount being deployed and every path meeting its minimum-price
//! floor. The objective is concave with one equality and per-path interval
//! constraints, so the optimum is characterized by a single marginal rate
//! shared by every interior path; the solver inverts the closed-form
//! marginal under a scalar multiplier and bisects on that multiplier.
//!
//! The linear program over first-order lines is kept as a lower-fidelity
//! fallback for paths whose square-root fit is unavailable.

use log::debug;

use super::curve::{LineParams, SqrtParams};
use super::error::RouteError;

/// Relative feasibility tolerance for floor constraints and budget checks.
const FEAS_TOL: f64 = 1e-9;

/// Bisection iterations for interval roots and the marginal-rate search.
const BISECT_ITERATIONS: usize = 200;

/// Per-path curve inputs to the allocator. Every path in one allocation is
/// priced by the same model.
#[derive(Debug, Clone)]
pub enum CurveSet {
    /// Concave square-root models with their minimum-price floors.
    Sqrt(Vec<(SqrtParams, f64)>),
    /// First-order lines; the floor is the line's own `min_price`.
    Linear(Vec<LineParams>),
}

/// Splits `total` across the paths of `set`, maximizing the modeled output
/// subject to every floor. Allocations are non-negative and sum to `total`
/// within solver tolerance. Two paths with identical curve parameters
/// receive identical amounts.
///
/// # Errors
///
/// [`RouteError::InfeasibleAllocation`] when no split satisfies all
/// constraints. Never returns an empty or partial allocation instead.
pub fn allocate(set: &CurveSet, total: f64) -> Result<Vec<f64>, RouteError> {
    match set {
        CurveSet::Sqrt(curves) => allocate_concave(curves, total),
        CurveSet::Linear(lines) => allocate_linear(lines, total),
    }
}

/// Root of a monotone slack function on `[lo, hi]`, where `slack(lo)` and
/// `slack(hi)` straddle zero.
fn bisect_root(slack: impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let rising = slack(lo) < 0.0;
    for _ in 0..BISECT_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let value = slack(mid);
        if (value < 0.0) == rising {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Feasible input interval `[lower, upper]` of one path under its floor:
/// the set where `y(x) - floor·x >= 0`, which is a single interval because
/// the slack is concave.
///
/// The exact exchange curve passes through the origin, so a fitted value
/// slightly below zero at `x = 0` is fit noise, not infeasibility; the
/// peak test tolerates it at fit scale. A path whose slack never truly
/// rises above zero collapses to the empty slot `[0, 0]`.
fn feasible_interval(curve: &SqrtParams, floor: f64, total: f64) -> Option<(f64, f64)> {
    let slack = |x: f64| curve.eval(x) - floor * x;
    let fit_eps = 1e-3 * (1.0 + curve.eval(total).abs());

    // Peak of the concave slack on [0, total].
    let peak = if floor > 0.0 {
        let t = curve.a * curve.b / (2.0 * floor);
        ((t * t - curve.c) / curve.b).clamp(0.0, total)
    } else {
        total
    };
    let at_peak = slack(peak);
    if at_peak < -fit_eps {
        return None;
    }
    if at_peak <= 0.0 {
        // Within noise of zero but never truly above it: the path is
        // usable only as an empty slot.
        return (slack(0.0) >= -fit_eps).then_some((0.0, 0.0));
    }

    let upper = if slack(total) >= 0.0 {
        total
    } else {
        bisect_root(&slack, peak, total)
    };
    let lower = if slack(0.0) >= 0.0 {
        0.0
    } else {
        bisect_root(&slack, 0.0, peak)
    };
    Some((lower, upper))
}

/// Concave program: maximize `Σ yᵢ(xᵢ)` over `Σ xᵢ = total`, `xᵢ >= 0`,
/// `yᵢ(xᵢ) >= floorᵢ·xᵢ`.
fn allocate_concave(curves: &[(SqrtParams, f64)], total: f64) -> Result<Vec<f64>, RouteError> {
    if curves.is_empty() {
        return Err(RouteError::InfeasibleAllocation(
            "no candidate paths".to_string(),
        ));
    }
    if total < 0.0 {
        return Err(RouteError::InfeasibleAllocation(
            "trade amount is negative".to_string(),
        ));
    }
    if total == 0.0 {
        return Ok(vec![0.0; curves.len()]);
    }

    let mut intervals = Vec::with_capacity(curves.len());
    for (i, (curve, floor)) in curves.iter().enumerate() {
        let interval = feasible_interval(curve, *floor, total).ok_or_else(|| {
            RouteError::InfeasibleAllocation(format!("path {i} cannot meet its price floor"))
        })?;
        intervals.push(interval);
    }

    let tol = FEAS_TOL * total.max(1.0);
    let sum_lower: f64 = intervals.iter().map(|&(l, _)| l).sum();
    let sum_upper: f64 = intervals.iter().map(|&(_, u)| u).sum();
    if sum_lower > total + tol {
        return Err(RouteError::InfeasibleAllocation(
            "price floors force more input than the trade amount".to_string(),
        ));
    }
    if sum_upper < total - tol {
        return Err(RouteError::InfeasibleAllocation(
            "price floors cap the deployable amount below the trade amount".to_string(),
        ));
    }

    // Allocation at a given marginal rate: each path takes the input where
    // its marginal equals the rate, clamped into its feasible interval.
    let take = |rate: f64| -> Vec<f64> {
        curves
            .iter()
            .zip(&intervals)
            .map(|((curve, _), &(lower, upper))| {
                if rate <= 0.0 {
                    upper
                } else {
                    let t = curve.a * curve.b / (2.0 * rate);
                    ((t * t - curve.c) / curve.b).clamp(lower, upper)
                }
            })
            .collect()
    };
    let deployed = |rate: f64| -> f64 { take(rate).iter().sum() };

    // Bracket the equalizing rate, then bisect: deployment is continuous
    // and non-increasing in the rate.
    let mut hi = 1.0;
    let mut doublings = 0;
    while deployed(hi) > total && doublings < BISECT_ITERATIONS {
        hi *= 2.0;
        doublings += 1;
    }
    let mut lo = 0.0;
    for _ in 0..BISECT_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if deployed(mid) > total {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let mut amounts = take(0.5 * (lo + hi));
    let mut residual = total - amounts.iter().sum::<f64>();
    debug!("concave allocation residual before cleanup: {residual:e}");

    // Absorb the bisection residual into paths with headroom.
    if residual != 0.0 {
        for (amount, &(lower, upper)) in amounts.iter_mut().zip(&intervals) {
            if residual > 0.0 {
                let step = residual.min(upper - *amount);
                *amount += step;
                residual -= step;
            } else {
                let step = (-residual).min(*amount - lower);
                *amount -= step;
                residual += step;
            }
            if residual == 0.0 {
                break;
            }
        }
    }

    Ok(amounts)
}

/// Linear program over first-order lines: maximize `Σ (mᵢ·xᵢ + cᵢ)` over
/// `Σ xᵢ = total`, `xᵢ >= 0`, `mᵢ·xᵢ + cᵢ >= sᵢ·xᵢ`.
///
/// The intercepts are constants in the objective, so the argmax ignores
/// them: with no floors, every unit lands on the steepest line. The floor
/// constraints are what make the split non-trivial; they cap each path at
/// `cᵢ / (sᵢ - mᵢ)` whenever its floor exceeds its slope.
fn allocate_linear(lines: &[LineParams], total: f64) -> Result<Vec<f64>, RouteError> {
    if lines.is_empty() {
        return Err(RouteError::InfeasibleAllocation(
            "no candidate paths".to_string(),
        ));
    }
    if total < 0.0 {
        return Err(RouteError::InfeasibleAllocation(
            "trade amount is negative".to_string(),
        ));
    }
    if total == 0.0 {
        return Ok(vec![0.0; lines.len()]);
    }

    let tol = FEAS_TOL * total.max(1.0);
    let mut intervals = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let margin = line.slope - line.min_price;
        let infeasible =
            || RouteError::InfeasibleAllocation(format!("path {i} cannot meet its price floor"));
        let interval = if margin.abs() <= 1e-12 {
            if line.intercept < -tol {
                return Err(infeasible());
            }
            (0.0, total)
        } else if margin > 0.0 {
            ((-line.intercept / margin).max(0.0), total)
        } else {
            let cap = line.intercept / -margin;
            if cap < -tol {
                return Err(infeasible());
            }
            (0.0, cap.clamp(0.0, total))
        };
        intervals.push(interval);
    }

    let sum_lower: f64 = intervals.iter().map(|&(l, _)| l).sum();
    let sum_upper: f64 = intervals.iter().map(|&(_, u)| u).sum();
    if sum_lower > total + tol {
        return Err(RouteError::InfeasibleAllocation(
            "price floors force more input than the trade amount".to_string(),
        ));
    }
    if sum_upper < total - tol {
        return Err(RouteError::InfeasibleAllocation(
            "price floors cap the deployable amount below the trade amount".to_string(),
        ));
    }

    let mut amounts: Vec<f64> = intervals.iter().map(|&(l, _)| l).collect();
    let mut remaining = total - sum_lower;

    // Steepest lines first; identical parameter sets are processed as one
    // group and share their fill evenly.
    let mut order: Vec<usize> = (0..lines.len()).collect();
    order.sort_by(|&a, &b| {
        lines[b]
            .slope
            .total_cmp(&lines[a].slope)
            .then(lines[b].intercept.total_cmp(&lines[a].intercept))
            .then(lines[b].min_price.total_cmp(&lines[a].min_price))
            .then(a.cmp(&b))
    });

    let mut start = 0;
    while start < order.len() && remaining > 0.0 {
        let mut end = start;
        while end < order.len() && lines[order[end]] == lines[order[start]] {
            end += 1;
        }
        let group = &order[start..end];

        let capacity: f64 = group.iter().map(|&i| intervals[i].1 - amounts[i]).sum();
        let fill = remaining.min(capacity);
        if group.len() == 1 {
            amounts[group[0]] += fill;
        } else {
            // Identical lines have identical intervals; an even share
            // never overflows a member's capacity.
            let share = fill / group.len() as f64;
            for &i in group {
                amounts[i] += share;
            }
        }
        remaining -= fill;
        start = end;
    }

    if remaining > tol {
        return Err(RouteError::InfeasibleAllocation(
            "price floors cap the deployable amount below the trade amount".to_string(),
        ));
    }
    Ok(amounts)
}

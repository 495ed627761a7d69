//! # Routing Module
//!
//! This module contains the core routing pipeline: the liquidity graph,
//! simple-path enumeration, exchange-curve modeling, the joint allocation
//! program, and settlement of the final split. Everything here computes
//! synchronously over a per-query graph snapshot.

/// Trade splitting across candidate paths
pub mod allocate;
/// Exchange-curve models and fitting
pub mod curve;
/// Typed routing failures
pub mod error;
/// Assets, pools, and the liquidity graph
pub mod graph;
/// Simple-path enumeration
pub mod path;
/// Allocation cleanup and settlement
pub mod report;
/// Query facade
pub mod router;
/// Test helpers and builders
mod test_helpers;

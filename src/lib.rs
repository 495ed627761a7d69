/*!
 * # Ferry - Cross-Chain Liquidity Routing
 *
 * Ferry routes a trade of one asset into another across a network of
 * liquidity pools spanning multiple chains and bridges, splitting the
 * amount across candidate paths to maximize the destination-asset output
 * under per-path worst-acceptable-price constraints.
 *
 * ## Core Features
 *
 * - **Path Discovery**: Enumerates the k least-costly simple paths through
 *   the liquidity graph
 * - **Price-Impact Modeling**: Models each hop's constant-product exchange
 *   curve exactly and fits tractable approximations for optimization
 * - **Optimal Splitting**: Solves a concave program that distributes the
 *   trade across paths subject to per-path price floors
 * - **Exact Settlement**: Reports final outputs from the exact exchange
 *   function, never the fitted curves
 *
 * ## Module Structure
 *
 * - `record`: Input records as delivered by the data-loading layer
 * - `route`: Core routing pipeline (graph, paths, curves, allocation)
 * - `config`: Environment-backed configuration for the binary
 * - `utils`: Utility functions and helpers
 */

/// Environment-backed configuration for the binary
pub mod config;
/// Input records from the data-loading layer
pub mod record;
/// Core routing pipeline
pub mod route;
/// Utility functions and helpers
pub mod utils;

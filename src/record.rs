//! Input records as delivered by the external data-loading layer.
//!
//! The on-disk format belongs to the loading layer, not to this crate; the
//! routing core only requires that it deserializes into the flat node and
//! edge records below.

use std::fs;
use std::path::Path;

use serde::Deserialize;

/// An asset node as it arrives from the records source.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    /// Chain-qualified asset identifier, e.g. `"Ethereum:ETH"`.
    pub name: String,
    /// Reserve liquidity held at this asset, non-negative.
    #[serde(default)]
    pub liquidity: f64,
    /// Optional display label.
    #[serde(default)]
    pub label: Option<String>,
}

/// A pool edge as it arrives from the records source.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeRecord {
    /// One endpoint asset id.
    pub u: String,
    /// The other endpoint asset id.
    pub v: String,
    /// Pool fee, non-negative.
    #[serde(default)]
    pub fee: f64,
    /// Pooled liquidity of this venue at load time.
    pub liquidity: f64,
    /// Implied exchange rate from `u` to `v`.
    pub rate: f64,
    /// Whether this pool connects assets on different chains.
    #[serde(default, alias = "isBridge")]
    pub bridge: bool,
}

/// A complete record set: every pool edge plus every asset node.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSet {
    /// Pool edges.
    pub edges: Vec<EdgeRecord>,
    /// Asset nodes.
    pub nodes: Vec<NodeRecord>,
}

impl RecordSet {
    /// Reads a record set from a JSON file produced by the data layer.
    ///
    /// # Errors
    ///
    /// * If the file cannot be read
    /// * If the contents do not deserialize into a record set
    pub fn from_file(path: &Path) -> eyre::Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

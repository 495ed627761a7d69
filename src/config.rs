//! Environment-backed configuration for the binary.

use dotenv::dotenv;

/// Runtime defaults resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Candidate paths per query (`FERRY_PATHS`).
    pub paths: usize,
    /// Slippage tolerance factor (`FERRY_SLIPPAGE`).
    pub slippage: f64,
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults
    /// for unset or unparsable variables.
    #[must_use]
    pub fn from_env() -> Self {
        dotenv().ok();
        Self {
            paths: std::env::var("FERRY_PATHS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(5),
            slippage: std::env::var("FERRY_SLIPPAGE")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(0.95),
        }
    }
}

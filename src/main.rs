//! Command-line entry point: load a record set, route one trade, print
//! the allocation.

use std::path::PathBuf;

use clap::Parser;
use eyre::Result;
use log::info;

use ferry::config::Config;
use ferry::record::RecordSet;
use ferry::route::graph::LiquidityGraph;
use ferry::route::router::{Router, RouterConfig};
use ferry::utils::logger::setup_logger;

/// Route a trade across a liquidity pool network.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Records file with `edges` and `nodes` lists
    file: PathBuf,
    /// Source asset id, e.g. Ethereum:ETH
    source: String,
    /// Destination asset id, e.g. Polygon:MATIC
    target: String,
    /// Trade amount in source-asset units
    amount: f64,
    /// Candidate paths to consider
    #[arg(short = 'k', long)]
    paths: Option<usize>,
    /// Slippage tolerance factor
    #[arg(short, long)]
    slippage: Option<f64>,
}

fn main() -> Result<()> {
    setup_logger()?;
    let cli = Cli::parse();
    let defaults = Config::from_env();

    let records = RecordSet::from_file(&cli.file)?;
    info!(
        "loaded {} pools across {} assets",
        records.edges.len(),
        records.nodes.len()
    );

    let graph = LiquidityGraph::build(&records.edges, &records.nodes)?;
    let router = Router::new(
        graph,
        RouterConfig {
            paths: cli.paths.unwrap_or(defaults.paths),
            slippage: cli.slippage.unwrap_or(defaults.slippage),
            ..RouterConfig::default()
        },
    );

    let result = router.route(&cli.source.into(), &cli.target.into(), cli.amount)?;
    println!("{result}");
    Ok(())
}

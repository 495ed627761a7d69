use chrono::Local;
use eyre::Result;
use fern::Dispatch;

/// Sets up console logging for the binary.
///
/// The level comes from the `RUST_LOG` environment variable and defaults
/// to `Info`; messages carry a timestamp and their module target.
///
/// # Errors
/// * If a logger was already installed
pub fn setup_logger() -> Result<()> {
    Dispatch::new()
        .level(
            std::env::var("RUST_LOG")
                .map(|level| level.parse().unwrap_or(log::LevelFilter::Info))
                .unwrap_or(log::LevelFilter::Info),
        )
        .chain(std::io::stdout())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ));
        })
        .apply()?;
    Ok(())
}

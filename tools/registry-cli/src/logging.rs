//! Logging and tracing setup

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with the given level and format
///
/// `RUST_LOG` takes precedence over `level` when it is set.
pub fn initialize_logging(level: &str, format: &str) -> Result<()> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", level)),
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so command output on stdout stays machine-readable
    let fmt_layer = match format {
        "json" => fmt::layer().json().with_target(true).with_writer(std::io::stderr).boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        "plain" => fmt::layer().with_target(false).with_writer(std::io::stderr).boxed(),
        _ => return Err(anyhow!("Invalid log format: {}", format)),
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;

    Ok(())
}

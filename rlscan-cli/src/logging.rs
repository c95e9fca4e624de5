//! Tracing setup for the rlscan binary.
//!
//! Diagnostics go to stderr in every format. Stdout is reserved for the status
//! reporter stream, which a CI host parses line by line.

use anyhow::{Context, Result, bail};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use rlscan_core::config::GeneralConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter precedence: `--log-level`, then `RUST_LOG`, then `general.log_level`.
fn filter(config: &GeneralConfig, level_override: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = level_override {
        return EnvFilter::try_new(level).with_context(|| format!("invalid --log-level '{level}'"));
    }
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
}

fn stderr_layer(format: &str) -> Result<BoxedLayer> {
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    Ok(match format {
        "json" => layer.json().boxed(),
        "pretty" => layer.pretty().boxed(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    })
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &GeneralConfig, level_override: Option<&str>) -> Result<()> {
    let layer = stderr_layer(&config.log_format)?.with_filter(filter(config, level_override)?);
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("failed to install tracing subscriber")
}

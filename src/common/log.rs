//! Logging set-up: JSON lines by default, human output for local runs.

use tracing_subscriber::EnvFilter;

use super::config::{AppCfg, LogFormat};
use super::error::{PloidyError, PloidyResult};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(cfg: &AppCfg) -> PloidyResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .map_err(|e| PloidyError::config(format!("invalid log level '{}': {e}", cfg.log_level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = match cfg.log_format {
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|e| PloidyError::internal(format!("logger already installed: {e}")))
}

//! Logging setup of the `kvbench` binary.

use std::env;
use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::config::{LogFormat, Logging};

/// Installs the global `tracing` subscriber, writing to stderr.
pub fn init_tracing(config: &Logging) {
    let env_filter = env_filter(config.level);

    let format = match config.format {
        LogFormat::Auto if std::io::stderr().is_terminal() => LogFormat::Pretty,
        LogFormat::Auto => LogFormat::Simplified,
        format => format,
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let layer = match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Simplified => layer.with_ansi(false).compact().boxed(),
        LogFormat::Pretty | LogFormat::Auto => layer.boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .init();
}

/// Builds the filter from `RUST_LOG` if set, otherwise from the configured level.
///
/// A plain level in `RUST_LOG` (such as `debug`) only applies to this crate and leaves
/// dependencies at `WARN`. Any other value is used literally.
fn env_filter(level: LevelFilter) -> EnvFilter {
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => return EnvFilter::new(value),
        },
        Err(_) => level,
    };

    EnvFilter::new(format!("WARN,kvbench={level}"))
}

//! Configuration for the benchmark.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags, see [`cli`](crate::cli)
//! 2. Environment variables (prefixed with `KVBENCH__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! Without any configuration, the benchmark targets `http://127.0.0.1:3030` and generates keys
//! such as `key_Xa81kPq0Zt` with values such as `value_0bLq7rT2mW`.
//!
//! # Environment Variables
//!
//! Environment variables use `KVBENCH__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `KVBENCH__REMOTE=http://10.0.0.1:3030` sets the base URL of the service
//! - `KVBENCH__LOGGING__LEVEL=debug` sets the log level
//!
//! # YAML Configuration File
//!
//! ```yaml
//! remote: http://10.0.0.1:3030
//! concurrency: 64
//! timeout: 5s
//!
//! logging:
//!   level: debug
//! ```

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::record::{DEFAULT_KEY_PREFIX, DEFAULT_SUFFIX_LEN, DEFAULT_VALUE_PREFIX};

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "KVBENCH__";

/// Base URL of the key-value service when nothing else is configured.
pub const DEFAULT_REMOTE: &str = "http://127.0.0.1:3030";

/// Log output format.
///
/// Controls how log messages are formatted. The format can be explicitly specified or
/// auto-detected based on whether output is to a TTY.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO  kvbench::driver > starting benchmark
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2020-12-04T12:10:32Z [kvbench::driver] INFO: starting benchmark
    /// ```
    Simplified,

    /// Dump out JSON lines.
    Json,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, so that stdout only carries the report.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// The `RUST_LOG` environment variable takes precedence if it is set.
    ///
    /// # Default
    ///
    /// `INFO`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format, see [`LogFormat`].
    ///
    /// # Default
    ///
    /// `Auto` (pretty for TTY, simplified otherwise)
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Benchmark configuration.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the key-value service.
    ///
    /// The endpoints `set`, `get` and `remove` are resolved relative to this URL.
    ///
    /// # Default
    ///
    /// `http://127.0.0.1:3030`
    pub remote: String,

    /// Prefix of every generated key.
    pub key_prefix: String,

    /// Prefix of every generated value.
    pub value_prefix: String,

    /// Number of random alphanumeric characters following the key and value prefixes.
    pub suffix_len: usize,

    /// Maximum number of cycles in flight.
    ///
    /// # Default
    ///
    /// `None`, which launches all cycles at once.
    pub concurrency: Option<NonZeroUsize>,

    /// Timeout of each individual HTTP call, for example `5s` or `250ms`.
    ///
    /// # Default
    ///
    /// `None` (no timeout)
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Seed of the record generator, for reproducible keys and values.
    ///
    /// # Default
    ///
    /// `None` (random seed)
    pub seed: Option<u64>,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_owned(),
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            value_prefix: DEFAULT_VALUE_PREFIX.to_owned(),
            suffix_len: DEFAULT_SUFFIX_LEN,
            concurrency: None,
            timeout: None,
            seed: None,
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, the optional YAML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The YAML configuration file does not exist or cannot be parsed
    /// - Environment variables contain invalid values
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }
}

//! Error types for tagrel-core configuration loading.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A merged source did not deserialize into [`Config`](crate::config::Config).
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),

    /// A config file named explicitly (e.g. `--config`) does not exist.
    #[error("config file not found: {path}")]
    Missing {
        /// The path as given.
        path: Utf8PathBuf,
    },
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;

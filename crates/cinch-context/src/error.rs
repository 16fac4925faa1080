//! Error type for the fallible setup paths (config loading, tool pattern
//! compilation). The per-turn algorithms never fail.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config JSON did not match the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A tool allow/deny pattern is not a valid glob.
    #[error("invalid tool pattern '{pattern}': {source}")]
    InvalidToolPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

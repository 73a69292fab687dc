//! Error types shared across the autosave crates

use thiserror::Error;

/// Errors raised by local record handling
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tag selection already holds the maximum number of tags
    #[error("at most {max} affinity tags can be selected")]
    TagLimit { max: usize },

    /// Snapshot could not be encoded or decoded
    #[error("snapshot codec failed: {0}")]
    Codec(#[from] bincode::Error),
}

/// Errors returned by remote collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Backend could not be reached or timed out
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// No authenticated identity for the call
    #[error("no authenticated owner")]
    Unauthenticated,
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A numeric setting is outside its accepted range
    #[error("{key} = {value} is out of range ({min}-{max})")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("invalid config: {0}")]
    Inconsistent(String),
}

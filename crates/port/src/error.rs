//! Error types for the output port

use std::io;

/// Result type for port operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bringing the port up.
///
/// Every variant is an initialization failure. Once a context exists, output
/// and dispatch are best-effort and never report errors back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dispatcher thread could not be spawned
    #[error("failed to spawn dispatcher thread '{name}': {source}")]
    SpawnDispatcher {
        /// Name the thread was given
        name: String,
        /// The underlying error
        source: io::Error,
    },

    /// Async output is enabled but no record source was supplied
    #[error("async output is enabled but no pending record source was provided")]
    MissingSource,

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Configuration could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A process-wide context was already registered
    #[error("output port already initialized")]
    AlreadyInitialized,
}

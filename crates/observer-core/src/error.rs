//! Error types for the station polling engine.

use thiserror::Error;

/// Result type alias for station operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the station polling engine
///
/// Nothing here is fatal to the supervisor: every variant except
/// `Config` is converted into a logged event plus a bounded delay plus
/// a restart. `Config` is the one class of error that fails fast at
/// startup, before the loop begins.
#[derive(Error, Debug)]
pub enum Error {
    /// The listening socket could not be acquired.
    /// Recoverable: retried after the cooldown.
    #[error("cannot bind listening socket: {0}")]
    Bind(#[source] std::io::Error),

    /// No station connected back within the configured timeout.
    /// Recoverable: retried by re-broadcasting the discovery message.
    #[error("no station answered the discovery broadcast")]
    NoPeer,

    /// I/O failure on the accepted connection.
    /// Recoverable: forces a full rediscovery cycle.
    #[error("station link failed: {0}")]
    Link(#[source] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

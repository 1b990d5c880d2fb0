//! Error types for the update system.
//!
//! The taxonomy mirrors how errors are handled rather than where they come
//! from:
//!
//! - Setup errors ([`Error::InterfaceNotFound`], [`Error::Subscription`],
//!   [`Error::Config`], [`Error::ZoneResolver`]) are fatal; the driver
//!   reports them and exits before tracking starts.
//! - Per-attempt delivery errors ([`Error::Transport`], [`Error::Rejected`])
//!   are recoverable and drive the engine's retry scheduler.
//! - [`Error::EngineStopped`] marks use of the engine after shutdown.

use thiserror::Error;

/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the update system.
#[derive(Error, Debug)]
pub enum Error {
    /// The tracked interface does not exist.
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    /// The link/address source could not be opened or queried.
    #[error("address source failed: {0}")]
    Subscription(String),

    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Zone server discovery failed.
    #[error("zone resolver error: {0}")]
    ZoneResolver(String),

    /// A delivery attempt failed below the DNS layer (socket error,
    /// timeout, malformed response).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered the update with a non-success response code.
    #[error("update rejected: rcode={rcode}")]
    Rejected {
        /// Text form of the response code, for diagnostics.
        rcode: String,
    },

    /// The engine no longer accepts submissions.
    #[error("update engine is stopped")]
    EngineStopped,

    /// Anything that does not fit the categories above.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an interface-not-found error.
    pub fn interface_not_found(name: impl Into<String>) -> Self {
        Self::InterfaceNotFound(name.into())
    }

    /// Create a subscription error.
    pub fn subscription(msg: impl Into<String>) -> Self {
        Self::Subscription(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a zone resolver error.
    pub fn zone_resolver(msg: impl Into<String>) -> Self {
        Self::ZoneResolver(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a rejected-update error from a response code string.
    pub fn rejected(rcode: impl Into<String>) -> Self {
        Self::Rejected {
            rcode: rcode.into(),
        }
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error is a per-attempt delivery failure that the
    /// retry scheduler handles, as opposed to a fatal setup error.
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected { .. })
    }
}

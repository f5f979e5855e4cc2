//! The error type shared by every part of this crate

use std::io;
use std::path::PathBuf;
use thiserror::Error;


/// Shortcut for results produced by this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that may abort an exchange.\
/// Notice that a poll timeout and an early end-of-stream are not errors:
/// see [crate::transport::Received] and [crate::exchange::ExchangeOutcome].
#[derive(Debug, Error)]
pub enum Error {

    /// Nobody is listening on the responder endpoint -- reported once, never retried
    #[error("connection refused by {host}:{port} -- is the responder running?")]
    ConnectionRefused { host: String, port: u16 },

    /// The responder was unable to listen on its endpoint
    #[error("unable to listen on {address}: {source}")]
    Bind { address: String, #[source] source: io::Error },

    /// The other end of an in-process handoff channel is gone
    #[error("in-process channel towards the {direction} is disconnected")]
    ChannelDisconnected { direction: String },

    /// The `.ron` configuration file could not be used
    #[error("bad config file '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

//! Error types for the versus server.
//!
//! Nothing in here is fatal to the process. The dispatcher turns every
//! per-frame error into a log line and keeps the connection open; only socket
//! failures end a connection.

use crate::connection::ConnectionId;
use thiserror::Error;

/// Errors surfaced by the server core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Socket creation, binding, accepting, reading or writing failed.
    #[error("Network error: {0}")]
    Network(String),

    /// The id does not resolve to a live connection (never issued, or the
    /// slot has since been freed and reused).
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// The live connection limit has been reached.
    #[error("Server full: {0} connections already live")]
    ServerFull(usize),

    /// A relay or neighbor write was attempted before pairing completed.
    #[error("Connection is not paired")]
    NotPaired,

    /// The bound neighbor has disconnected.
    #[error("Peer {0} has left")]
    PeerLeft(ConnectionId),

    /// A request payload could not be interpreted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else that should never happen.
    #[error("Internal error: {0}")]
    Internal(String),
}

//! Client connection representation.
//!
//! This module defines what the registry keeps about each live connection.
//! Game state lives in the connection's own [`Session`](super::Session); the
//! registry only holds what other connections need to reach it.

use super::session::ConnectionEvent;
use std::net::SocketAddr;
use std::time::SystemTime;
use tokio::sync::mpsc::UnboundedSender;

/// Registry entry for a live client connection.
///
/// # Fields
///
/// * `serial` - Process-wide connection number, strictly increasing
/// * `remote_addr` - The network address of the connected client
/// * `connected_at` - Timestamp when the connection was established
/// * `events` - Inbox of the task that owns the socket
#[derive(Debug)]
pub struct ClientConnection {
    pub serial: u64,
    pub remote_addr: SocketAddr,
    pub connected_at: SystemTime,
    pub events: UnboundedSender<ConnectionEvent>,
}

impl ClientConnection {
    /// Creates a registry entry stamped with the current time.
    pub fn new(serial: u64, remote_addr: SocketAddr, events: UnboundedSender<ConnectionEvent>) -> Self {
        Self {
            serial,
            remote_addr,
            connected_at: SystemTime::now(),
            events,
        }
    }
}

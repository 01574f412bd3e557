//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the versus server behavior.

use std::net::SocketAddr;

/// Protocol version token clients must present in their handshake frame.
pub const DEFAULT_PROTOCOL_VERSION: &str = "003";

/// Port the reference deployment listens on.
pub const DEFAULT_PORT: u16 = 49569;

/// Configuration structure for the versus server.
///
/// Contains the network settings, the handshake version token and the
/// limits that govern each connection.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Three-character version token expected in `H` frames
    pub protocol_version: String,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Size of the per-connection socket read buffer in bytes
    pub read_buffer_size: usize,

    /// Base seed for per-connection random streams.
    ///
    /// `None` seeds every connection from OS entropy. `Some(seed)` gives
    /// connection number `n` the stream `seed + n`, which makes a session
    /// reproducible when debugging client desyncs.
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            max_connections: 1000,
            read_buffer_size: 4096,
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.port(), 49569);
        assert!(config.bind_address.ip().is_unspecified());
        assert_eq!(config.protocol_version, "003");
        assert_eq!(config.max_connections, 1000);
        assert!(config.read_buffer_size > 0);
        assert!(config.rng_seed.is_none());
    }
}

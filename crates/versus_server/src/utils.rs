//! Convenience constructors for [`GameServer`].

use crate::{config::ServerConfig, server::GameServer};

/// Creates a server with the default configuration.
///
/// Listens on all interfaces on port 49569 and expects protocol version
/// `"003"`.
pub fn create_server() -> GameServer {
    create_server_with_config(ServerConfig::default())
}

/// Creates a server with a custom configuration.
pub fn create_server_with_config(config: ServerConfig) -> GameServer {
    GameServer::new(config)
}

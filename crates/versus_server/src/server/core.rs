//! Core versus server implementation.
//!
//! This module contains the main `GameServer` struct: it owns the
//! configuration, the connection registry and the shutdown channel, binds
//! the listening socket and runs the accept loop.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    messaging::Dispatcher,
    server::handlers::{handle_connection, ConnectionSettings},
};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Pending connection backlog requested from the OS.
const LISTEN_BACKLOG: i32 = 1024;

/// The core versus server structure.
///
/// `GameServer` accepts TCP connections and gives each its own task. All
/// matchmaking and relay state lives in the shared [`ConnectionManager`];
/// all per-game state lives in the connection tasks.
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Registry of live connections and the waiting slot
    connection_manager: Arc<ConnectionManager>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a new versus server with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration parameters for server behavior
    ///
    /// # Returns
    ///
    /// A new `GameServer` instance ready to be started.
    pub fn new(config: ServerConfig) -> Self {
        let connection_manager = Arc::new(ConnectionManager::new(config.max_connections));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            connection_manager,
            shutdown_sender,
        }
    }

    /// Binds the configured address and starts serving until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Creates the listening socket.
    ///
    /// The socket is built through `socket2` so `SO_REUSEADDR` and the
    /// backlog can be set before it is handed to tokio.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        if let Err(e) = socket.set_reuse_address(true) {
            warn!("Failed to set SO_REUSEADDR: {}", e);
        }

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(LISTEN_BACKLOG)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking: {e}")))?;

        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;
        info!("✅ Listener bound on {}", local_addr_or(&listener, address));
        Ok(listener)
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// Returns once [`shutdown`](Self::shutdown) is called. Connection tasks
    /// receive the same signal and close their sockets.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!(
            "🚀 Versus server listening on {} (protocol {})",
            local_addr_or(&listener, self.config.bind_address),
            self.config.protocol_version
        );

        let dispatcher = Dispatcher::new(
            self.connection_manager.clone(),
            self.config.protocol_version.clone(),
        );
        let settings = ConnectionSettings {
            read_buffer_size: self.config.read_buffer_size,
            rng_seed: self.config.rng_seed,
        };
        let mut shutdown_receiver = self.shutdown_sender.subscribe();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let connection_manager = self.connection_manager.clone();
                        let dispatcher = dispatcher.clone();
                        let shutdown = self.shutdown_sender.subscribe();

                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(
                                stream,
                                addr,
                                connection_manager,
                                dispatcher,
                                settings,
                                shutdown,
                            )
                            .await
                            {
                                error!("Connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                },
                _ = shutdown_receiver.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// Signals the accept loop and every connection task to stop.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Gets the connection registry shared with the connection tasks.
    pub fn connection_manager(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }
}

fn local_addr_or(listener: &TcpListener, fallback: SocketAddr) -> SocketAddr {
    listener.local_addr().unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = GameServer::new(ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        });
        let listener = server.bind().unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_serve() {
        let server = Arc::new(GameServer::new(ServerConfig {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        }));
        let listener = server.bind().unwrap();

        let running = tokio::spawn({
            let server = server.clone();
            async move { server.serve(listener).await }
        });
        tokio::task::yield_now().await;

        // The accept loop subscribes when it starts; retry until it has.
        for _ in 0..100 {
            server.shutdown().await.unwrap();
            if running.is_finished() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(running.await.unwrap().is_ok());
    }
}

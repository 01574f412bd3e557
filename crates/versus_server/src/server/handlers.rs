//! Per-connection task.
//!
//! Every accepted socket is served by one [`handle_connection`] task, which
//! is the only code that ever reads or writes that socket. It waits on three
//! things at once, in priority order: the shutdown signal, its event inbox,
//! and the socket. Draining the inbox first means events another connection
//! queued (pairing, opening rows, replies) are applied before any further
//! client bytes are looked at.

use crate::connection::{ConnectionManager, Session};
use crate::error::ServerError;
use crate::messaging::{Dispatcher, FrameDecoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Per-connection settings copied out of the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_buffer_size: usize,
    pub rng_seed: Option<u64>,
}

/// Serves one client connection until it closes or the server shuts down.
///
/// # Arguments
///
/// * `stream` - The accepted TCP stream
/// * `remote_addr` - The client's network address
/// * `connection_manager` - Registry the connection joins for its lifetime
/// * `dispatcher` - Handles decoded frames
/// * `settings` - Buffer size and seeding for this connection
/// * `shutdown` - Server-wide shutdown signal
///
/// # Returns
///
/// `Ok(())` when the client closed the connection or the server stopped, or
/// a `ServerError` if the connection was refused or its socket failed.
pub async fn handle_connection(
    stream: TcpStream,
    remote_addr: SocketAddr,
    connection_manager: Arc<ConnectionManager>,
    dispatcher: Dispatcher,
    settings: ConnectionSettings,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), ServerError> {
    let registration = connection_manager.connect(remote_addr).await?;
    let id = registration.id;
    let mut events = registration.events;
    let mut session = match settings.rng_seed {
        Some(seed) => Session::with_seed(id, seed.wrapping_add(registration.serial)),
        None => Session::from_entropy(id),
    };
    info!("🔗 Connection {} established from {}", id, remote_addr);

    let (mut reader, mut writer) = stream.into_split();
    let mut decoder = FrameDecoder::new();
    let mut buffer = vec![0u8; settings.read_buffer_size.max(1)];

    let result = loop {
        tokio::select! {
            biased;

            _ = shutdown.recv() => {
                debug!("Connection {} closing for shutdown", id);
                break Ok(());
            }

            Some(event) = events.recv() => {
                if let Some(frame) = session.apply(event) {
                    if let Err(e) = writer.write_all(&frame.encode()).await {
                        break Err(ServerError::Network(format!("write failed: {e}")));
                    }
                }
            }

            read = reader.read(&mut buffer) => match read {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    for frame in decoder.feed(&buffer[..n]) {
                        dispatcher.route(&mut session, frame).await;
                    }
                }
                Err(e) => break Err(ServerError::Network(format!("read failed: {e}"))),
            },
        }
    };

    // Refuse new events, then settle any that were already queued so a
    // pairing that raced this disconnect still learns its neighbor.
    events.close();
    while let Ok(event) = events.try_recv() {
        session.apply(event);
    }
    let neighbor = session.pairing().neighbor().ok();
    connection_manager.disconnect(id, neighbor).await;

    info!("👋 Connection {} from {} closed", id, remote_addr);
    result
}

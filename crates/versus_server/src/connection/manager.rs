//! Connection registry and matchmaking slot.
//!
//! Live connections sit in a slot arena addressed by [`ConnectionId`]. The
//! single waiting slot shares the registry lock, so a handshake taking the
//! waiting connection and a disconnect clearing it can never interleave.

use super::client::ClientConnection;
use super::pairing::PairOutcome;
use super::session::ConnectionEvent;
use super::ConnectionId;
use crate::error::ServerError;
use crate::messaging::ServerFrame;
use std::net::SocketAddr;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    client: Option<ClientConnection>,
}

#[derive(Debug, Default)]
struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    waiting: Option<ConnectionId>,
    next_serial: u64,
}

impl Registry {
    fn get(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.client.as_ref())
    }
}

/// What a freshly accepted connection needs to run.
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    pub serial: u64,
    pub events: UnboundedReceiver<ConnectionEvent>,
}

/// Manages all active client connections.
///
/// The `ConnectionManager` hands out connection ids, owns the waiting slot
/// and carries events between connection tasks. It never touches a socket;
/// each connection's task drains its own inbox and writes its own stream.
#[derive(Debug)]
pub struct ConnectionManager {
    registry: RwLock<Registry>,
    max_connections: usize,
}

impl ConnectionManager {
    /// Creates a manager accepting at most `max_connections` live connections.
    pub fn new(max_connections: usize) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            max_connections,
        }
    }

    /// Registers a new connection.
    ///
    /// # Arguments
    ///
    /// * `remote_addr` - The client's network address
    ///
    /// # Returns
    ///
    /// The new id and the receiving end of the connection's inbox, or
    /// `ServerError::ServerFull` when the limit has been reached.
    pub async fn connect(&self, remote_addr: SocketAddr) -> Result<Registration, ServerError> {
        let mut registry = self.registry.write().await;
        if registry.live >= self.max_connections {
            return Err(ServerError::ServerFull(registry.live));
        }

        let serial = registry.next_serial;
        registry.next_serial += 1;

        let (sender, events) = mpsc::unbounded_channel();
        let client = ClientConnection::new(serial, remote_addr, sender);

        let id = match registry.free.pop() {
            Some(index) => {
                let slot = &mut registry.slots[index as usize];
                slot.client = Some(client);
                ConnectionId::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(registry.slots.len())
                    .map_err(|_| ServerError::Internal("connection slots exhausted".to_string()))?;
                registry.slots.push(Slot {
                    generation: 0,
                    client: Some(client),
                });
                ConnectionId::new(index, 0)
            }
        };
        registry.live += 1;

        debug!("Registered connection {} (serial {}) from {}", id, serial, remote_addr);
        Ok(Registration { id, serial, events })
    }

    /// Removes a connection and tells its neighbor, if any, that it left.
    ///
    /// Returns `false` when the id was already stale.
    pub async fn disconnect(&self, id: ConnectionId, neighbor: Option<ConnectionId>) -> bool {
        let mut registry = self.registry.write().await;
        let Some(slot) = registry
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation() && slot.client.is_some())
        else {
            return false;
        };

        let client = slot.client.take();
        slot.generation = slot.generation.wrapping_add(1);
        registry.free.push(id.index());
        registry.live -= 1;

        if let Some(client) = client {
            debug!(
                "Unregistered connection {} (serial {}) from {} after {:?}",
                id,
                client.serial,
                client.remote_addr,
                client.connected_at.elapsed().unwrap_or_default()
            );
        }

        if registry.waiting == Some(id) {
            debug!("Connection {} left the waiting slot", id);
            registry.waiting = None;
        }

        if let Some(neighbor) = neighbor {
            if let Some(client) = registry.get(neighbor) {
                let _ = client.events.send(ConnectionEvent::PeerLeft { neighbor: id });
            }
        }
        true
    }

    /// Runs the matchmaking step for a connection that sent a valid handshake.
    ///
    /// An empty slot takes the caller. A slot holding someone else is
    /// emptied and that connection is returned as the caller's neighbor; it
    /// is sent [`ConnectionEvent::Paired`] before the lock is released, so
    /// it learns its neighbor before any frame from the caller can reach it.
    pub async fn try_pair(&self, id: ConnectionId) -> Result<PairOutcome, ServerError> {
        let mut registry = self.registry.write().await;
        if registry.get(id).is_none() {
            return Err(ServerError::ConnectionNotFound(id));
        }

        match registry.waiting {
            Some(waiting) if waiting == id => Ok(PairOutcome::AlreadyWaiting),
            Some(waiting) => {
                let notified = registry
                    .get(waiting)
                    .is_some_and(|client| {
                        client
                            .events
                            .send(ConnectionEvent::Paired { neighbor: id })
                            .is_ok()
                    });
                if !notified {
                    warn!("Waiting connection {} is gone, {} takes the slot", waiting, id);
                    registry.waiting = Some(id);
                    return Ok(PairOutcome::Waiting);
                }
                registry.waiting = None;
                info!("🎮 Paired connections {} and {}", waiting, id);
                Ok(PairOutcome::Paired(waiting))
            }
            None => {
                registry.waiting = Some(id);
                Ok(PairOutcome::Waiting)
            }
        }
    }

    /// The connection currently parked in the waiting slot.
    pub async fn waiting(&self) -> Option<ConnectionId> {
        self.registry.read().await.waiting
    }

    /// Queues an event on a connection's inbox.
    pub async fn send(&self, id: ConnectionId, event: ConnectionEvent) -> Result<(), ServerError> {
        let registry = self.registry.read().await;
        let client = registry
            .get(id)
            .ok_or(ServerError::ConnectionNotFound(id))?;
        client
            .events
            .send(event)
            .map_err(|_| ServerError::Network(format!("connection {id} is closing")))
    }

    /// Queues a frame to be written to a connection's socket.
    pub async fn deliver(&self, id: ConnectionId, frame: ServerFrame) -> Result<(), ServerError> {
        self.send(id, ConnectionEvent::Deliver(frame)).await
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.live
    }
}

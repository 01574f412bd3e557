//! Message routing for decoded client frames.
//!
//! The [`Dispatcher`] maps each frame tag to its handler: handshakes go to
//! matchmaking, panel and garbage requests to the generators, and input or
//! loss events are relayed to the neighbor untouched. Replies never hit a
//! socket directly; they are queued on the target connection's inbox.

use super::types::{Frame, FrameTag, ServerFrame};
use crate::connection::{
    ConnectionEvent, ConnectionId, ConnectionManager, PairOutcome, PairingState, Session,
};
use crate::error::ServerError;
use crate::generation::{encode_cells, StackRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes frames from one connection to the handlers that answer them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    connections: Arc<ConnectionManager>,
    protocol_version: String,
}

impl Dispatcher {
    /// Creates a dispatcher accepting handshakes for `protocol_version`.
    pub fn new(connections: Arc<ConnectionManager>, protocol_version: impl Into<String>) -> Self {
        Self {
            connections,
            protocol_version: protocol_version.into(),
        }
    }

    /// Handles one frame from `session`'s connection.
    ///
    /// Failures are logged and swallowed: a bad frame never closes the
    /// connection it arrived on.
    ///
    /// # Arguments
    ///
    /// * `session` - State of the connection the frame arrived on
    /// * `frame` - The decoded frame
    pub async fn route(&self, session: &mut Session, frame: Frame) {
        let id = session.id();
        debug!("📨 Routing '{}' frame from connection {}", frame.tag, id);

        let result = match frame.tag {
            FrameTag::Handshake => self.handshake(session, &frame.payload).await,
            FrameTag::PanelRequest => self.panels(session, &frame.payload).await,
            FrameTag::GarbageRequest => self.garbage(session, &frame.payload).await,
            FrameTag::Input => self.relay(session, &frame, ServerFrame::Input).await,
            FrameTag::Loss => self.relay(session, &frame, ServerFrame::Loss).await,
        };

        match result {
            Ok(()) => {}
            Err(error @ (ServerError::NotPaired | ServerError::PeerLeft(_))) => {
                debug!("Dropped '{}' frame from connection {}: {}", frame.tag, id, error);
            }
            Err(error) => {
                warn!("⚠️ Failed to handle '{}' frame from connection {}: {}", frame.tag, id, error);
            }
        }
    }

    async fn handshake(&self, session: &mut Session, version: &[u8]) -> Result<(), ServerError> {
        let id = session.id();
        if version != self.protocol_version.as_bytes() {
            info!(
                "❌ Connection {} offered protocol version {:?}, expected {:?}",
                id,
                String::from_utf8_lossy(version),
                self.protocol_version
            );
            return self.connections.deliver(id, ServerFrame::Rejected).await;
        }
        match session.pairing() {
            PairingState::Idle => {}
            // Either still parked or already taken by a partner whose
            // pairing event is queued; the slot must not be touched again.
            PairingState::Waiting => {
                return self.connections.deliver(id, ServerFrame::Waiting).await;
            }
            PairingState::Paired(_) | PairingState::PeerLeft(_) => {
                info!("❌ Connection {} handshook again after pairing", id);
                return self.connections.deliver(id, ServerFrame::Rejected).await;
            }
        }

        match self.connections.try_pair(id).await? {
            PairOutcome::Waiting => {
                info!("⏳ Connection {} is waiting for an opponent", id);
                session.begin_waiting();
                self.connections.deliver(id, ServerFrame::Waiting).await
            }
            PairOutcome::AlreadyWaiting => self.connections.deliver(id, ServerFrame::Waiting).await,
            PairOutcome::Paired(neighbor) => {
                session.bind(neighbor);
                self.notify(neighbor, ConnectionEvent::Deliver(ServerFrame::Paired))
                    .await;
                self.connections.deliver(id, ServerFrame::Paired).await
            }
        }
    }

    async fn panels(&self, session: &mut Session, payload: &[u8]) -> Result<(), ServerError> {
        let Some(request) = StackRequest::parse(payload)? else {
            debug!("Ignoring panel request below two colors from {}", session.id());
            return Ok(());
        };

        let batch = session.generate_panels(&request)?;
        let encoded = encode_cells(&batch.cells);
        self.connections
            .deliver(session.id(), ServerFrame::Panels(encoded.clone()))
            .await?;

        let neighbor = session.pairing().neighbor()?;
        if let Some(opening_rows) = batch.opening_rows {
            self.notify(neighbor, ConnectionEvent::OpeningRows(opening_rows))
                .await;
        }
        self.notify(neighbor, ConnectionEvent::Deliver(ServerFrame::OpponentPanels(encoded)))
            .await;
        Ok(())
    }

    async fn garbage(&self, session: &mut Session, payload: &[u8]) -> Result<(), ServerError> {
        let Some(request) = StackRequest::parse(payload)? else {
            debug!("Ignoring garbage request below two colors from {}", session.id());
            return Ok(());
        };

        let encoded = session.generate_garbage(&request)?;
        self.connections
            .deliver(session.id(), ServerFrame::Garbage(encoded.clone()))
            .await?;

        let neighbor = session.pairing().neighbor()?;
        self.notify(neighbor, ConnectionEvent::Deliver(ServerFrame::IncomingGarbage(encoded)))
            .await;
        Ok(())
    }

    async fn relay(
        &self,
        session: &Session,
        frame: &Frame,
        retag: fn(u8) -> ServerFrame,
    ) -> Result<(), ServerError> {
        let neighbor = session.pairing().neighbor()?;
        let byte = frame
            .payload
            .first()
            .copied()
            .ok_or_else(|| ServerError::InvalidRequest(format!("empty '{}' frame", frame.tag)))?;
        self.connections.deliver(neighbor, retag(byte)).await
    }

    /// Best-effort write to the neighbor; a neighbor that is already gone
    /// will hear nothing more anyway.
    async fn notify(&self, neighbor: ConnectionId, event: ConnectionEvent) {
        if let Err(error) = self.connections.send(neighbor, event).await {
            debug!("Could not reach neighbor {}: {}", neighbor, error);
        }
    }
}

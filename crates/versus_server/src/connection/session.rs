//! Per-connection game state and the events that reach it.
//!
//! A [`Session`] is owned by the task serving its socket and is never shared.
//! Other connections influence it only by sending a [`ConnectionEvent`]
//! through the [`ConnectionManager`](super::ConnectionManager); the task
//! applies events between reads, so a session is mutated by one task only.

use super::pairing::PairingState;
use super::ConnectionId;
use crate::error::ServerError;
use crate::generation::{generate_garbage, OpeningRows, PanelBatch, PanelGenerator, StackRequest};
use crate::messaging::ServerFrame;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Messages delivered to a connection's task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Write this frame to the socket
    Deliver(ServerFrame),
    /// Another connection took this one out of the waiting slot
    Paired { neighbor: ConnectionId },
    /// The neighbor cut a fresh board; reuse it on the next reset request
    OpeningRows(OpeningRows),
    /// The neighbor disconnected
    PeerLeft { neighbor: ConnectionId },
}

/// Game-side state of one connection.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    pairing: PairingState,
    generator: PanelGenerator,
    opening_rows: Option<OpeningRows>,
    rng: ChaCha8Rng,
}

impl Session {
    /// Creates a session drawing from `rng`.
    pub fn new(id: ConnectionId, mut rng: ChaCha8Rng) -> Self {
        let generator = PanelGenerator::new(&mut rng);
        Self {
            id,
            pairing: PairingState::Idle,
            generator,
            opening_rows: None,
            rng,
        }
    }

    /// Creates a session whose random stream depends only on `seed`.
    pub fn with_seed(id: ConnectionId, seed: u64) -> Self {
        Self::new(id, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Creates a session seeded from OS entropy.
    pub fn from_entropy(id: ConnectionId) -> Self {
        Self::new(id, ChaCha8Rng::from_entropy())
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn pairing(&self) -> PairingState {
        self.pairing
    }

    pub fn generator(&self) -> &PanelGenerator {
        &self.generator
    }

    /// The neighbor this session was ever bound to, live or not.
    pub fn bound_neighbor(&self) -> Option<ConnectionId> {
        match self.pairing {
            PairingState::Paired(neighbor) | PairingState::PeerLeft(neighbor) => Some(neighbor),
            PairingState::Idle | PairingState::Waiting => None,
        }
    }

    pub fn has_opening_rows(&self) -> bool {
        self.opening_rows.is_some()
    }

    pub(crate) fn begin_waiting(&mut self) {
        self.pairing = PairingState::Waiting;
    }

    pub(crate) fn bind(&mut self, neighbor: ConnectionId) {
        self.pairing = PairingState::Paired(neighbor);
    }

    /// Applies an event from another task.
    ///
    /// Returns the frame to write when the event is a delivery.
    pub fn apply(&mut self, event: ConnectionEvent) -> Option<ServerFrame> {
        match event {
            ConnectionEvent::Deliver(frame) => return Some(frame),
            ConnectionEvent::Paired { neighbor } => {
                if self.pairing == PairingState::Waiting {
                    info!("🤝 Connection {} paired with {}", self.id, neighbor);
                    self.bind(neighbor);
                } else {
                    debug!(
                        "Connection {} ignoring pairing with {} in state {:?}",
                        self.id, neighbor, self.pairing
                    );
                }
            }
            ConnectionEvent::OpeningRows(rows) => {
                debug!("Connection {} received opponent's opening layout", self.id);
                self.opening_rows = Some(rows);
            }
            ConnectionEvent::PeerLeft { neighbor } => {
                if self.pairing == PairingState::Paired(neighbor) {
                    info!("👋 Connection {} lost its opponent {}", self.id, neighbor);
                    self.pairing = PairingState::PeerLeft(neighbor);
                }
            }
        }
        None
    }

    /// Serves a panel request, consuming any cached opening layout when the
    /// request is a reset.
    pub fn generate_panels(&mut self, request: &StackRequest) -> Result<PanelBatch, ServerError> {
        let cached = if request.is_reset() {
            self.opening_rows.take()
        } else {
            None
        };
        self.generator.generate(&mut self.rng, request, cached)
    }

    /// Serves a garbage request and switches the session to versus mode.
    pub fn generate_garbage(&mut self, request: &StackRequest) -> Result<String, ServerError> {
        self.generator.enter_versus_mode();
        generate_garbage(&mut self.rng, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{ColorCount, RESET_ROW};

    fn reset_request(colors: u8) -> StackRequest {
        StackRequest {
            colors: ColorCount::new(colors).unwrap(),
            seed: RESET_ROW,
        }
    }

    fn session(index: u32) -> Session {
        Session::with_seed(ConnectionId::new(index, 0), u64::from(index))
    }

    #[test]
    fn test_deliver_returns_frame() {
        let mut s = session(0);
        assert_eq!(
            s.apply(ConnectionEvent::Deliver(ServerFrame::Paired)),
            Some(ServerFrame::Paired)
        );
    }

    #[test]
    fn test_paired_event_only_binds_waiting_session() {
        let neighbor = ConnectionId::new(9, 0);

        let mut idle = session(0);
        idle.apply(ConnectionEvent::Paired { neighbor });
        assert_eq!(idle.pairing(), PairingState::Idle);

        let mut waiting = session(1);
        waiting.begin_waiting();
        waiting.apply(ConnectionEvent::Paired { neighbor });
        assert_eq!(waiting.pairing(), PairingState::Paired(neighbor));
        assert_eq!(waiting.bound_neighbor(), Some(neighbor));
    }

    #[test]
    fn test_peer_left_only_for_bound_neighbor() {
        let neighbor = ConnectionId::new(4, 0);
        let stranger = ConnectionId::new(5, 0);
        let mut s = session(0);
        s.bind(neighbor);

        s.apply(ConnectionEvent::PeerLeft { neighbor: stranger });
        assert_eq!(s.pairing(), PairingState::Paired(neighbor));

        s.apply(ConnectionEvent::PeerLeft { neighbor });
        assert_eq!(s.pairing(), PairingState::PeerLeft(neighbor));
        assert_eq!(s.bound_neighbor(), Some(neighbor));
    }

    #[test]
    fn test_opening_rows_consumed_by_reset() {
        let mut cutter = session(1);
        let opening = cutter
            .generate_panels(&reset_request(5))
            .unwrap()
            .opening_rows
            .unwrap();

        let mut s = session(2);
        s.apply(ConnectionEvent::OpeningRows(opening.clone()));
        assert!(s.has_opening_rows());

        let batch = s.generate_panels(&reset_request(5)).unwrap();
        assert!(batch.opening_rows.is_none());
        assert_eq!(&batch.cells[..42], &opening.cells()[6..]);
        assert!(!s.has_opening_rows());

        // Nothing cached any more, so the next reset cuts.
        let batch = s.generate_panels(&reset_request(5)).unwrap();
        assert!(batch.opening_rows.is_some());
    }

    #[test]
    fn test_garbage_enters_versus_mode() {
        let mut s = session(0);
        assert!(!s.generator().versus_mode());
        let encoded = s.generate_garbage(&reset_request(3)).unwrap();
        assert_eq!(encoded.len(), 120);
        assert!(s.generator().versus_mode());
    }
}

//! Matchmaking states.
//!
//! A connection moves `Idle -> Waiting -> Paired`, or straight from `Idle` to
//! `Paired` when someone is already waiting. `Paired` lasts until either side
//! disconnects; the survivor then sits in `PeerLeft`. The neighbor link is
//! never reassigned.

use super::ConnectionId;
use crate::error::ServerError;

/// Pairing state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingState {
    /// No valid handshake yet
    #[default]
    Idle,
    /// Parked in the waiting slot
    Waiting,
    /// Bound to a neighbor
    Paired(ConnectionId),
    /// The neighbor disconnected
    PeerLeft(ConnectionId),
}

impl PairingState {
    /// The live neighbor, or why there is none.
    pub fn neighbor(&self) -> Result<ConnectionId, ServerError> {
        match *self {
            Self::Paired(neighbor) => Ok(neighbor),
            Self::PeerLeft(neighbor) => Err(ServerError::PeerLeft(neighbor)),
            Self::Idle | Self::Waiting => Err(ServerError::NotPaired),
        }
    }

    /// Whether a neighbor link was ever established.
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Paired(_) | Self::PeerLeft(_))
    }
}

/// What the waiting slot decided for a valid handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// The slot was empty and now holds the handshaking connection
    Waiting,
    /// The handshaking connection already occupies the slot
    AlreadyWaiting,
    /// The slot's occupant was taken out and bound to the handshaker
    Paired(ConnectionId),
}

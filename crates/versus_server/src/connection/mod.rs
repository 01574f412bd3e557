//! Connection management for client connections.
//!
//! This module handles the lifecycle of client connections: registration in
//! the [`ConnectionManager`], the single waiting slot used for matchmaking,
//! the per-connection [`Session`] state, and the events connections send one
//! another once paired.

pub mod client;
pub mod manager;
pub mod pairing;
pub mod session;

pub use manager::{ConnectionManager, Registration};
pub use pairing::{PairOutcome, PairingState};
pub use session::{ConnectionEvent, Session};

use std::fmt;

/// Identifier for a connection slot in the [`ConnectionManager`].
///
/// The index addresses a slot; the generation is bumped every time the slot
/// is freed, so an id held past its connection's lifetime never resolves to
/// whoever occupies the slot next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    index: u32,
    generation: u32,
}

impl ConnectionId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

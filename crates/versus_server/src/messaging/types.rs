//! Wire vocabulary for client-server communication.
//!
//! Every unit on the wire is a frame: one ASCII tag byte followed by a payload
//! whose length is fixed by the tag. Client frames have the lengths listed in
//! [`FrameTag::frame_len`]; server frames carry either nothing, a single
//! relayed byte, or a digit string of generated board cells.

use std::fmt;

/// Tags a client may send, each with a fixed total frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTag {
    /// `H` + 3-char protocol version
    Handshake,
    /// `P` + 1-char color count + 6-char seed row
    PanelRequest,
    /// `I` + 1 opaque input byte
    Input,
    /// `L` + 1 opaque loss byte
    Loss,
    /// `Q` + 1-char color count + 6-char seed row
    GarbageRequest,
}

impl FrameTag {
    /// Maps a tag byte to its frame kind, `None` for unknown bytes.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'H' => Some(Self::Handshake),
            b'P' => Some(Self::PanelRequest),
            b'I' => Some(Self::Input),
            b'L' => Some(Self::Loss),
            b'Q' => Some(Self::GarbageRequest),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Handshake => b'H',
            Self::PanelRequest => b'P',
            Self::Input => b'I',
            Self::Loss => b'L',
            Self::GarbageRequest => b'Q',
        }
    }

    /// Total frame length including the tag byte.
    pub fn frame_len(self) -> usize {
        match self {
            Self::Handshake => 4,
            Self::PanelRequest | Self::GarbageRequest => 8,
            Self::Input | Self::Loss => 2,
        }
    }

    /// Payload length, i.e. the frame length minus the tag byte.
    pub fn payload_len(self) -> usize {
        self.frame_len() - 1
    }
}

impl fmt::Display for FrameTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

/// A complete client frame with the tag byte stripped from its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub tag: FrameTag,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(tag: FrameTag, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }
}

/// Frames the server writes to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// `N` — handshake rejected
    Rejected,
    /// `H` — handshake accepted, waiting for an opponent
    Waiting,
    /// `G` — paired, sent to both sides
    Paired,
    /// `P` — the requester's own generated panel rows
    Panels(String),
    /// `O` — the opponent's generated panel rows
    OpponentPanels(String),
    /// `Q` — the requester's own generated garbage rows
    Garbage(String),
    /// `R` — garbage incoming from the opponent
    IncomingGarbage(String),
    /// `I` — relayed input event
    Input(u8),
    /// `L` — relayed loss event
    Loss(u8),
}

impl ServerFrame {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Rejected => b'N',
            Self::Waiting => b'H',
            Self::Paired => b'G',
            Self::Panels(_) => b'P',
            Self::OpponentPanels(_) => b'O',
            Self::Garbage(_) => b'Q',
            Self::IncomingGarbage(_) => b'R',
            Self::Input(_) => b'I',
            Self::Loss(_) => b'L',
        }
    }

    /// Serializes the frame to the bytes written on the socket.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.tag()];
        match self {
            Self::Rejected | Self::Waiting | Self::Paired => {}
            Self::Panels(cells)
            | Self::OpponentPanels(cells)
            | Self::Garbage(cells)
            | Self::IncomingGarbage(cells) => bytes.extend_from_slice(cells.as_bytes()),
            Self::Input(byte) | Self::Loss(byte) => bytes.push(*byte),
        }
        bytes
    }
}

//! Wire protocol handling.
//!
//! Bytes read from a socket go through the [`FrameDecoder`], and each decoded
//! [`Frame`] is handed to the [`Dispatcher`], which answers with
//! [`ServerFrame`]s for the sender and its neighbor.

pub mod decoder;
pub mod router;
pub mod types;

pub use decoder::FrameDecoder;
pub use router::Dispatcher;
pub use types::{Frame, FrameTag, ServerFrame};

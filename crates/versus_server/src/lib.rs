//! # Versus Server - Two-Player Matchmaking and Relay
//!
//! A TCP server for a falling-block puzzle game. It pairs incoming
//! connections two at a time, generates the panel and garbage stacks each
//! client needs to keep its board in step with its opponent's, and relays
//! input and loss events between the two players of a pair.
//!
//! ## Message Flow
//!
//! 1. Bytes read from a socket are reassembled into frames by the
//!    [`FrameDecoder`](messaging::FrameDecoder)
//! 2. Each frame is routed by the [`Dispatcher`](messaging::Dispatcher)
//! 3. Handshakes go through matchmaking, stack requests through the
//!    generators, and input or loss events straight to the neighbor
//! 4. Replies are queued on the target connection's inbox and written by the
//!    task that owns that socket
//!
//! ## Wire Format
//!
//! Every frame is one ASCII tag byte followed by a fixed-length payload:
//!
//! | Tag | Length | Payload |
//! |-----|--------|---------|
//! | `H` | 4 | protocol version |
//! | `P` | 8 | color count + seed row |
//! | `I` | 2 | opaque input event |
//! | `L` | 2 | opaque loss event |
//! | `Q` | 8 | color count + seed row |
//!
//! The server answers with `N`, `H`, `G`, `P`, `O`, `Q`, `R`, `I` and `L`
//! frames; see [`ServerFrame`](messaging::ServerFrame).
//!
//! ## Concurrency
//!
//! Each connection is served by one task that alone reads and writes its
//! socket and owns its [`Session`](connection::Session). The only shared
//! state is the [`ConnectionManager`](connection::ConnectionManager)
//! registry, which also holds the single waiting slot. Connections affect
//! each other only by queuing [`ConnectionEvent`](connection::ConnectionEvent)s.
//!
//! ## Error Handling
//!
//! Per-frame failures ([`ServerError`]) are logged and never close the
//! connection. Only socket failures end a connection, and nothing ends the
//! process.

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::GameServer;
pub use utils::{create_server, create_server_with_config};

pub mod config;
pub mod connection;
pub mod error;
pub mod generation;
pub mod messaging;
pub mod server;
pub mod utils;

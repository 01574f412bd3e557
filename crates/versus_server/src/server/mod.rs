//! Server core: listening socket, accept loop and connection tasks.

pub mod core;
pub mod handlers;

pub use self::core::GameServer;
pub use self::handlers::{handle_connection, ConnectionSettings};

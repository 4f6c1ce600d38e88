//! Fairway lobby client.
//!
//! Keeps a local read model of the server's lobby broadcasts and turns
//! user intent into request packets. Nothing here mutates lobby state
//! directly; the server's echo is what updates the mirror.

pub mod connection;
pub mod listener;
pub mod mirror;

pub use connection::{ClientConnection, ClientError, ClientTransport};
pub use listener::{ListenerId, ListenerRegistry, LobbyListener};
pub use mirror::{LobbyMirror, LocalProfile, MirrorEvent};

//! Fairway Lobby Server
//!
//! Authoritative lobby coordinator using Renet for networking.
//! Keeps the room configuration and roster of up to 8 connections in sync,
//! runs the ambient weather director once play starts and relays voice
//! frames on a separate transport.

pub mod config;
pub mod lobby;
pub mod loopback;
pub mod server;
pub mod session;
pub mod side_channel;
pub mod transport;
pub mod voice;
pub mod weather;

pub use config::{ConfigError, ServerConfig, WeatherConfig};
pub use lobby::{LobbyCoordinator, LobbyLimits, LobbyState};
pub use loopback::{LoopbackTransport, Outbound};
pub use server::{Server, NET_FRAME};
pub use session::{ConnectionSlot, SessionState};
pub use side_channel::{LobbyStatus, NullSideChannel, SideChannel, SideChannelError};
pub use transport::{RenetHost, Transport, TransportConfig, TransportError, TransportEvent};
pub use voice::VoiceRelay;
pub use weather::WeatherDirector;

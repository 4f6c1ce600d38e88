//! Fairway lobby protocol.
//!
//! Shared between the authoritative lobby server and client mirrors:
//! packet ids, the binary wire codec, roster records, room configuration
//! and the renet channel layout.

pub mod channels;
pub mod consts;
pub mod ids;
pub mod packet;
pub mod roster;
pub mod session;
pub mod voice;
pub mod wire;

pub use channels::*;
pub use consts::*;
pub use ids::{ConnectionId, PeerId, VoiceChannelId};
pub use packet::{
    Authority, Delivery, Packet, PacketId, RefusalReason, ServerCommand, ServerCommandKind,
};
pub use roster::{PlayerSlot, RosterEntry, PLAYER_SLOT_SIZE, ROSTER_HEADER_SIZE};
pub use session::{
    GimmeRadius, GroupMode, HoleCount, ScoreType, SessionConfig, StateId, WeatherType,
};
pub use voice::VoicePacket;
pub use wire::{WireError, WireReader, WireWriter};

//! Lobby packets.
//!
//! Each packet is `[id: u8][payload]`. Payloads have a fixed size per id,
//! except roster entries and the course name which are validated against
//! their own length fields. A packet that fails validation is rejected
//! whole.

use crate::channels::channel_id;
use crate::roster::RosterEntry;
use crate::session::{wire_enum, GimmeRadius, GroupMode, HoleCount, ScoreType, StateId, WeatherType};
use crate::wire::{WireError, WireReader, WireWriter};
use crate::{ConnectionId, MAX_CLUB_LEVEL, MAX_PLAYERS_PER_CONNECTION};

/// Numeric packet ids
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PacketId {
    ConnectionAccepted = 0,
    ConnectionRefused = 1,
    ClientConnected = 2,
    ClientDisconnected = 3,
    PlayerInfo = 4,
    LobbyUpdate = 5,
    LobbyReady = 6,
    MapInfo = 7,
    ScoreType = 8,
    GimmeRadius = 9,
    HoleCount = 10,
    ReverseCourse = 11,
    ClubLimit = 12,
    NightTime = 13,
    WeatherType = 14,
    RandomWind = 15,
    WindStrength = 16,
    TeamMode = 17,
    GroupMode = 18,
    FastCpu = 19,
    ClubLevel = 20,
    MaxClubs = 21,
    RequestGameStart = 22,
    StateChange = 23,
    ServerCommand = 24,
    Poke = 25,
    WeatherChange = 26,
    ClientVersion = 27,
    PingTime = 28,
}

/// Delivery guarantee requested from the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Reliable,
    Unreliable,
}

/// Who may send a packet to the server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// Applied only when sent by the host connection
    HostOnly,
    /// Any accepted connection
    AnyPeer,
    /// Server to client only, dropped if a client sends it
    ServerOnly,
}

/// Expected payload size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadSize {
    Fixed(usize),
    Variable,
}

impl PacketId {
    pub const ALL: [PacketId; 29] = [
        Self::ConnectionAccepted,
        Self::ConnectionRefused,
        Self::ClientConnected,
        Self::ClientDisconnected,
        Self::PlayerInfo,
        Self::LobbyUpdate,
        Self::LobbyReady,
        Self::MapInfo,
        Self::ScoreType,
        Self::GimmeRadius,
        Self::HoleCount,
        Self::ReverseCourse,
        Self::ClubLimit,
        Self::NightTime,
        Self::WeatherType,
        Self::RandomWind,
        Self::WindStrength,
        Self::TeamMode,
        Self::GroupMode,
        Self::FastCpu,
        Self::ClubLevel,
        Self::MaxClubs,
        Self::RequestGameStart,
        Self::StateChange,
        Self::ServerCommand,
        Self::Poke,
        Self::WeatherChange,
        Self::ClientVersion,
        Self::PingTime,
    ];

    /// Room configuration fields, in broadcast order.
    pub const CONFIG: [PacketId; 13] = [
        Self::MapInfo,
        Self::ScoreType,
        Self::GimmeRadius,
        Self::HoleCount,
        Self::ReverseCourse,
        Self::ClubLimit,
        Self::NightTime,
        Self::WeatherType,
        Self::RandomWind,
        Self::WindStrength,
        Self::TeamMode,
        Self::GroupMode,
        Self::FastCpu,
    ];

    pub fn is_config(self) -> bool {
        Self::CONFIG.contains(&self)
    }

    pub fn payload_size(self) -> PayloadSize {
        match self {
            Self::PlayerInfo | Self::LobbyUpdate | Self::MapInfo => PayloadSize::Variable,
            Self::LobbyReady
            | Self::ClubLevel
            | Self::ServerCommand
            | Self::ClientVersion => PayloadSize::Fixed(2),
            Self::PingTime => PayloadSize::Fixed(3),
            _ => PayloadSize::Fixed(1),
        }
    }

    pub fn delivery(self) -> Delivery {
        match self {
            Self::PingTime => Delivery::Unreliable,
            _ => Delivery::Reliable,
        }
    }

    /// Roster and string traffic is kept off the general reliable channel.
    pub fn channel(self) -> u8 {
        match self {
            Self::PlayerInfo | Self::LobbyUpdate | Self::MapInfo => channel_id::STRINGS,
            _ => match self.delivery() {
                Delivery::Reliable => channel_id::RELIABLE,
                Delivery::Unreliable => channel_id::UNRELIABLE,
            },
        }
    }

    pub fn authority(self) -> Authority {
        match self {
            id if id.is_config() => Authority::HostOnly,
            Self::RequestGameStart | Self::ServerCommand => Authority::HostOnly,
            Self::PlayerInfo | Self::LobbyReady | Self::ClubLevel | Self::ClientVersion => {
                Authority::AnyPeer
            }
            _ => Authority::ServerOnly,
        }
    }
}

impl TryFrom<u8> for PacketId {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(WireError::UnknownPacket(value))
    }
}

wire_enum! {
    /// Reason sent with `ConnectionRefused`
    pub enum RefusalReason: "refusal reason" {
        ServerFull = 0,
        NotInLobby = 1,
        BadData = 2,
        VersionMismatch = 3,
        Kicked = 4,
    }
}

wire_enum! {
    pub enum ServerCommandKind: "server command" {
        Poke = 0,
        Kick = 1,
    }
}

/// Host-issued command targeting another connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerCommand {
    pub kind: ServerCommandKind,
    pub target: ConnectionId,
}

/// A decoded lobby packet
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    ConnectionAccepted(ConnectionId),
    ConnectionRefused(RefusalReason),
    ClientConnected(ConnectionId),
    ClientDisconnected(ConnectionId),
    /// Client's own roster submission
    PlayerInfo(RosterEntry),
    /// Server's view of one connection's roster
    LobbyUpdate(RosterEntry),
    LobbyReady { slot: ConnectionId, ready: bool },
    MapInfo(String),
    ScoreType(ScoreType),
    GimmeRadius(GimmeRadius),
    HoleCount(HoleCount),
    ReverseCourse(bool),
    ClubLimit(bool),
    NightTime(bool),
    WeatherType(WeatherType),
    RandomWind(bool),
    WindStrength(u8),
    TeamMode(bool),
    GroupMode(GroupMode),
    FastCpu(bool),
    ClubLevel { slot: ConnectionId, level: u8 },
    /// Effective club limit for the session
    MaxClubs(u8),
    RequestGameStart(StateId),
    StateChange(StateId),
    ServerCommand(ServerCommand),
    Poke(ConnectionId),
    /// Ambient weather flag, true while it is raining
    WeatherChange(bool),
    ClientVersion(u16),
    PingTime { slot: ConnectionId, rtt_ms: u16 },
}

impl Packet {
    pub fn id(&self) -> PacketId {
        match self {
            Self::ConnectionAccepted(_) => PacketId::ConnectionAccepted,
            Self::ConnectionRefused(_) => PacketId::ConnectionRefused,
            Self::ClientConnected(_) => PacketId::ClientConnected,
            Self::ClientDisconnected(_) => PacketId::ClientDisconnected,
            Self::PlayerInfo(_) => PacketId::PlayerInfo,
            Self::LobbyUpdate(_) => PacketId::LobbyUpdate,
            Self::LobbyReady { .. } => PacketId::LobbyReady,
            Self::MapInfo(_) => PacketId::MapInfo,
            Self::ScoreType(_) => PacketId::ScoreType,
            Self::GimmeRadius(_) => PacketId::GimmeRadius,
            Self::HoleCount(_) => PacketId::HoleCount,
            Self::ReverseCourse(_) => PacketId::ReverseCourse,
            Self::ClubLimit(_) => PacketId::ClubLimit,
            Self::NightTime(_) => PacketId::NightTime,
            Self::WeatherType(_) => PacketId::WeatherType,
            Self::RandomWind(_) => PacketId::RandomWind,
            Self::WindStrength(_) => PacketId::WindStrength,
            Self::TeamMode(_) => PacketId::TeamMode,
            Self::GroupMode(_) => PacketId::GroupMode,
            Self::FastCpu(_) => PacketId::FastCpu,
            Self::ClubLevel { .. } => PacketId::ClubLevel,
            Self::MaxClubs(_) => PacketId::MaxClubs,
            Self::RequestGameStart(_) => PacketId::RequestGameStart,
            Self::StateChange(_) => PacketId::StateChange,
            Self::ServerCommand(_) => PacketId::ServerCommand,
            Self::Poke(_) => PacketId::Poke,
            Self::WeatherChange(_) => PacketId::WeatherChange,
            Self::ClientVersion(_) => PacketId::ClientVersion,
            Self::PingTime { .. } => PacketId::PingTime,
        }
    }

    pub fn channel(&self) -> u8 {
        self.id().channel()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(8);
        w.write_u8(self.id() as u8);

        match self {
            Self::ConnectionAccepted(id)
            | Self::ClientConnected(id)
            | Self::ClientDisconnected(id)
            | Self::Poke(id) => w.write_u8(id.0),
            Self::ConnectionRefused(reason) => w.write_u8(*reason as u8),
            Self::PlayerInfo(entry) | Self::LobbyUpdate(entry) => entry.encode(&mut w),
            Self::LobbyReady { slot, ready } => w.write_u16(pack_slot(*slot, *ready as u8)),
            Self::MapInfo(course) => w.write_string(course),
            Self::ScoreType(v) => w.write_u8(*v as u8),
            Self::GimmeRadius(v) => w.write_u8(*v as u8),
            Self::HoleCount(v) => w.write_u8(*v as u8),
            Self::WeatherType(v) => w.write_u8(*v as u8),
            Self::GroupMode(v) => w.write_u8(*v as u8),
            Self::ReverseCourse(v)
            | Self::ClubLimit(v)
            | Self::NightTime(v)
            | Self::RandomWind(v)
            | Self::TeamMode(v)
            | Self::FastCpu(v)
            | Self::WeatherChange(v) => w.write_bool(*v),
            Self::WindStrength(v) | Self::MaxClubs(v) => w.write_u8(*v),
            Self::ClubLevel { slot, level } => w.write_u16(pack_slot(*slot, *level)),
            Self::RequestGameStart(state) | Self::StateChange(state) => w.write_u8(*state as u8),
            Self::ServerCommand(cmd) => w.write_u16(pack_slot(cmd.target, cmd.kind as u8)),
            Self::ClientVersion(v) => w.write_u16(*v),
            Self::PingTime { slot, rtt_ms } => {
                w.write_u8(slot.0);
                w.write_u16(*rtt_ms);
            }
        }

        w.into_inner()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let (&raw_id, payload) = bytes.split_first().ok_or(WireError::Empty)?;
        let id = PacketId::try_from(raw_id)?;

        if let PayloadSize::Fixed(expected) = id.payload_size() {
            if payload.len() != expected {
                return Err(WireError::LengthMismatch {
                    id,
                    expected,
                    actual: payload.len(),
                });
            }
        }

        let mut r = WireReader::new(payload);
        let packet = match id {
            PacketId::ConnectionAccepted => Self::ConnectionAccepted(ConnectionId(r.read_u8()?)),
            PacketId::ConnectionRefused => Self::ConnectionRefused(r.read_u8()?.try_into()?),
            PacketId::ClientConnected => Self::ClientConnected(ConnectionId(r.read_u8()?)),
            PacketId::ClientDisconnected => Self::ClientDisconnected(ConnectionId(r.read_u8()?)),
            PacketId::PlayerInfo => {
                let entry = RosterEntry::decode(payload)?;
                if entry.players.is_empty() || entry.player_count() > MAX_PLAYERS_PER_CONNECTION {
                    return Err(WireError::PlayerCount(entry.player_count() as u8));
                }
                return Ok(Self::PlayerInfo(entry));
            }
            PacketId::LobbyUpdate => return Ok(Self::LobbyUpdate(RosterEntry::decode(payload)?)),
            PacketId::LobbyReady => {
                let (slot, ready) = unpack_slot(r.read_u16()?);
                Self::LobbyReady {
                    slot,
                    ready: ready != 0,
                }
            }
            PacketId::MapInfo => Self::MapInfo(r.read_string()?),
            PacketId::ScoreType => Self::ScoreType(r.read_u8()?.try_into()?),
            PacketId::GimmeRadius => Self::GimmeRadius(r.read_u8()?.try_into()?),
            PacketId::HoleCount => Self::HoleCount(r.read_u8()?.try_into()?),
            PacketId::ReverseCourse => Self::ReverseCourse(r.read_bool()?),
            PacketId::ClubLimit => Self::ClubLimit(r.read_bool()?),
            PacketId::NightTime => Self::NightTime(r.read_bool()?),
            PacketId::WeatherType => Self::WeatherType(r.read_u8()?.try_into()?),
            PacketId::RandomWind => Self::RandomWind(r.read_bool()?),
            PacketId::WindStrength => Self::WindStrength(r.read_u8()?),
            PacketId::TeamMode => Self::TeamMode(r.read_bool()?),
            PacketId::GroupMode => Self::GroupMode(r.read_u8()?.try_into()?),
            PacketId::FastCpu => Self::FastCpu(r.read_bool()?),
            PacketId::ClubLevel => {
                let (slot, level) = unpack_slot(r.read_u16()?);
                if level > MAX_CLUB_LEVEL {
                    return Err(WireError::InvalidValue {
                        field: "club level",
                        value: level,
                    });
                }
                Self::ClubLevel { slot, level }
            }
            PacketId::MaxClubs => Self::MaxClubs(r.read_u8()?),
            PacketId::RequestGameStart => Self::RequestGameStart(r.read_u8()?.try_into()?),
            PacketId::StateChange => Self::StateChange(r.read_u8()?.try_into()?),
            PacketId::ServerCommand => {
                let (target, kind) = unpack_slot(r.read_u16()?);
                Self::ServerCommand(ServerCommand {
                    kind: kind.try_into()?,
                    target,
                })
            }
            PacketId::Poke => Self::Poke(ConnectionId(r.read_u8()?)),
            PacketId::WeatherChange => Self::WeatherChange(r.read_bool()?),
            PacketId::ClientVersion => Self::ClientVersion(r.read_u16()?),
            PacketId::PingTime => Self::PingTime {
                slot: ConnectionId(r.read_u8()?),
                rtt_ms: r.read_u16()?,
            },
        };

        r.finish()?;
        Ok(packet)
    }
}

/// Slot index in the high byte, value in the low byte.
fn pack_slot(slot: ConnectionId, value: u8) -> u16 {
    (u16::from(slot.0) << 8) | u16::from(value)
}

fn unpack_slot(packed: u16) -> (ConnectionId, u8) {
    (ConnectionId((packed >> 8) as u8), (packed & 0xff) as u8)
}

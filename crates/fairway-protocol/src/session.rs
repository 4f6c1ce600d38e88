//! Room-wide session configuration.
//!
//! Owned by the host connection. The server applies host writes and echoes
//! the authoritative value of every field to all peers.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketId};
use crate::wire::clamp_string;
use crate::{MAX_CLIENTS, MAX_WIND_STRENGTH};

/// Declares a `#[repr(u8)]` enum with a checked `TryFrom<u8>`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident = $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize,
        )]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::wire::WireError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $value => Ok(Self::$variant), )+
                    _ => Err($crate::wire::WireError::InvalidValue { field: $field, value }),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Scoring rules for the round
    pub enum ScoreType: "score type" {
        Stroke = 0,
        Stableford = 1,
        Match = 2,
        Skins = 3,
        NearestThePin = 4,
        LongestDrive = 5,
    }
}

impl ScoreType {
    /// Number of human-populated connections this mode supports.
    pub fn connection_bounds(self) -> RangeInclusive<usize> {
        match self {
            Self::Stroke | Self::Stableford | Self::NearestThePin | Self::LongestDrive => {
                1..=MAX_CLIENTS
            }
            // Head-to-head modes need an opponent
            Self::Match | Self::Skins => 2..=MAX_CLIENTS,
        }
    }
}

wire_enum! {
    /// Distance inside which a putt is conceded
    pub enum GimmeRadius: "gimme radius" {
        None = 0,
        Leather = 1,
        Putter = 2,
    }
}

wire_enum! {
    pub enum HoleCount: "hole count" {
        All = 0,
        Front = 1,
        Back = 2,
    }
}

wire_enum! {
    pub enum WeatherType: "weather type" {
        Clear = 0,
        Rain = 1,
        Showers = 2,
        Stormy = 3,
        Mist = 4,
        Snow = 5,
    }
}

wire_enum! {
    /// How players are grouped on the course
    pub enum GroupMode: "group mode" {
        Single = 0,
        Pairs = 1,
        Threes = 2,
        Fours = 3,
    }
}

wire_enum! {
    /// Process-level state the lobby hands control to
    pub enum StateId: "state id" {
        Lobby = 0,
        Game = 1,
    }
}

/// Shared room configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub score_type: ScoreType,
    pub gimme_radius: GimmeRadius,
    pub hole_count: HoleCount,
    pub reverse_course: bool,
    pub club_limit: bool,
    pub night_time: bool,
    pub weather_type: WeatherType,
    pub random_wind: bool,
    /// 1..=MAX_WIND_STRENGTH
    pub wind_strength: u8,
    pub team_mode: bool,
    pub group_mode: GroupMode,
    pub fast_cpu: bool,
    /// Course directory name
    pub course: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            score_type: ScoreType::Stroke,
            gimme_radius: GimmeRadius::None,
            hole_count: HoleCount::All,
            reverse_course: false,
            club_limit: false,
            night_time: false,
            weather_type: WeatherType::Clear,
            random_wind: false,
            wind_strength: 3,
            team_mode: false,
            group_mode: GroupMode::Single,
            fast_cpu: true,
            course: String::new(),
        }
    }
}

impl SessionConfig {
    /// Applies a configuration packet. Returns false for non-configuration packets.
    pub fn apply(&mut self, packet: &Packet) -> bool {
        match packet {
            Packet::MapInfo(course) => self.course = clamp_string(course),
            Packet::ScoreType(v) => self.score_type = *v,
            Packet::GimmeRadius(v) => self.gimme_radius = *v,
            Packet::HoleCount(v) => self.hole_count = *v,
            Packet::ReverseCourse(v) => self.reverse_course = *v,
            Packet::ClubLimit(v) => self.club_limit = *v,
            Packet::NightTime(v) => self.night_time = *v,
            Packet::WeatherType(v) => self.weather_type = *v,
            Packet::RandomWind(v) => self.random_wind = *v,
            Packet::WindStrength(v) => self.wind_strength = (*v).clamp(1, MAX_WIND_STRENGTH),
            Packet::TeamMode(v) => self.team_mode = *v,
            Packet::GroupMode(v) => self.group_mode = *v,
            Packet::FastCpu(v) => self.fast_cpu = *v,
            _ => return false,
        }
        true
    }

    /// The authoritative value of a single field as a packet.
    pub fn packet_for(&self, id: PacketId) -> Option<Packet> {
        let packet = match id {
            PacketId::MapInfo => Packet::MapInfo(self.course.clone()),
            PacketId::ScoreType => Packet::ScoreType(self.score_type),
            PacketId::GimmeRadius => Packet::GimmeRadius(self.gimme_radius),
            PacketId::HoleCount => Packet::HoleCount(self.hole_count),
            PacketId::ReverseCourse => Packet::ReverseCourse(self.reverse_course),
            PacketId::ClubLimit => Packet::ClubLimit(self.club_limit),
            PacketId::NightTime => Packet::NightTime(self.night_time),
            PacketId::WeatherType => Packet::WeatherType(self.weather_type),
            PacketId::RandomWind => Packet::RandomWind(self.random_wind),
            PacketId::WindStrength => Packet::WindStrength(self.wind_strength),
            PacketId::TeamMode => Packet::TeamMode(self.team_mode),
            PacketId::GroupMode => Packet::GroupMode(self.group_mode),
            PacketId::FastCpu => Packet::FastCpu(self.fast_cpu),
            _ => return None,
        };
        Some(packet)
    }

    /// Every field, course name first.
    pub fn packets(&self) -> Vec<Packet> {
        PacketId::CONFIG
            .iter()
            .filter_map(|&id| self.packet_for(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireError;

    #[test]
    fn enum_values_are_checked() {
        assert_eq!(WeatherType::try_from(3), Ok(WeatherType::Stormy));
        assert_eq!(
            WeatherType::try_from(42),
            Err(WireError::InvalidValue {
                field: "weather type",
                value: 42
            })
        );
        assert_eq!(StateId::try_from(1), Ok(StateId::Game));
        assert!(StateId::try_from(2).is_err());
    }

    #[test]
    fn apply_then_packet_for_reflects_change() {
        let mut config = SessionConfig::default();
        assert!(config.apply(&Packet::WeatherType(WeatherType::Stormy)));
        assert_eq!(
            config.packet_for(PacketId::WeatherType),
            Some(Packet::WeatherType(WeatherType::Stormy))
        );

        assert!(!config.apply(&Packet::MaxClubs(1)));
        assert_eq!(config.packet_for(PacketId::MaxClubs), None);
    }

    #[test]
    fn wind_strength_is_clamped() {
        let mut config = SessionConfig::default();
        config.apply(&Packet::WindStrength(0));
        assert_eq!(config.wind_strength, 1);
        config.apply(&Packet::WindStrength(200));
        assert_eq!(config.wind_strength, MAX_WIND_STRENGTH);
    }

    #[test]
    fn packets_cover_every_field() {
        let packets = SessionConfig::default().packets();
        assert_eq!(packets.len(), PacketId::CONFIG.len());
        assert!(matches!(packets[0], Packet::MapInfo(_)));
    }

    #[test]
    fn head_to_head_modes_need_two_connections() {
        assert!(!ScoreType::Match.connection_bounds().contains(&1));
        assert!(ScoreType::Stroke.connection_bounds().contains(&1));
    }
}

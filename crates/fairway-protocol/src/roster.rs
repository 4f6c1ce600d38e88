//! Roster records exchanged in `PlayerInfo` and `LobbyUpdate`.
//!
//! Layout: peer id (u64), connection id (u8), player count (u8), then
//! `player count` fixed-size [`PlayerSlot`] records.

use serde::{Deserialize, Serialize};

use crate::wire::{WireError, WireReader, WireWriter};
use crate::{ConnectionId, PeerId, MAX_HOLES, MAX_PLAYERS_PER_CONNECTION, MAX_STRING_DATA_SIZE};

/// Name is stored in a fixed field: length byte plus zero-padded data.
const NAME_FIELD_SIZE: usize = 1 + MAX_STRING_DATA_SIZE;

/// Equipment and cosmetic ids carried per player.
const ITEM_ID_COUNT: usize = 7;

/// Encoded size of one [`PlayerSlot`].
pub const PLAYER_SLOT_SIZE: usize = NAME_FIELD_SIZE + 4 + ITEM_ID_COUNT * 4 + MAX_HOLES + 2;

/// Peer id plus connection id.
pub const ROSTER_HEADER_SIZE: usize = 8 + 1;

/// One local player on a connection
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub name: String,
    pub avatar_flags: [u8; 4],
    pub ball_id: u32,
    pub club_id: u32,
    pub hair_id: u32,
    pub hat_id: u32,
    pub skin_id: u32,
    pub voice_id: u32,
    pub club_set_id: u32,
    pub hole_scores: [u8; MAX_HOLES],
    pub is_bot: bool,
    pub team_index: u8,
}

impl PlayerSlot {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn encode(&self, writer: &mut WireWriter) {
        let start = writer.len();
        writer.write_string(&self.name);
        writer.pad_to(start + NAME_FIELD_SIZE);

        writer.write_bytes(&self.avatar_flags);
        for id in [
            self.ball_id,
            self.club_id,
            self.hair_id,
            self.hat_id,
            self.skin_id,
            self.voice_id,
            self.club_set_id,
        ] {
            writer.write_u32(id);
        }
        writer.write_bytes(&self.hole_scores);
        writer.write_bool(self.is_bot);
        writer.write_u8(self.team_index);
    }

    pub fn decode(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let name = WireReader::new(reader.read_bytes(NAME_FIELD_SIZE)?).read_string()?;

        let mut avatar_flags = [0u8; 4];
        avatar_flags.copy_from_slice(reader.read_bytes(4)?);

        let ball_id = reader.read_u32()?;
        let club_id = reader.read_u32()?;
        let hair_id = reader.read_u32()?;
        let hat_id = reader.read_u32()?;
        let skin_id = reader.read_u32()?;
        let voice_id = reader.read_u32()?;
        let club_set_id = reader.read_u32()?;

        let mut hole_scores = [0u8; MAX_HOLES];
        hole_scores.copy_from_slice(reader.read_bytes(MAX_HOLES)?);

        Ok(Self {
            name,
            avatar_flags,
            ball_id,
            club_id,
            hair_id,
            hat_id,
            skin_id,
            voice_id,
            club_set_id,
            hole_scores,
            is_bot: reader.read_bool()?,
            team_index: reader.read_u8()?,
        })
    }
}

/// A connection's roster as sent over the wire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub peer_id: PeerId,
    pub connection_id: ConnectionId,
    pub players: Vec<PlayerSlot>,
}

impl RosterEntry {
    /// A cleared entry, as broadcast after a disconnect.
    pub fn empty(connection_id: ConnectionId) -> Self {
        Self {
            peer_id: PeerId::default(),
            connection_id,
            players: Vec::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// True if at least one player on this connection is not a bot.
    pub fn has_human(&self) -> bool {
        self.players.iter().any(|p| !p.is_bot)
    }

    /// Exact encoded size for `player_count` players.
    pub fn encoded_len(player_count: usize) -> usize {
        ROSTER_HEADER_SIZE + 1 + player_count * PLAYER_SLOT_SIZE
    }

    pub fn encode(&self, writer: &mut WireWriter) {
        let count = self.players.len().min(MAX_PLAYERS_PER_CONNECTION);
        writer.write_u64(self.peer_id.0);
        writer.write_u8(self.connection_id.0);
        writer.write_u8(count as u8);
        for player in &self.players[..count] {
            player.encode(writer);
        }
    }

    /// Decodes an entry that must span the whole payload.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        let mut reader = WireReader::new(payload);
        let peer_id = PeerId(reader.read_u64()?);
        let connection_id = ConnectionId(reader.read_u8()?);
        let count = reader.read_u8()?;
        if count as usize > MAX_PLAYERS_PER_CONNECTION {
            return Err(WireError::PlayerCount(count));
        }

        let expected = Self::encoded_len(count as usize);
        if payload.len() != expected {
            return Err(WireError::RosterLength {
                expected,
                actual: payload.len(),
            });
        }

        let players = (0..count)
            .map(|_| PlayerSlot::decode(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;
        reader.finish()?;

        Ok(Self {
            peer_id,
            connection_id,
            players,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_STRING_CHARS;

    fn encode(entry: &RosterEntry) -> Vec<u8> {
        let mut writer = WireWriter::new();
        entry.encode(&mut writer);
        writer.into_inner()
    }

    fn full_entry() -> RosterEntry {
        let players = (0..MAX_PLAYERS_PER_CONNECTION)
            .map(|i| PlayerSlot {
                name: "W".repeat(MAX_STRING_CHARS),
                avatar_flags: [1, 2, 3, i as u8],
                ball_id: 0xDEAD_BEEF,
                club_id: 2,
                hair_id: 3,
                hat_id: 4,
                skin_id: 5,
                voice_id: 6,
                club_set_id: 7,
                hole_scores: [i as u8 + 3; MAX_HOLES],
                is_bot: i % 2 == 1,
                team_index: i as u8,
            })
            .collect();
        RosterEntry {
            peer_id: PeerId(76_561_198_000_000_001),
            connection_id: ConnectionId(5),
            players,
        }
    }

    #[test]
    fn slot_has_fixed_size() {
        let mut writer = WireWriter::new();
        PlayerSlot::named("Al").encode(&mut writer);
        assert_eq!(writer.len(), PLAYER_SLOT_SIZE);

        let mut writer = WireWriter::new();
        PlayerSlot::named("é".repeat(MAX_STRING_CHARS)).encode(&mut writer);
        assert_eq!(writer.len(), PLAYER_SLOT_SIZE);
    }

    #[test]
    fn maximal_entry_survives_roundtrip() {
        let entry = full_entry();
        let bytes = encode(&entry);
        assert_eq!(bytes.len(), RosterEntry::encoded_len(MAX_PLAYERS_PER_CONNECTION));

        let decoded = RosterEntry::decode(&bytes).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.players[0].name.chars().count(), MAX_STRING_CHARS);
    }

    #[test]
    fn rejects_length_mismatch() {
        let bytes = encode(&full_entry());

        let short = &bytes[..bytes.len() - 1];
        assert!(matches!(
            RosterEntry::decode(short),
            Err(WireError::RosterLength { .. })
        ));

        let mut long = bytes.clone();
        long.push(0);
        assert!(matches!(
            RosterEntry::decode(&long),
            Err(WireError::RosterLength { .. })
        ));
    }

    #[test]
    fn rejects_too_many_players() {
        let mut bytes = encode(&full_entry());
        bytes[ROSTER_HEADER_SIZE] = MAX_PLAYERS_PER_CONNECTION as u8 + 1;
        assert_eq!(
            RosterEntry::decode(&bytes),
            Err(WireError::PlayerCount(MAX_PLAYERS_PER_CONNECTION as u8 + 1))
        );
    }

    #[test]
    fn empty_entry_is_header_only() {
        let bytes = encode(&RosterEntry::empty(ConnectionId(3)));
        assert_eq!(bytes.len(), ROSTER_HEADER_SIZE + 1);
        let decoded = RosterEntry::decode(&bytes).unwrap();
        assert_eq!(decoded.player_count(), 0);
        assert_eq!(decoded.connection_id, ConnectionId(3));
    }
}

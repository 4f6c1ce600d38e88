//! Property tests for the lobby wire codec.

use fairway_protocol::{
    ConnectionId, Packet, PeerId, PlayerSlot, RosterEntry, VoicePacket, MAX_HOLES,
    MAX_PLAYERS_PER_CONNECTION, MAX_STRING_CHARS,
};
use proptest::prelude::*;

fn player_slot() -> impl Strategy<Value = PlayerSlot> {
    (
        prop::collection::vec(any::<char>(), 0..=MAX_STRING_CHARS),
        any::<[u8; 4]>(),
        prop::array::uniform7(any::<u32>()),
        prop::collection::vec(any::<u8>(), MAX_HOLES),
        any::<bool>(),
        any::<u8>(),
    )
        .prop_map(|(name, avatar_flags, ids, scores, is_bot, team_index)| {
            let mut hole_scores = [0u8; MAX_HOLES];
            hole_scores.copy_from_slice(&scores);
            PlayerSlot {
                name: name.into_iter().collect(),
                avatar_flags,
                ball_id: ids[0],
                club_id: ids[1],
                hair_id: ids[2],
                hat_id: ids[3],
                skin_id: ids[4],
                voice_id: ids[5],
                club_set_id: ids[6],
                hole_scores,
                is_bot,
                team_index,
            }
        })
}

fn roster_entry() -> impl Strategy<Value = RosterEntry> {
    (
        any::<u64>(),
        0u8..8,
        prop::collection::vec(player_slot(), 1..=MAX_PLAYERS_PER_CONNECTION),
    )
        .prop_map(|(peer, slot, players)| RosterEntry {
            peer_id: PeerId(peer),
            connection_id: ConnectionId(slot),
            players,
        })
}

proptest! {
    /// Names up to the maximum length come back unchanged
    #[test]
    fn roster_entries_survive_the_wire(entry in roster_entry()) {
        let bytes = Packet::PlayerInfo(entry.clone()).encode();
        prop_assert_eq!(Packet::decode(&bytes), Ok(Packet::PlayerInfo(entry)));
    }

    /// Arbitrary input is either rejected or decodes to a packet that
    /// encodes back to an equivalent packet
    #[test]
    fn decode_is_total(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
        if let Ok(packet) = Packet::decode(&bytes) {
            prop_assert_eq!(Packet::decode(&packet.encode()), Ok(packet));
        }
    }

    /// Truncating a valid roster payload always fails
    #[test]
    fn truncated_roster_is_rejected(entry in roster_entry(), cut in 1usize..64) {
        let bytes = Packet::LobbyUpdate(entry).encode();
        let cut = cut.min(bytes.len() - 1);
        prop_assert!(Packet::decode(&bytes[..bytes.len() - cut]).is_err());
    }

    #[test]
    fn voice_decode_is_total(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        if let Ok(packet) = VoicePacket::decode(&bytes) {
            prop_assert_eq!(packet.encode(), bytes);
        }
    }
}

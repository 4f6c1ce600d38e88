//! Protocol-wide limits and identifiers.

/// Maximum simultaneous connections to one lobby.
pub const MAX_CLIENTS: usize = 8;

/// Maximum local players sharing one connection.
pub const MAX_PLAYERS_PER_CONNECTION: usize = 4;

/// Maximum characters in any string sent over the wire.
pub const MAX_STRING_CHARS: usize = 24;

/// Maximum encoded size of a string (UTF-32 code units).
pub const MAX_STRING_DATA_SIZE: usize = MAX_STRING_CHARS * 4;

/// Holes tracked per player.
pub const MAX_HOLES: usize = 18;

/// Highest club capability tier. Also the level assumed until a client reports.
pub const MAX_CLUB_LEVEL: u8 = 2;

/// Wind strength tiers are 1..=MAX_WIND_STRENGTH.
pub const MAX_WIND_STRENGTH: u8 = 5;

/// Netcode protocol id, must match between client and server.
pub const PROTOCOL_ID: u64 = 0xFA1_2A7_001;

/// Version reported by clients in `ClientVersion`.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default UDP port for the lobby session.
pub const DEFAULT_GAME_PORT: u16 = 16002;

/// Default UDP port for the voice relay.
pub const DEFAULT_VOICE_PORT: u16 = 16003;

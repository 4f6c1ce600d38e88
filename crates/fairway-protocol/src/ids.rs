//! Small typed identifiers.

use serde::{Deserialize, Serialize};

/// Stable connection slot index (0..MAX_CLIENTS)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u8);

impl ConnectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque identity of a remote peer (platform user id or similar)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PeerId(pub u64);

/// Voice relay channel, assigned by the relay on connect
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceChannelId(pub u8);

impl VoiceChannelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

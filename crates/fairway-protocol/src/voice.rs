//! Voice relay packets.
//!
//! Ids below `MAX_CLIENTS` are audio frames tagged with the sender's
//! channel id. The frame body is opaque to the relay.

use crate::packet::RefusalReason;
use crate::wire::WireError;
use crate::{VoiceChannelId, MAX_CLIENTS};

const CHANNEL_ASSIGNED: u8 = MAX_CLIENTS as u8;
const CHANNEL_FREED: u8 = CHANNEL_ASSIGNED + 1;
const VOICE_REFUSED: u8 = CHANNEL_ASSIGNED + 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoicePacket {
    /// Encoded audio from the tagged channel
    Frame {
        channel: VoiceChannelId,
        data: Vec<u8>,
    },
    ChannelAssigned(VoiceChannelId),
    /// A peer left; receivers reset decode state for the channel
    ChannelFreed(VoiceChannelId),
    Refused(RefusalReason),
}

impl VoicePacket {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Frame { channel, data } => {
                let mut out = Vec::with_capacity(data.len() + 1);
                out.push(channel.0);
                out.extend_from_slice(data);
                out
            }
            Self::ChannelAssigned(id) => vec![CHANNEL_ASSIGNED, id.0],
            Self::ChannelFreed(id) => vec![CHANNEL_FREED, id.0],
            Self::Refused(reason) => vec![VOICE_REFUSED, *reason as u8],
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let (&tag, payload) = bytes.split_first().ok_or(WireError::Empty)?;

        if (tag as usize) < MAX_CLIENTS {
            return Ok(Self::Frame {
                channel: VoiceChannelId(tag),
                data: payload.to_vec(),
            });
        }

        let value = match payload {
            [value] => *value,
            [] => {
                return Err(WireError::Truncated {
                    needed: 1,
                    remaining: 0,
                })
            }
            [_, rest @ ..] => return Err(WireError::TrailingBytes(rest.len())),
        };

        match tag {
            CHANNEL_ASSIGNED => Ok(Self::ChannelAssigned(channel(value)?)),
            CHANNEL_FREED => Ok(Self::ChannelFreed(channel(value)?)),
            VOICE_REFUSED => Ok(Self::Refused(value.try_into()?)),
            other => Err(WireError::UnknownPacket(other)),
        }
    }

    /// The sender tag of an audio frame without copying its body.
    pub fn frame_tag(bytes: &[u8]) -> Option<VoiceChannelId> {
        bytes
            .first()
            .filter(|&&tag| (tag as usize) < MAX_CLIENTS)
            .map(|&tag| VoiceChannelId(tag))
    }
}

fn channel(value: u8) -> Result<VoiceChannelId, WireError> {
    if (value as usize) < MAX_CLIENTS {
        Ok(VoiceChannelId(value))
    } else {
        Err(WireError::InvalidValue {
            field: "voice channel",
            value,
        })
    }
}

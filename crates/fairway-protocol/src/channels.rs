//! Renet channel configuration.
//!
//! Lobby session:
//! Channel 0: ReliableOrdered - control packets, room configuration
//! Channel 1: ReliableOrdered - roster entries, course name
//! Channel 2: Unreliable - ping times
//!
//! Voice relay:
//! Channel 0: ReliableOrdered - channel assignment and release
//! Channel 1: Unreliable - audio frames

use std::time::Duration;

use renet::{ChannelConfig, SendType};

/// Channel IDs for the lobby session
pub mod channel_id {
    /// General control traffic - must arrive in order
    pub const RELIABLE: u8 = 0;
    /// Bulk string/roster traffic, kept apart to avoid head-of-line blocking
    pub const STRINGS: u8 = 1;
    /// Can be lost
    pub const UNRELIABLE: u8 = 2;
}

/// Channel IDs for the voice relay
pub mod voice_channel_id {
    pub const CONTROL: u8 = 0;
    pub const FRAMES: u8 = 1;
}

/// Maximum bytes per reliable channel
const MAX_CHANNEL_MEMORY: usize = 1024 * 1024; // 1 MB

const RESEND_TIME: Duration = Duration::from_millis(300);

/// Create channel configurations for the lobby session
pub fn create_channel_configs() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            channel_id: channel_id::RELIABLE,
            max_memory_usage_bytes: MAX_CHANNEL_MEMORY,
            send_type: SendType::ReliableOrdered {
                resend_time: RESEND_TIME,
            },
        },
        ChannelConfig {
            channel_id: channel_id::STRINGS,
            max_memory_usage_bytes: MAX_CHANNEL_MEMORY,
            send_type: SendType::ReliableOrdered {
                resend_time: RESEND_TIME,
            },
        },
        ChannelConfig {
            channel_id: channel_id::UNRELIABLE,
            max_memory_usage_bytes: 64 * 1024, // 64 KB
            send_type: SendType::Unreliable,
        },
    ]
}

/// Create channel configurations for the voice relay
pub fn create_voice_channel_configs() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            channel_id: voice_channel_id::CONTROL,
            max_memory_usage_bytes: 64 * 1024,
            send_type: SendType::ReliableOrdered {
                resend_time: RESEND_TIME,
            },
        },
        ChannelConfig {
            channel_id: voice_channel_id::FRAMES,
            max_memory_usage_bytes: MAX_CHANNEL_MEMORY,
            send_type: SendType::Unreliable,
        },
    ]
}

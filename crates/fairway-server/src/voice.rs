//! Voice relay.
//!
//! Assigns each voice connection the lowest free channel id and forwards
//! tagged audio frames verbatim to every other assigned peer. Frames are
//! never stored.

use tracing::{debug, info};

use fairway_protocol::{
    voice_channel_id, RefusalReason, VoiceChannelId, VoicePacket, MAX_CLIENTS,
};

use crate::transport::{Transport, TransportEvent};

pub struct VoiceRelay {
    channels: [Option<u64>; MAX_CLIENTS],
    capacity: usize,
}

impl VoiceRelay {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: [None; MAX_CLIENTS],
            capacity: capacity.clamp(1, MAX_CLIENTS),
        }
    }

    pub fn channel_of(&self, client_id: u64) -> Option<VoiceChannelId> {
        self.channels
            .iter()
            .position(|c| *c == Some(client_id))
            .map(|i| VoiceChannelId(i as u8))
    }

    /// Assigned channels with their clients
    pub fn assigned(&self) -> impl Iterator<Item = (VoiceChannelId, u64)> + '_ {
        self.channels[..self.capacity]
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|client| (VoiceChannelId(i as u8), client)))
    }

    /// Drain all queued voice transport events
    pub fn process<T: Transport>(&mut self, transport: &mut T) {
        while let Some(event) = transport.poll_event() {
            match event {
                TransportEvent::Connected(client_id) => self.handle_connect(client_id, transport),
                TransportEvent::Disconnected(client_id) => {
                    self.handle_disconnect(client_id, transport)
                }
                TransportEvent::Message {
                    client_id, payload, ..
                } => self.handle_frame(client_id, payload, transport),
            }
        }
    }

    pub fn handle_connect<T: Transport>(&mut self, client_id: u64, transport: &mut T) {
        let Some(index) = self.channels[..self.capacity]
            .iter()
            .position(Option::is_none)
        else {
            info!("Refusing voice client {}: relay full", client_id);
            transport.send(
                client_id,
                voice_channel_id::CONTROL,
                VoicePacket::Refused(RefusalReason::ServerFull).encode(),
            );
            transport.disconnect_later(client_id);
            return;
        };

        self.channels[index] = Some(client_id);
        let channel = VoiceChannelId(index as u8);
        info!("Voice client {} assigned channel {}", client_id, channel.0);
        transport.send(
            client_id,
            voice_channel_id::CONTROL,
            VoicePacket::ChannelAssigned(channel).encode(),
        );
    }

    pub fn handle_disconnect<T: Transport>(&mut self, client_id: u64, transport: &mut T) {
        let Some(channel) = self.channel_of(client_id) else {
            return;
        };

        self.channels[channel.index()] = None;
        info!("Voice channel {} freed", channel.0);

        let freed = VoicePacket::ChannelFreed(channel).encode();
        for (_, peer) in self.assigned().collect::<Vec<_>>() {
            transport.send(peer, voice_channel_id::CONTROL, freed.clone());
        }
    }

    /// Forward a frame whose tag matches the sender's channel
    pub fn handle_frame<T: Transport>(
        &mut self,
        client_id: u64,
        payload: Vec<u8>,
        transport: &mut T,
    ) {
        let Some(channel) = self.channel_of(client_id) else {
            return;
        };
        if VoicePacket::frame_tag(&payload) != Some(channel) {
            debug!("Dropping voice packet with bad tag from channel {}", channel.0);
            return;
        }

        let peers: Vec<u64> = self
            .assigned()
            .filter(|&(_, peer)| peer != client_id)
            .map(|(_, peer)| peer)
            .collect();
        for peer in peers {
            transport.send(peer, voice_channel_id::FRAMES, payload.clone());
        }
    }
}

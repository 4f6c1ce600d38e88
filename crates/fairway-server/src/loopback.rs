//! In-memory transport.
//!
//! Drives the coordinator and relay without sockets. Inbound events are
//! queued by the caller, outbound traffic is recorded per recipient.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use fairway_protocol::Packet;

use crate::transport::{Transport, TransportEvent};

/// One recorded delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub client_id: u64,
    pub channel: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct LoopbackTransport {
    connected: BTreeSet<u64>,
    inbound: VecDeque<TransportEvent>,
    outbound: Vec<Outbound>,
    kicked: Vec<u64>,
    rtts: HashMap<u64, Duration>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a peer connecting
    pub fn connect(&mut self, client_id: u64) {
        self.connected.insert(client_id);
        self.inbound.push_back(TransportEvent::Connected(client_id));
    }

    /// Simulate a peer dropping
    pub fn disconnect(&mut self, client_id: u64) {
        if self.connected.remove(&client_id) {
            self.inbound.push_back(TransportEvent::Disconnected(client_id));
        }
    }

    /// Queue raw bytes from a peer
    pub fn deliver(&mut self, client_id: u64, channel: u8, payload: Vec<u8>) {
        self.inbound.push_back(TransportEvent::Message {
            client_id,
            channel,
            payload,
        });
    }

    /// Queue a lobby packet from a peer on its declared channel
    pub fn deliver_packet(&mut self, client_id: u64, packet: &Packet) {
        self.deliver(client_id, packet.channel(), packet.encode());
    }

    pub fn set_rtt(&mut self, client_id: u64, rtt: Duration) {
        self.rtts.insert(client_id, rtt);
    }

    pub fn is_connected(&self, client_id: u64) -> bool {
        self.connected.contains(&client_id)
    }

    /// Clients the server asked to disconnect, in order
    pub fn kicked(&self) -> &[u64] {
        &self.kicked
    }

    pub fn sent(&self) -> &[Outbound] {
        &self.outbound
    }

    /// Raw payloads delivered to one client, in send order
    pub fn sent_to(&self, client_id: u64) -> impl Iterator<Item = &Outbound> {
        self.outbound.iter().filter(move |o| o.client_id == client_id)
    }

    /// Lobby packets delivered to one client, in send order
    pub fn packets_to(&self, client_id: u64) -> Vec<Packet> {
        self.sent_to(client_id)
            .filter_map(|o| Packet::decode(&o.payload).ok())
            .collect()
    }

    pub fn clear_sent(&mut self) {
        self.outbound.clear();
    }

    fn push(&mut self, client_id: u64, channel: u8, payload: Vec<u8>) {
        self.outbound.push(Outbound {
            client_id,
            channel,
            payload,
        });
    }
}

impl Transport for LoopbackTransport {
    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.inbound.pop_front()
    }

    fn send(&mut self, client_id: u64, channel: u8, payload: Vec<u8>) {
        if self.connected.contains(&client_id) {
            self.push(client_id, channel, payload);
        }
    }

    fn broadcast(&mut self, channel: u8, payload: Vec<u8>) {
        let recipients: Vec<u64> = self.connected.iter().copied().collect();
        for client_id in recipients {
            self.push(client_id, channel, payload.clone());
        }
    }

    fn disconnect_later(&mut self, client_id: u64) {
        self.kicked.push(client_id);
        self.disconnect(client_id);
    }

    fn rtt(&self, client_id: u64) -> Option<Duration> {
        if !self.connected.contains(&client_id) {
            return None;
        }
        Some(self.rtts.get(&client_id).copied().unwrap_or_default())
    }
}

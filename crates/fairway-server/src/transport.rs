//! Transport layer using renet_netcode for UDP communication.
//!
//! The lobby coordinator and voice relay talk to a [`Transport`]; the
//! production implementation is [`RenetHost`], tests use
//! [`LoopbackTransport`](crate::loopback::LoopbackTransport).

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use renet::{ChannelConfig, ConnectionConfig, RenetServer, ServerEvent};
use renet_netcode::{NetcodeServerTransport, ServerAuthentication, ServerConfig};
use tracing::{debug, error, info};

use fairway_protocol::{Packet, DEFAULT_GAME_PORT, MAX_CLIENTS, PROTOCOL_ID};

/// Something that happened on a transport since the last poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(u64),
    Disconnected(u64),
    Message {
        client_id: u64,
        channel: u8,
        payload: Vec<u8>,
    },
}

/// Addressed, channelled delivery to connected peers.
///
/// Sends are fire-and-forget enqueues. Events are returned in receipt order.
pub trait Transport {
    fn poll_event(&mut self) -> Option<TransportEvent>;

    fn send(&mut self, client_id: u64, channel: u8, payload: Vec<u8>);

    fn broadcast(&mut self, channel: u8, payload: Vec<u8>);

    /// Disconnect after already queued packets have gone out.
    fn disconnect_later(&mut self, client_id: u64);

    /// Round-trip estimate for a connected client
    fn rtt(&self, client_id: u64) -> Option<Duration>;

    fn send_packet(&mut self, client_id: u64, packet: &Packet) {
        self.send(client_id, packet.channel(), packet.encode());
    }

    fn broadcast_packet(&mut self, packet: &Packet) {
        self.broadcast(packet.channel(), packet.encode());
    }
}

/// Server transport configuration
pub struct TransportConfig {
    /// Public address for clients to connect
    pub public_address: SocketAddr,
    /// Maximum clients
    pub max_clients: usize,
    /// Optional private key for secure authentication (32 bytes)
    /// If None, uses unsecure authentication (for development)
    pub private_key: Option<[u8; 32]>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            public_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_GAME_PORT)),
            max_clients: MAX_CLIENTS,
            private_key: None,
        }
    }
}

/// Creates server transport with netcode authentication
pub fn create_server_transport(
    config: &TransportConfig,
) -> Result<NetcodeServerTransport, TransportError> {
    let socket = UdpSocket::bind(config.public_address)
        .map_err(|e| TransportError::BindFailed(config.public_address, e))?;

    let bound_addr = socket
        .local_addr()
        .map_err(|e| TransportError::LocalAddrFailed(config.public_address, e))?;

    socket
        .set_nonblocking(true)
        .map_err(TransportError::SocketConfig)?;

    let current_time = SystemTime::now().duration_since(UNIX_EPOCH)?;

    let authentication = match config.private_key {
        Some(key) => ServerAuthentication::Secure { private_key: key },
        None => ServerAuthentication::Unsecure,
    };

    let server_config = ServerConfig {
        current_time,
        max_clients: config.max_clients,
        protocol_id: PROTOCOL_ID,
        public_addresses: vec![bound_addr],
        authentication,
    };

    let transport = NetcodeServerTransport::new(server_config, socket)
        .map_err(|e| TransportError::TransportCreation(e.to_string()))?;

    info!(
        "Transport bound to {} (max {} clients, protocol {:016x})",
        bound_addr, config.max_clients, PROTOCOL_ID
    );

    Ok(transport)
}

/// Transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to bind socket to {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Failed to determine bound address for {0}: {1}")]
    LocalAddrFailed(SocketAddr, std::io::Error),

    #[error("Failed to configure socket: {0}")]
    SocketConfig(std::io::Error),

    #[error("System clock is before the Unix epoch: {0}")]
    Clock(#[from] std::time::SystemTimeError),

    #[error("Failed to create transport: {0}")]
    TransportCreation(String),
}

/// RenetServer plus its netcode transport, drained into [`TransportEvent`]s
pub struct RenetHost {
    server: RenetServer,
    transport: NetcodeServerTransport,
    channels: Vec<u8>,
    events: VecDeque<TransportEvent>,
    pending_disconnects: Vec<u64>,
}

impl RenetHost {
    pub fn new(
        config: TransportConfig,
        channels: Vec<ChannelConfig>,
    ) -> Result<Self, TransportError> {
        let transport = create_server_transport(&config)?;
        let channel_ids = channels.iter().map(|c| c.channel_id).collect();

        let server = RenetServer::new(ConnectionConfig {
            available_bytes_per_tick: 60_000,
            server_channels_config: channels.clone(),
            client_channels_config: channels,
        });

        Ok(Self {
            server,
            transport,
            channels: channel_ids,
            events: VecDeque::new(),
            pending_disconnects: Vec::new(),
        })
    }

    /// Receive packets from the network and queue the resulting events
    pub fn update(&mut self, delta: Duration) {
        // Deferred so refusal packets were flushed by the previous send_packets
        for client_id in self.pending_disconnects.drain(..) {
            debug!("Disconnecting client {}", client_id);
            self.server.disconnect(client_id);
        }

        self.server.update(delta);
        if let Err(e) = self.transport.update(delta, &mut self.server) {
            error!("Transport update error: {}", e);
        }

        while let Some(event) = self.server.get_event() {
            self.events.push_back(match event {
                ServerEvent::ClientConnected { client_id } => {
                    info!("Client {} connected", client_id);
                    TransportEvent::Connected(client_id)
                }
                ServerEvent::ClientDisconnected { client_id, reason } => {
                    info!("Client {} disconnected: {:?}", client_id, reason);
                    TransportEvent::Disconnected(client_id)
                }
            });
        }

        for client_id in self.server.clients_id() {
            for &channel in &self.channels {
                while let Some(message) = self.server.receive_message(client_id, channel) {
                    self.events.push_back(TransportEvent::Message {
                        client_id,
                        channel,
                        payload: message.to_vec(),
                    });
                }
            }
        }
    }

    /// Send queued packets to the network
    pub fn send_packets(&mut self) {
        self.transport.send_packets(&mut self.server);
    }

    /// Get the bound address
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.addresses().first().copied()
    }
}

impl Transport for RenetHost {
    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }

    fn send(&mut self, client_id: u64, channel: u8, payload: Vec<u8>) {
        self.server.send_message(client_id, channel, payload);
    }

    fn broadcast(&mut self, channel: u8, payload: Vec<u8>) {
        self.server.broadcast_message(channel, payload);
    }

    fn disconnect_later(&mut self, client_id: u64) {
        if !self.pending_disconnects.contains(&client_id) {
            self.pending_disconnects.push(client_id);
        }
    }

    fn rtt(&self, client_id: u64) -> Option<Duration> {
        let info = self.server.network_info(client_id).ok()?;
        Duration::try_from_secs_f64(info.rtt).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_protocol::create_channel_configs;

    #[test]
    fn create_host_on_ephemeral_port() {
        // Use a random port for testing
        let config = TransportConfig {
            public_address: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };

        match RenetHost::new(config, create_channel_configs()) {
            Ok(mut host) => {
                assert!(host.local_addr().is_some());
                host.update(Duration::from_millis(16));
                assert_eq!(host.poll_event(), None);
                host.send_packets();
            }
            Err(TransportError::BindFailed(_, err))
                if err.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                // Some sandboxed environments disallow socket binds.
            }
            Err(err) => panic!("transport error: {err:?}"),
        }
    }

    #[test]
    fn protocol_id_is_valid() {
        assert!(PROTOCOL_ID > 0);
    }
}

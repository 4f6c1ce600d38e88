//! Renet client connection to a lobby server.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use renet::{ConnectionConfig, RenetClient};
use renet_netcode::{ClientAuthentication, NetcodeClientTransport};
use tracing::{error, info, warn};

use fairway_protocol::{channel_id, create_channel_configs, Packet, PROTOCOL_ID};

use crate::mirror::LobbyMirror;

/// Outgoing half of a lobby connection
pub trait ClientTransport {
    fn send(&mut self, channel: u8, payload: Vec<u8>);

    fn send_packet(&mut self, packet: &Packet) {
        self.send(packet.channel(), packet.encode());
    }
}

/// Client error types
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to bind socket: {0}")]
    BindFailed(std::io::Error),

    #[error("Failed to configure socket: {0}")]
    SocketConfig(std::io::Error),

    #[error("System clock is before the Unix epoch: {0}")]
    Clock(#[from] std::time::SystemTimeError),

    #[error("Failed to create transport: {0}")]
    TransportCreation(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// RenetClient plus its netcode transport
pub struct ClientConnection {
    client: RenetClient,
    transport: NetcodeClientTransport,
    client_id: u64,
    server_addr: SocketAddr,
}

impl ClientConnection {
    /// Connect in unsecure mode with a random client id
    pub fn connect(server_addr: SocketAddr) -> Result<Self, ClientError> {
        Self::connect_as(server_addr, rand::random())
    }

    pub fn connect_as(server_addr: SocketAddr, client_id: u64) -> Result<Self, ClientError> {
        let socket = UdpSocket::bind("0.0.0.0:0").map_err(ClientError::BindFailed)?;
        socket
            .set_nonblocking(true)
            .map_err(ClientError::SocketConfig)?;

        let current_time = SystemTime::now().duration_since(UNIX_EPOCH)?;
        let authentication = ClientAuthentication::Unsecure {
            client_id,
            protocol_id: PROTOCOL_ID,
            server_addr,
            user_data: None,
        };

        let transport = NetcodeClientTransport::new(current_time, authentication, socket)
            .map_err(|e| ClientError::TransportCreation(e.to_string()))?;

        let client = RenetClient::new(ConnectionConfig {
            available_bytes_per_tick: 60_000,
            server_channels_config: create_channel_configs(),
            client_channels_config: create_channel_configs(),
        });

        info!(
            "Connecting to {} as client {} (protocol {:016x})",
            server_addr, client_id, PROTOCOL_ID
        );

        Ok(Self {
            client,
            transport,
            client_id,
            server_addr,
        })
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn is_disconnected(&self) -> bool {
        self.client.is_disconnected()
    }

    /// Receive from the network, feed every packet to the mirror, send
    /// its replies and flush.
    pub fn pump(&mut self, delta: Duration, mirror: &mut LobbyMirror) -> Result<(), ClientError> {
        self.client.update(delta);
        self.transport
            .update(delta, &mut self.client)
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let mut received = Vec::new();
        for channel in [
            channel_id::RELIABLE,
            channel_id::STRINGS,
            channel_id::UNRELIABLE,
        ] {
            while let Some(message) = self.client.receive_message(channel) {
                received.push(message.to_vec());
            }
        }

        for bytes in received {
            match Packet::decode(&bytes) {
                Ok(packet) => {
                    for reply in mirror.apply(&packet) {
                        self.send_packet(&reply);
                    }
                }
                Err(e) => warn!("Malformed packet from server: {}", e),
            }
        }

        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), ClientError> {
        self.transport
            .send_packets(&mut self.client)
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    pub fn disconnect(&mut self) {
        info!("Disconnecting from {}", self.server_addr);
        self.transport.disconnect();
    }
}

impl ClientTransport for ClientConnection {
    fn send(&mut self, channel: u8, payload: Vec<u8>) {
        if self.client.is_disconnected() {
            error!("Dropping packet on channel {}: not connected", channel);
            return;
        }
        self.client.send_message(channel, payload);
    }
}

//! Best-effort membership notifications to an external relay.
//!
//! The coordinator reports every join, roster update and leave. Failures
//! are logged by the caller and never affect lobby state.

use serde::{Deserialize, Serialize};

use fairway_protocol::ConnectionId;

use crate::session::SessionState;

/// Snapshot of lobby membership
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStatus {
    pub course: String,
    pub host: Option<ConnectionId>,
    pub max_clients: u8,
    pub connections: Vec<ConnectionStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connection_id: ConnectionId,
    pub player_names: Vec<String>,
    pub ready: bool,
}

impl LobbyStatus {
    pub fn from_session(session: &SessionState) -> Self {
        let connections = session
            .slots()
            .filter(|(_, slot)| slot.is_connected())
            .map(|(id, slot)| ConnectionStatus {
                connection_id: id,
                player_names: slot.entry.players.iter().map(|p| p.name.clone()).collect(),
                ready: session.is_ready(id),
            })
            .collect();

        Self {
            course: session.config.course.clone(),
            host: session.host(),
            max_clients: session.max_clients() as u8,
            connections,
        }
    }

    /// MessagePack encoding used for `broadcast_raw`
    pub fn to_bytes(&self) -> Result<Vec<u8>, SideChannelError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SideChannelError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SideChannelError {
    #[error("side channel unavailable: {0}")]
    Unavailable(String),
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// External observer of lobby membership
pub trait SideChannel {
    fn update_status(&mut self, status: &LobbyStatus) -> Result<(), SideChannelError>;

    fn broadcast_raw(&mut self, bytes: &[u8]) -> Result<(), SideChannelError>;
}

/// Discards all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSideChannel;

impl SideChannel for NullSideChannel {
    fn update_status(&mut self, _status: &LobbyStatus) -> Result<(), SideChannelError> {
        Ok(())
    }

    fn broadcast_raw(&mut self, _bytes: &[u8]) -> Result<(), SideChannelError> {
        Ok(())
    }
}

//! Client-side read model of the lobby.
//!
//! [`LobbyMirror::apply`] folds each server packet into local state,
//! raises [`MirrorEvent`]s to registered listeners and returns any packets
//! the client owes the server in reply. Every other outgoing packet comes
//! from a `request_*` builder.

use tracing::{debug, info, warn};

use fairway_protocol::{
    ConnectionId, Packet, PacketId, PeerId, PlayerSlot, RefusalReason, RosterEntry,
    ServerCommand, ServerCommandKind, SessionConfig, StateId, MAX_CLIENTS, MAX_CLUB_LEVEL,
    MAX_PLAYERS_PER_CONNECTION, PROTOCOL_VERSION,
};

use crate::listener::{ListenerId, ListenerRegistry, LobbyListener};

/// Something the mirror observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MirrorEvent {
    /// The server assigned this client a slot
    Accepted(ConnectionId),
    Refused(RefusalReason),
    PeerJoined(ConnectionId),
    PeerLeft(ConnectionId),
    RosterChanged(ConnectionId),
    ReadyChanged { slot: ConnectionId, ready: bool },
    ConfigChanged(PacketId),
    ClubLimitSet(u8),
    StateChanged(StateId),
    WeatherChanged(bool),
    PingUpdated { slot: ConnectionId, rtt_ms: u16 },
    /// The host poked this client
    Poked,
}

/// What this client brings to the lobby
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalProfile {
    pub peer_id: PeerId,
    /// Local players, at most four are sent
    pub players: Vec<PlayerSlot>,
    pub club_level: u8,
    /// Hosting clients ready themselves on accept
    pub hosting: bool,
}

impl Default for LocalProfile {
    fn default() -> Self {
        Self {
            peer_id: PeerId::default(),
            players: Vec::new(),
            club_level: MAX_CLUB_LEVEL,
            hosting: false,
        }
    }
}

pub struct LobbyMirror {
    local: LocalProfile,
    connection: Option<ConnectionId>,
    refusal: Option<RefusalReason>,
    config: SessionConfig,
    rosters: [RosterEntry; MAX_CLIENTS],
    connected: [bool; MAX_CLIENTS],
    ready: [bool; MAX_CLIENTS],
    ping_ms: [u16; MAX_CLIENTS],
    max_clubs: Option<u8>,
    state: StateId,
    raining: bool,
    listeners: ListenerRegistry,
}

impl LobbyMirror {
    pub fn new(local: LocalProfile) -> Self {
        Self {
            local,
            connection: None,
            refusal: None,
            config: SessionConfig::default(),
            rosters: std::array::from_fn(|i| RosterEntry::empty(ConnectionId(i as u8))),
            connected: [false; MAX_CLIENTS],
            ready: [false; MAX_CLIENTS],
            ping_ms: [0; MAX_CLIENTS],
            max_clubs: None,
            state: StateId::Lobby,
            raining: false,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn local(&self) -> &LocalProfile {
        &self.local
    }

    /// Slot assigned by the server, once accepted
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn refusal(&self) -> Option<RefusalReason> {
        self.refusal
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn roster(&self, id: ConnectionId) -> Option<&RosterEntry> {
        self.rosters.get(id.index())
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connected.get(id.index()).copied().unwrap_or(false)
    }

    pub fn is_ready(&self, id: ConnectionId) -> bool {
        self.ready.get(id.index()).copied().unwrap_or(false)
    }

    pub fn ping_ms(&self, id: ConnectionId) -> Option<u16> {
        self.is_connected(id).then(|| self.ping_ms[id.index()])
    }

    /// Club cap announced at game start
    pub fn max_clubs(&self) -> Option<u8> {
        self.max_clubs
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    /// Total players across every connection
    pub fn player_count(&self) -> usize {
        self.rosters.iter().map(RosterEntry::player_count).sum()
    }

    pub fn add_listener(&mut self, listener: Box<dyn LobbyListener>) -> ListenerId {
        self.listeners.register(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// Fold one server packet into the mirror. Returns packets to send back.
    pub fn apply(&mut self, packet: &Packet) -> Vec<Packet> {
        let mut replies = Vec::new();

        let event = match packet {
            Packet::ConnectionAccepted(id) => {
                info!("Accepted into slot {}", id.0);
                self.connection = Some(*id);
                self.refusal = None;
                if let Some(flag) = self.connected.get_mut(id.index()) {
                    *flag = true;
                }
                replies = self.accept_replies(*id);
                Some(MirrorEvent::Accepted(*id))
            }
            Packet::ConnectionRefused(reason) => {
                warn!("Refused by server: {:?}", reason);
                self.refusal = Some(*reason);
                self.connection = None;
                Some(MirrorEvent::Refused(*reason))
            }
            Packet::ClientConnected(id) => self.connected.get_mut(id.index()).map(|flag| {
                *flag = true;
                MirrorEvent::PeerJoined(*id)
            }),
            Packet::ClientDisconnected(id) => (id.index() < MAX_CLIENTS).then(|| {
                self.connected[id.index()] = false;
                self.ready[id.index()] = false;
                self.rosters[id.index()] = RosterEntry::empty(*id);
                MirrorEvent::PeerLeft(*id)
            }),
            Packet::LobbyUpdate(entry) => {
                let id = entry.connection_id;
                self.rosters.get_mut(id.index()).map(|slot| {
                    *slot = entry.clone();
                    MirrorEvent::RosterChanged(id)
                })
            }
            Packet::LobbyReady { slot, ready } => match self.ready.get_mut(slot.index()) {
                Some(current) if *current != *ready => {
                    *current = *ready;
                    Some(MirrorEvent::ReadyChanged {
                        slot: *slot,
                        ready: *ready,
                    })
                }
                _ => None,
            },
            Packet::MaxClubs(limit) => {
                self.max_clubs = Some(*limit);
                Some(MirrorEvent::ClubLimitSet(*limit))
            }
            Packet::StateChange(state) => {
                info!("Server entered {:?}", state);
                self.state = *state;
                Some(MirrorEvent::StateChanged(*state))
            }
            Packet::WeatherChange(raining) => {
                self.raining = *raining;
                Some(MirrorEvent::WeatherChanged(*raining))
            }
            Packet::PingTime { slot, rtt_ms } => {
                self.ping_ms.get_mut(slot.index()).map(|ping| {
                    *ping = *rtt_ms;
                    MirrorEvent::PingUpdated {
                        slot: *slot,
                        rtt_ms: *rtt_ms,
                    }
                })
            }
            Packet::Poke(target) => {
                (self.connection == Some(*target)).then_some(MirrorEvent::Poked)
            }
            other if other.id().is_config() => {
                let before = self.config.clone();
                self.config.apply(other);
                (self.config != before).then(|| MirrorEvent::ConfigChanged(other.id()))
            }
            other => {
                debug!("Ignoring {:?} from server", other.id());
                None
            }
        };

        if let Some(event) = event {
            self.listeners.dispatch(&event);
        }
        replies
    }

    fn accept_replies(&self, id: ConnectionId) -> Vec<Packet> {
        let mut replies = Vec::new();
        if let Some(roster) = self.request_roster_for(id) {
            replies.push(roster);
        }
        replies.push(Packet::ClientVersion(PROTOCOL_VERSION));
        replies.push(Packet::ClubLevel {
            slot: id,
            level: self.local.club_level.min(MAX_CLUB_LEVEL),
        });
        if self.local.hosting {
            replies.push(Packet::LobbyReady {
                slot: id,
                ready: true,
            });
        }
        replies
    }

    fn request_roster_for(&self, id: ConnectionId) -> Option<Packet> {
        if self.local.players.is_empty() {
            return None;
        }
        let players = self
            .local
            .players
            .iter()
            .take(MAX_PLAYERS_PER_CONNECTION)
            .cloned()
            .collect();
        Some(Packet::PlayerInfo(RosterEntry {
            peer_id: self.local.peer_id,
            connection_id: id,
            players,
        }))
    }

    /// Replace the local players and build the roster submission
    pub fn request_players(&mut self, players: Vec<PlayerSlot>) -> Option<Packet> {
        self.local.players = players;
        self.request_roster_for(self.connection?)
    }

    pub fn request_ready(&self, ready: bool) -> Option<Packet> {
        let slot = self.connection?;
        Some(Packet::LobbyReady { slot, ready })
    }

    /// A room setting change. Only the host's requests take effect.
    pub fn request_config(&self, packet: Packet) -> Option<Packet> {
        packet.id().is_config().then_some(packet)
    }

    pub fn request_start(&self) -> Packet {
        Packet::RequestGameStart(StateId::Game)
    }

    pub fn request_poke(&self, target: ConnectionId) -> Packet {
        Packet::ServerCommand(ServerCommand {
            kind: ServerCommandKind::Poke,
            target,
        })
    }

    pub fn request_kick(&self, target: ConnectionId) -> Option<Packet> {
        if self.connection == Some(target) {
            return None;
        }
        Some(Packet::ServerCommand(ServerCommand {
            kind: ServerCommandKind::Kick,
            target,
        }))
    }
}

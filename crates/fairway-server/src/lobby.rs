//! Lobby coordinator.
//!
//! Server-authoritative state machine for the pre-game lobby. Applies
//! roster, readiness and room configuration requests to the session,
//! rebroadcasts the full authoritative state, and reports when the host
//! has started the game.

use tracing::{debug, info, warn};

use fairway_protocol::{
    Authority, ConnectionId, Packet, PacketId, RefusalReason, RosterEntry, ServerCommand,
    ServerCommandKind, StateId, MAX_CLUB_LEVEL,
};

use crate::config::ServerConfig;
use crate::session::SessionState;
use crate::side_channel::{LobbyStatus, NullSideChannel, SideChannel};
use crate::transport::{Transport, TransportEvent};

/// Tunable bounds for one lobby
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LobbyLimits {
    pub max_clients: usize,
    pub max_players_per_connection: usize,
    pub protocol_version: u16,
}

impl From<&ServerConfig> for LobbyLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_clients: config.max_clients as usize,
            max_players_per_connection: config.max_players_per_connection as usize,
            protocol_version: config.protocol_version,
        }
    }
}

impl Default for LobbyLimits {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LobbyState {
    AwaitingStart,
    /// Host started the game; control passes to the requested state
    Starting(StateId),
}

pub struct LobbyCoordinator {
    session: SessionState,
    state: LobbyState,
    limits: LobbyLimits,
    side_channel: Box<dyn SideChannel>,
}

impl LobbyCoordinator {
    /// Create an empty lobby with the given limits
    pub fn new(limits: LobbyLimits) -> Self {
        Self {
            session: SessionState::new(limits.max_clients),
            state: LobbyState::AwaitingStart,
            limits,
            side_channel: Box::new(NullSideChannel),
        }
    }

    /// Report membership changes to `side_channel` instead of discarding them
    pub fn with_side_channel(mut self, side_channel: Box<dyn SideChannel>) -> Self {
        self.side_channel = side_channel;
        self
    }

    /// Authoritative session state
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Whether the host has started the game yet
    pub fn state(&self) -> LobbyState {
        self.state
    }

    /// Limits this lobby was created with
    pub fn limits(&self) -> LobbyLimits {
        self.limits
    }

    /// Designate the host connection. Without this the first accepted
    /// connection becomes host.
    pub fn set_host(&mut self, host: ConnectionId) {
        info!("Slot {} is now host", host.0);
        self.session.set_host(Some(host));
    }

    /// Next process state: `Lobby` until the host's start request succeeds
    pub fn next_state(&self) -> StateId {
        match self.state {
            LobbyState::AwaitingStart => StateId::Lobby,
            LobbyState::Starting(next) => next,
        }
    }

    /// Drain all queued events in receipt order.
    ///
    /// Stops early once the game is starting so later events are handled
    /// by the next state.
    pub fn process<T: Transport>(&mut self, transport: &mut T) -> StateId {
        while self.state == LobbyState::AwaitingStart {
            let Some(event) = transport.poll_event() else {
                break;
            };

            match event {
                TransportEvent::Connected(client_id) => self.handle_connect(client_id, transport),
                TransportEvent::Disconnected(client_id) => {
                    self.handle_disconnect(client_id, transport)
                }
                TransportEvent::Message {
                    client_id, payload, ..
                } => self.handle_message(client_id, &payload, transport),
            }
        }

        self.next_state()
    }

    /// Assign the lowest free slot or refuse with `ServerFull`
    pub fn handle_connect<T: Transport>(&mut self, client_id: u64, transport: &mut T) {
        let Some(id) = self.session.claim_slot(client_id) else {
            info!("Refusing client {}: lobby full", client_id);
            refuse(client_id, RefusalReason::ServerFull, transport);
            return;
        };

        info!("Client {} assigned slot {}", client_id, id.0);
        transport.send_packet(client_id, &Packet::ConnectionAccepted(id));

        // Peers already in the lobby, so a late joiner's mirror is complete
        let present: Vec<ConnectionId> = self
            .session
            .slots()
            .filter(|(other, slot)| *other != id && slot.is_connected())
            .map(|(other, _)| other)
            .collect();
        for other in present {
            transport.send_packet(client_id, &Packet::ClientConnected(other));
        }
        transport.broadcast_packet(&Packet::ClientConnected(id));

        if self.session.host().is_none() {
            self.set_host(id);
        }

        self.notify_side_channel();
    }

    /// Clear the leaving connection's slot and tell everyone
    pub fn handle_disconnect<T: Transport>(&mut self, client_id: u64, transport: &mut T) {
        let Some(id) = self.session.release(client_id) else {
            return;
        };

        info!("Slot {} (client {}) left", id.0, client_id);
        transport.broadcast_packet(&Packet::ClientDisconnected(id));

        if self.state == LobbyState::AwaitingStart {
            transport.broadcast_packet(&Packet::LobbyUpdate(RosterEntry::empty(id)));
            transport.broadcast_packet(&Packet::LobbyReady {
                slot: id,
                ready: false,
            });
        }

        if self.session.is_host(id) {
            let next = self.session.first_connected();
            match next {
                Some(next) => info!("Host left, slot {} is now host", next.0),
                None => info!("Host left, lobby is empty"),
            }
            self.session.set_host(next);
        }

        self.notify_side_channel();
    }

    /// Decode and apply one packet from a connected client.
    ///
    /// Malformed payloads get the sender refused with `BadData`. Packets the
    /// sender is not allowed to send are dropped, except configuration
    /// writes which are answered with the authoritative value.
    pub fn handle_message<T: Transport>(
        &mut self,
        client_id: u64,
        payload: &[u8],
        transport: &mut T,
    ) {
        if self.state != LobbyState::AwaitingStart {
            return;
        }

        let Some(sender) = self.session.connection_of(client_id) else {
            debug!("Ignoring message from unassigned client {}", client_id);
            return;
        };

        let packet = match Packet::decode(payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Malformed packet from slot {}: {}", sender.0, e);
                refuse(client_id, RefusalReason::BadData, transport);
                return;
            }
        };

        let id = packet.id();
        let authorized = self.authorize(sender, id);

        if id.is_config() {
            if authorized {
                self.session.config.apply(&packet);
            }
            // Echo the authoritative value either way
            if let Some(value) = self.session.config.packet_for(id) {
                transport.broadcast_packet(&value);
            }
            return;
        }

        if !authorized {
            return;
        }

        match packet {
            Packet::PlayerInfo(entry) => {
                self.handle_player_info(client_id, sender, entry, transport)
            }
            Packet::LobbyReady { slot, ready } => {
                let slot = ConnectionId(slot.0.min(self.session.max_clients() as u8 - 1));
                self.session.set_ready(slot, ready);
                transport.broadcast_packet(&Packet::LobbyReady { slot, ready });
                self.notify_side_channel();
            }
            Packet::ClubLevel { slot, level } => {
                // Always stored against the reporting connection
                if slot != sender {
                    debug!("Slot {} reported club level for slot {}", sender.0, slot.0);
                }
                self.session.set_club_level(sender, level);
            }
            Packet::RequestGameStart(requested) => {
                self.handle_start_request(requested, transport)
            }
            Packet::ServerCommand(command) => {
                self.handle_server_command(sender, command, transport)
            }
            Packet::ClientVersion(version) => {
                if version != self.limits.protocol_version {
                    warn!(
                        "Slot {} reports version {}, expected {}",
                        sender.0, version, self.limits.protocol_version
                    );
                    refuse(client_id, RefusalReason::VersionMismatch, transport);
                }
            }
            _ => {}
        }
    }

    /// Centralized authority check for client-sent packets
    fn authorize(&self, sender: ConnectionId, id: PacketId) -> bool {
        match id.authority() {
            Authority::AnyPeer => true,
            Authority::HostOnly => {
                let is_host = self.session.is_host(sender);
                if !is_host {
                    debug!("Dropping {:?} from non-host slot {}", id, sender.0);
                }
                is_host
            }
            Authority::ServerOnly => {
                debug!("Dropping server-only {:?} from slot {}", id, sender.0);
                false
            }
        }
    }

    fn handle_player_info<T: Transport>(
        &mut self,
        client_id: u64,
        sender: ConnectionId,
        entry: RosterEntry,
        transport: &mut T,
    ) {
        if entry.player_count() > self.limits.max_players_per_connection {
            warn!(
                "Slot {} sent {} players, limit is {}",
                sender.0,
                entry.player_count(),
                self.limits.max_players_per_connection
            );
            refuse(client_id, RefusalReason::BadData, transport);
            return;
        }

        info!("Slot {} roster: {} players", sender.0, entry.player_count());
        self.session.set_roster(sender, entry);
        self.broadcast_lobby(transport);
        self.notify_side_channel();
    }

    fn handle_start_request<T: Transport>(&mut self, requested: StateId, transport: &mut T) {
        if requested == StateId::Lobby {
            return;
        }

        if !self.session.can_start() {
            info!("Start requested but not every player is ready");
            return;
        }

        if self.session.config.club_limit {
            let limit = self.session.effective_club_limit();
            info!("Club limit {} of {}", limit, MAX_CLUB_LEVEL);
            transport.broadcast_packet(&Packet::MaxClubs(limit));
        }

        info!(
            "Starting game with {} connections",
            self.session.populated().count()
        );
        self.state = LobbyState::Starting(requested);
    }

    fn handle_server_command<T: Transport>(
        &mut self,
        sender: ConnectionId,
        command: ServerCommand,
        transport: &mut T,
    ) {
        let Some(target_client) = self.session.client_of(command.target) else {
            return;
        };

        match command.kind {
            ServerCommandKind::Poke => {
                transport.send_packet(target_client, &Packet::Poke(command.target));
            }
            ServerCommandKind::Kick => {
                if command.target == sender {
                    return;
                }
                info!("Host kicked slot {}", command.target.0);
                refuse(target_client, RefusalReason::Kicked, transport);
            }
        }
    }

    /// Full roster, readiness and room configuration to every peer
    pub fn broadcast_lobby<T: Transport>(&self, transport: &mut T) {
        for (_, slot) in self.session.slots().filter(|(_, s)| s.is_connected()) {
            transport.broadcast_packet(&Packet::LobbyUpdate(slot.entry.clone()));
        }

        for (id, _) in self.session.slots() {
            transport.broadcast_packet(&Packet::LobbyReady {
                slot: id,
                ready: self.session.is_ready(id),
            });
        }

        for packet in self.session.config.packets() {
            transport.broadcast_packet(&packet);
        }
    }

    /// Sample each connection's RTT and broadcast it
    pub fn broadcast_ping_times<T: Transport>(&mut self, transport: &mut T) {
        let connected: Vec<(ConnectionId, u64)> = self
            .session
            .slots()
            .filter_map(|(id, slot)| slot.client_id.map(|client| (id, client)))
            .collect();

        for (id, client_id) in connected {
            let rtt = transport.rtt(client_id).unwrap_or_default();
            self.session.set_rtt(id, rtt);
            transport.broadcast_packet(&Packet::PingTime {
                slot: id,
                rtt_ms: rtt.as_millis().min(u16::MAX as u128) as u16,
            });
        }
    }

    fn notify_side_channel(&mut self) {
        let status = LobbyStatus::from_session(&self.session);
        if let Err(e) = self.side_channel.update_status(&status) {
            warn!("Side channel status update failed: {}", e);
        }

        match status.to_bytes() {
            Ok(bytes) => {
                if let Err(e) = self.side_channel.broadcast_raw(&bytes) {
                    warn!("Side channel broadcast failed: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode lobby status: {}", e),
        }
    }
}

/// Send a refusal and drop the connection once it has gone out
fn refuse<T: Transport>(client_id: u64, reason: RefusalReason, transport: &mut T) {
    transport.send_packet(client_id, &Packet::ConnectionRefused(reason));
    transport.disconnect_later(client_id);
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::loopback::LoopbackTransport;
    use crate::side_channel::SideChannelError;
    use fairway_protocol::{PeerId, PlayerSlot, WeatherType};

    fn roster(names: &[&str]) -> RosterEntry {
        RosterEntry {
            peer_id: PeerId(77),
            connection_id: ConnectionId(0),
            players: names.iter().map(|n| PlayerSlot::named(*n)).collect(),
        }
    }

    fn lobby_with_clients(count: u64) -> (LobbyCoordinator, LoopbackTransport) {
        let mut lobby = LobbyCoordinator::new(LobbyLimits::default());
        let mut transport = LoopbackTransport::new();
        for client in 1..=count {
            transport.connect(client);
        }
        lobby.process(&mut transport);
        transport.clear_sent();
        (lobby, transport)
    }

    #[test]
    fn first_connection_becomes_host() {
        let mut lobby = LobbyCoordinator::new(LobbyLimits::default());
        let mut transport = LoopbackTransport::new();
        transport.connect(10);
        transport.connect(11);
        assert_eq!(lobby.process(&mut transport), StateId::Lobby);

        assert_eq!(lobby.session().host(), Some(ConnectionId(0)));
        assert_eq!(
            transport.packets_to(10)[0],
            Packet::ConnectionAccepted(ConnectionId(0))
        );
        assert!(transport
            .packets_to(10)
            .contains(&Packet::ClientConnected(ConnectionId(1))));
    }

    #[test]
    fn full_lobby_refuses_connection() {
        let mut lobby = LobbyCoordinator::new(LobbyLimits {
            max_clients: 2,
            ..Default::default()
        });
        let mut transport = LoopbackTransport::new();
        for client in 1..=3 {
            transport.connect(client);
        }
        lobby.process(&mut transport);

        assert_eq!(
            transport.packets_to(3).last(),
            Some(&Packet::ConnectionRefused(RefusalReason::ServerFull))
        );
        assert!(!transport
            .packets_to(3)
            .iter()
            .any(|p| matches!(p, Packet::ConnectionAccepted(_))));
        assert_eq!(transport.kicked(), &[3]);
        assert_eq!(lobby.session().connected_count(), 2);
    }

    #[test]
    fn player_info_rebroadcasts_full_state() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(2, &Packet::PlayerInfo(roster(&["Bea"])));
        lobby.process(&mut transport);

        let seen = transport.packets_to(1);
        let updates: Vec<_> = seen
            .iter()
            .filter_map(|p| match p {
                Packet::LobbyUpdate(entry) => Some(entry.connection_id),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![ConnectionId(0), ConnectionId(1)]);

        let ready_count = seen
            .iter()
            .filter(|p| matches!(p, Packet::LobbyReady { .. }))
            .count();
        assert_eq!(ready_count, lobby.session().max_clients());
        assert!(seen.contains(&Packet::WeatherType(WeatherType::Clear)));
        assert!(seen.contains(&Packet::MapInfo(String::new())));
    }

    #[test]
    fn malformed_packet_refuses_and_disconnects() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        let mut bytes = Packet::PlayerInfo(roster(&["Bea"])).encode();
        bytes.pop();
        transport.deliver(2, 1, bytes);
        lobby.process(&mut transport);

        assert_eq!(
            transport.packets_to(2)[0],
            Packet::ConnectionRefused(RefusalReason::BadData)
        );
        assert_eq!(transport.kicked(), &[2]);
        assert_eq!(lobby.session().connection_of(2), None);
    }

    #[test]
    fn too_many_players_for_limits_is_bad_data() {
        let mut lobby = LobbyCoordinator::new(LobbyLimits {
            max_players_per_connection: 2,
            ..Default::default()
        });
        let mut transport = LoopbackTransport::new();
        transport.connect(1);
        transport.deliver_packet(1, &Packet::PlayerInfo(roster(&["A", "B", "C"])));
        lobby.process(&mut transport);

        assert!(transport
            .packets_to(1)
            .contains(&Packet::ConnectionRefused(RefusalReason::BadData)));
    }

    #[test]
    fn non_host_config_change_is_ignored_and_echoed() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(2, &Packet::NightTime(true));
        lobby.process(&mut transport);

        assert!(!lobby.session().config.night_time);
        assert_eq!(transport.packets_to(2), vec![Packet::NightTime(false)]);
    }

    #[test]
    fn host_config_change_is_applied_and_broadcast() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(1, &Packet::MapInfo("Westfield Ridge".into()));
        transport.deliver_packet(1, &Packet::ClubLimit(true));
        lobby.process(&mut transport);

        assert_eq!(lobby.session().config.course, "Westfield Ridge");
        assert!(lobby.session().config.club_limit);
        assert_eq!(
            transport.packets_to(2),
            vec![
                Packet::MapInfo("Westfield Ridge".into()),
                Packet::ClubLimit(true)
            ]
        );
    }

    #[test]
    fn server_only_packets_from_clients_are_dropped() {
        let (mut lobby, mut transport) = lobby_with_clients(1);
        transport.deliver_packet(1, &Packet::MaxClubs(0));
        transport.deliver_packet(1, &Packet::StateChange(StateId::Game));
        lobby.process(&mut transport);
        assert!(transport.sent().is_empty());
        assert_eq!(lobby.state(), LobbyState::AwaitingStart);
    }

    #[test]
    fn ready_toggle_is_clamped_and_rebroadcast() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(
            2,
            &Packet::LobbyReady {
                slot: ConnectionId(200),
                ready: true,
            },
        );
        lobby.process(&mut transport);

        assert!(lobby.session().is_ready(ConnectionId(7)));
        assert_eq!(
            transport.packets_to(1),
            vec![Packet::LobbyReady {
                slot: ConnectionId(7),
                ready: true
            }]
        );
    }

    #[test]
    fn club_level_is_stored_without_broadcast() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(
            2,
            &Packet::ClubLevel {
                slot: ConnectionId(1),
                level: 0,
            },
        );
        lobby.process(&mut transport);

        assert_eq!(lobby.session().slot(ConnectionId(1)).unwrap().club_level, 0);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn club_level_lands_in_reporting_slot() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(
            2,
            &Packet::ClubLevel {
                slot: ConnectionId(0),
                level: 0,
            },
        );
        lobby.process(&mut transport);

        let session = lobby.session();
        assert_eq!(session.slot(ConnectionId(0)).unwrap().club_level, MAX_CLUB_LEVEL);
        assert_eq!(session.slot(ConnectionId(1)).unwrap().club_level, 0);
    }

    #[test]
    fn late_joiner_learns_existing_peers() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.connect(3);
        lobby.process(&mut transport);

        assert_eq!(
            transport.packets_to(3),
            vec![
                Packet::ConnectionAccepted(ConnectionId(2)),
                Packet::ClientConnected(ConnectionId(0)),
                Packet::ClientConnected(ConnectionId(1)),
                Packet::ClientConnected(ConnectionId(2)),
            ]
        );
        assert_eq!(
            transport.packets_to(1),
            vec![Packet::ClientConnected(ConnectionId(2))]
        );
    }

    #[test]
    fn start_from_non_host_is_ignored() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.deliver_packet(1, &Packet::PlayerInfo(roster(&["Host"])));
        transport.deliver_packet(2, &Packet::PlayerInfo(roster(&["Guest"])));
        transport.deliver_packet(
            2,
            &Packet::LobbyReady {
                slot: ConnectionId(1),
                ready: true,
            },
        );
        transport.deliver_packet(2, &Packet::RequestGameStart(StateId::Game));
        assert_eq!(lobby.process(&mut transport), StateId::Lobby);

        transport.deliver_packet(1, &Packet::RequestGameStart(StateId::Game));
        assert_eq!(lobby.process(&mut transport), StateId::Game);
        assert_eq!(lobby.state(), LobbyState::Starting(StateId::Game));
    }

    #[test]
    fn start_with_club_limit_broadcasts_minimum() {
        let (mut lobby, mut transport) = lobby_with_clients(3);
        for (client, level) in [(1u64, 2u8), (2, 0), (3, 1)] {
            let slot = lobby.session().connection_of(client).unwrap();
            transport.deliver_packet(client, &Packet::PlayerInfo(roster(&["P"])));
            transport.deliver_packet(client, &Packet::ClubLevel { slot, level });
            transport.deliver_packet(client, &Packet::LobbyReady { slot, ready: true });
        }
        transport.deliver_packet(1, &Packet::ClubLimit(true));
        lobby.process(&mut transport);
        transport.clear_sent();

        transport.deliver_packet(1, &Packet::RequestGameStart(StateId::Game));
        assert_eq!(lobby.process(&mut transport), StateId::Game);
        assert_eq!(transport.packets_to(2), vec![Packet::MaxClubs(0)]);
    }

    #[test]
    fn events_after_start_are_left_for_next_state() {
        let (mut lobby, mut transport) = lobby_with_clients(1);
        transport.deliver_packet(1, &Packet::PlayerInfo(roster(&["Solo"])));
        transport.deliver_packet(1, &Packet::RequestGameStart(StateId::Game));
        transport.connect(9);
        assert_eq!(lobby.process(&mut transport), StateId::Game);
        assert_eq!(transport.poll_event(), Some(TransportEvent::Connected(9)));
    }

    #[test]
    fn disconnect_broadcasts_cleared_entry_and_reassigns_host() {
        let (mut lobby, mut transport) = lobby_with_clients(3);
        transport.deliver_packet(1, &Packet::PlayerInfo(roster(&["Host"])));
        transport.disconnect(1);
        lobby.process(&mut transport);

        let seen = transport.packets_to(2);
        assert!(seen.contains(&Packet::ClientDisconnected(ConnectionId(0))));
        assert!(seen.contains(&Packet::LobbyUpdate(RosterEntry::empty(ConnectionId(0)))));
        assert!(seen.contains(&Packet::LobbyReady {
            slot: ConnectionId(0),
            ready: false
        }));
        assert_eq!(lobby.session().host(), Some(ConnectionId(1)));
    }

    #[test]
    fn poke_and_kick_are_host_commands() {
        let (mut lobby, mut transport) = lobby_with_clients(3);
        let poke = ServerCommand {
            kind: ServerCommandKind::Poke,
            target: ConnectionId(2),
        };
        let kick = ServerCommand {
            kind: ServerCommandKind::Kick,
            target: ConnectionId(1),
        };

        // Guest cannot kick
        transport.deliver_packet(3, &Packet::ServerCommand(kick));
        lobby.process(&mut transport);
        assert!(transport.kicked().is_empty());

        transport.deliver_packet(1, &Packet::ServerCommand(poke));
        transport.deliver_packet(1, &Packet::ServerCommand(kick));
        lobby.process(&mut transport);

        assert!(transport.packets_to(3).contains(&Packet::Poke(ConnectionId(2))));
        assert!(transport
            .packets_to(2)
            .contains(&Packet::ConnectionRefused(RefusalReason::Kicked)));
        assert_eq!(transport.kicked(), &[2]);
    }

    #[test]
    fn host_cannot_kick_itself() {
        let (mut lobby, mut transport) = lobby_with_clients(1);
        transport.deliver_packet(
            1,
            &Packet::ServerCommand(ServerCommand {
                kind: ServerCommandKind::Kick,
                target: ConnectionId(0),
            }),
        );
        lobby.process(&mut transport);
        assert!(transport.kicked().is_empty());
    }

    #[test]
    fn version_mismatch_is_refused() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        let expected = lobby.limits().protocol_version;
        transport.deliver_packet(1, &Packet::ClientVersion(expected));
        transport.deliver_packet(2, &Packet::ClientVersion(expected + 1));
        lobby.process(&mut transport);

        assert_eq!(
            transport.packets_to(2)[0],
            Packet::ConnectionRefused(RefusalReason::VersionMismatch)
        );
        assert_eq!(transport.kicked(), &[2]);
    }

    #[test]
    fn ping_times_use_transport_rtt() {
        let (mut lobby, mut transport) = lobby_with_clients(2);
        transport.set_rtt(2, std::time::Duration::from_millis(87));
        lobby.broadcast_ping_times(&mut transport);

        assert!(transport.packets_to(1).contains(&Packet::PingTime {
            slot: ConnectionId(1),
            rtt_ms: 87
        }));
        assert_eq!(
            lobby.session().slot(ConnectionId(1)).unwrap().rtt,
            std::time::Duration::from_millis(87)
        );
    }

    struct Recorder {
        statuses: Rc<RefCell<Vec<LobbyStatus>>>,
        fail: bool,
    }

    impl SideChannel for Recorder {
        fn update_status(&mut self, status: &LobbyStatus) -> Result<(), SideChannelError> {
            self.statuses.borrow_mut().push(status.clone());
            Ok(())
        }

        fn broadcast_raw(&mut self, _bytes: &[u8]) -> Result<(), SideChannelError> {
            if self.fail {
                return Err(SideChannelError::Unavailable("offline".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn side_channel_sees_membership_changes_and_failures_are_ignored() {
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let mut lobby = LobbyCoordinator::new(LobbyLimits::default()).with_side_channel(Box::new(
            Recorder {
                statuses: statuses.clone(),
                fail: true,
            },
        ));
        let mut transport = LoopbackTransport::new();
        transport.connect(1);
        transport.deliver_packet(1, &Packet::PlayerInfo(roster(&["Ann"])));
        transport.disconnect(1);
        lobby.process(&mut transport);

        let statuses = statuses.borrow();
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[1].connections[0].player_names, vec!["Ann".to_string()]);
        assert!(statuses[2].connections.is_empty());
    }

    #[test]
    fn side_channel_sees_ready_changes() {
        let statuses = Rc::new(RefCell::new(Vec::new()));
        let mut lobby = LobbyCoordinator::new(LobbyLimits::default()).with_side_channel(Box::new(
            Recorder {
                statuses: statuses.clone(),
                fail: false,
            },
        ));
        let mut transport = LoopbackTransport::new();
        transport.connect(1);
        transport.connect(2);
        transport.deliver_packet(
            2,
            &Packet::LobbyReady {
                slot: ConnectionId(1),
                ready: true,
            },
        );
        lobby.process(&mut transport);

        let statuses = statuses.borrow();
        let last = statuses.last().unwrap();
        assert!(!last.connections[0].ready);
        assert!(last.connections[1].ready);
    }
}

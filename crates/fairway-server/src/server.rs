//! Server runner.
//!
//! Owns the lobby coordinator, voice relay and weather director and drives
//! them once per tick against the game and voice transports.

use std::time::Duration;

use tracing::{debug, info};

use fairway_protocol::{ConnectionId, Packet, RefusalReason, StateId, WeatherType};

use crate::config::ServerConfig;
use crate::lobby::{LobbyCoordinator, LobbyLimits};
use crate::side_channel::SideChannel;
use crate::transport::{Transport, TransportEvent};
use crate::voice::VoiceRelay;
use crate::weather::WeatherDirector;

/// Interval between ping time broadcasts
pub const NET_FRAME: Duration = Duration::from_millis(50);

pub struct Server {
    config: ServerConfig,
    lobby: LobbyCoordinator,
    voice: VoiceRelay,
    /// Running only during play with showers selected
    weather: Option<WeatherDirector>,
    phase: StateId,
    net_accumulator: Duration,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let limits = LobbyLimits::from(&config);
        Self {
            lobby: LobbyCoordinator::new(limits),
            voice: VoiceRelay::new(limits.max_clients),
            weather: None,
            phase: StateId::Lobby,
            net_accumulator: Duration::ZERO,
            config,
        }
    }

    pub fn with_side_channel(mut self, side_channel: Box<dyn SideChannel>) -> Self {
        self.lobby = self.lobby.with_side_channel(side_channel);
        self
    }

    /// Designate the hosting connection
    pub fn set_host(&mut self, host: ConnectionId) {
        self.lobby.set_host(host);
    }

    pub fn phase(&self) -> StateId {
        self.phase
    }

    pub fn lobby(&self) -> &LobbyCoordinator {
        &self.lobby
    }

    pub fn voice(&self) -> &VoiceRelay {
        &self.voice
    }

    pub fn weather(&self) -> Option<&WeatherDirector> {
        self.weather.as_ref()
    }

    /// Run one tick
    pub fn update<G: Transport, V: Transport>(
        &mut self,
        delta: Duration,
        game: &mut G,
        voice: &mut V,
    ) {
        match self.phase {
            StateId::Lobby => {
                let next = self.lobby.process(game);
                if next != StateId::Lobby {
                    self.enter(next, game);
                }
            }
            StateId::Game => self.process_in_game(game),
        }

        self.voice.process(voice);

        if let Some(weather) = &mut self.weather {
            weather.update(delta, game);
        }

        self.net_accumulator += delta;
        if self.net_accumulator >= NET_FRAME {
            self.net_accumulator = Duration::ZERO;
            self.lobby.broadcast_ping_times(game);
        }
    }

    fn enter<G: Transport>(&mut self, next: StateId, game: &mut G) {
        info!("Entering {:?}", next);
        game.broadcast_packet(&Packet::StateChange(next));
        self.phase = next;

        if next == StateId::Game && self.lobby.session().config.weather_type == WeatherType::Showers
        {
            info!("Showers selected, starting weather director");
            self.weather = Some(WeatherDirector::new(&self.config.weather));
        }
    }

    fn process_in_game<G: Transport>(&mut self, game: &mut G) {
        while let Some(event) = game.poll_event() {
            match event {
                TransportEvent::Connected(client_id) => {
                    info!("Refusing client {}: game in progress", client_id);
                    game.send_packet(
                        client_id,
                        &Packet::ConnectionRefused(RefusalReason::NotInLobby),
                    );
                    game.disconnect_later(client_id);
                }
                TransportEvent::Disconnected(client_id) => {
                    self.lobby.handle_disconnect(client_id, game);
                }
                TransportEvent::Message { client_id, .. } => {
                    debug!("Ignoring in-game message from client {}", client_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackTransport;
    use fairway_protocol::{PeerId, PlayerSlot, RosterEntry, VoiceChannelId};

    fn roster(name: &str) -> Packet {
        Packet::PlayerInfo(RosterEntry {
            peer_id: PeerId(9),
            connection_id: ConnectionId(0),
            players: vec![PlayerSlot::named(name)],
        })
    }

    fn started(weather: WeatherType) -> (Server, LoopbackTransport, LoopbackTransport) {
        let mut server = Server::new(ServerConfig::default());
        let mut game = LoopbackTransport::new();
        let mut voice = LoopbackTransport::new();

        game.connect(1);
        game.connect(2);
        server.update(Duration::ZERO, &mut game, &mut voice);

        game.deliver_packet(1, &roster("Host"));
        game.deliver_packet(2, &roster("Guest"));
        game.deliver_packet(1, &Packet::WeatherType(weather));
        game.deliver_packet(
            2,
            &Packet::LobbyReady {
                slot: ConnectionId(1),
                ready: true,
            },
        );
        game.deliver_packet(1, &Packet::RequestGameStart(StateId::Game));
        server.update(Duration::ZERO, &mut game, &mut voice);
        (server, game, voice)
    }

    #[test]
    fn start_broadcasts_state_change() {
        let (server, game, _) = started(WeatherType::Clear);
        assert_eq!(server.phase(), StateId::Game);
        assert!(game
            .packets_to(2)
            .contains(&Packet::StateChange(StateId::Game)));
        assert!(server.weather().is_none());
    }

    #[test]
    fn showers_start_weather_director() {
        let (server, _, _) = started(WeatherType::Showers);
        let weather = server.weather().unwrap();
        assert!(!weather.is_raining());
    }

    #[test]
    fn in_game_connections_are_refused() {
        let (mut server, mut game, mut voice) = started(WeatherType::Clear);
        game.clear_sent();

        game.connect(3);
        server.update(Duration::ZERO, &mut game, &mut voice);
        assert_eq!(
            game.packets_to(3),
            vec![Packet::ConnectionRefused(RefusalReason::NotInLobby)]
        );
        assert_eq!(game.kicked(), &[3]);
    }

    #[test]
    fn in_game_disconnect_clears_slot() {
        let (mut server, mut game, mut voice) = started(WeatherType::Clear);
        game.clear_sent();

        game.disconnect(2);
        server.update(Duration::ZERO, &mut game, &mut voice);
        assert!(!server
            .lobby()
            .session()
            .slot(ConnectionId(1))
            .unwrap()
            .is_connected());
        assert!(game
            .packets_to(1)
            .contains(&Packet::ClientDisconnected(ConnectionId(1))));
    }

    #[test]
    fn ping_times_follow_net_frame() {
        let mut server = Server::new(ServerConfig::default());
        let mut game = LoopbackTransport::new();
        let mut voice = LoopbackTransport::new();
        game.connect(1);
        game.set_rtt(1, Duration::from_millis(42));
        server.update(Duration::ZERO, &mut game, &mut voice);
        game.clear_sent();

        server.update(Duration::from_millis(20), &mut game, &mut voice);
        assert!(game.sent().is_empty());

        server.update(Duration::from_millis(30), &mut game, &mut voice);
        assert_eq!(
            game.packets_to(1),
            vec![Packet::PingTime {
                slot: ConnectionId(0),
                rtt_ms: 42,
            }]
        );
    }

    #[test]
    fn voice_runs_alongside_lobby() {
        let mut server = Server::new(ServerConfig::default());
        let mut game = LoopbackTransport::new();
        let mut voice = LoopbackTransport::new();
        voice.connect(50);
        server.update(Duration::ZERO, &mut game, &mut voice);
        assert_eq!(
            server.voice().channel_of(50),
            Some(VoiceChannelId(0))
        );
    }
}

//! Authoritative session state.
//!
//! Connection slots are cleared on disconnect, never removed, so slot
//! indices stay stable for the life of the session.

use std::time::Duration;

use fairway_protocol::{ConnectionId, RosterEntry, SessionConfig, MAX_CLIENTS, MAX_CLUB_LEVEL};

/// Server-side record for one connection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSlot {
    /// Transport client id while connected
    pub client_id: Option<u64>,
    /// Last roster submitted by this connection
    pub entry: RosterEntry,
    pub rtt: Duration,
    /// Reported club capability tier (0-2)
    pub club_level: u8,
}

impl ConnectionSlot {
    fn new(id: ConnectionId) -> Self {
        Self {
            client_id: None,
            entry: RosterEntry::empty(id),
            rtt: Duration::ZERO,
            club_level: MAX_CLUB_LEVEL,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client_id.is_some()
    }

    pub fn player_count(&self) -> usize {
        self.entry.player_count()
    }

    /// Connected with at least one player
    pub fn is_populated(&self) -> bool {
        self.is_connected() && self.player_count() > 0
    }

    fn clear(&mut self) {
        *self = Self::new(self.entry.connection_id);
    }
}

/// Room configuration, roster and readiness for one hosted session
#[derive(Clone, Debug)]
pub struct SessionState {
    pub config: SessionConfig,
    slots: [ConnectionSlot; MAX_CLIENTS],
    ready: [bool; MAX_CLIENTS],
    host: Option<ConnectionId>,
    /// Slots beyond this are never assigned
    max_clients: usize,
}

impl SessionState {
    pub fn new(max_clients: usize) -> Self {
        Self {
            config: SessionConfig::default(),
            slots: std::array::from_fn(|i| ConnectionSlot::new(ConnectionId(i as u8))),
            ready: [false; MAX_CLIENTS],
            host: None,
            max_clients: max_clients.clamp(1, MAX_CLIENTS),
        }
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    pub fn slot(&self, id: ConnectionId) -> Option<&ConnectionSlot> {
        self.slots[..self.max_clients].get(id.index())
    }

    /// Assignable slots with their ids
    pub fn slots(&self) -> impl Iterator<Item = (ConnectionId, &ConnectionSlot)> {
        self.slots[..self.max_clients]
            .iter()
            .enumerate()
            .map(|(i, slot)| (ConnectionId(i as u8), slot))
    }

    /// Connected slots with at least one player
    pub fn populated(&self) -> impl Iterator<Item = (ConnectionId, &ConnectionSlot)> {
        self.slots().filter(|(_, slot)| slot.is_populated())
    }

    pub fn connection_of(&self, client_id: u64) -> Option<ConnectionId> {
        self.slots()
            .find(|(_, slot)| slot.client_id == Some(client_id))
            .map(|(id, _)| id)
    }

    pub fn client_of(&self, id: ConnectionId) -> Option<u64> {
        self.slot(id).and_then(|slot| slot.client_id)
    }

    pub fn connected_count(&self) -> usize {
        self.slots().filter(|(_, slot)| slot.is_connected()).count()
    }

    /// Assign the lowest free slot
    pub fn claim_slot(&mut self, client_id: u64) -> Option<ConnectionId> {
        if let Some(existing) = self.connection_of(client_id) {
            return Some(existing);
        }

        let index = self.slots[..self.max_clients]
            .iter()
            .position(|slot| !slot.is_connected())?;
        let id = ConnectionId(index as u8);

        self.slots[index].clear();
        self.slots[index].client_id = Some(client_id);
        self.ready[index] = false;
        Some(id)
    }

    /// Clear the slot owned by `client_id`, returning its id
    pub fn release(&mut self, client_id: u64) -> Option<ConnectionId> {
        let id = self.connection_of(client_id)?;
        self.slots[id.index()].clear();
        self.ready[id.index()] = false;
        Some(id)
    }

    /// Store a roster submission. The entry is re-tagged with the slot id.
    pub fn set_roster(&mut self, id: ConnectionId, mut entry: RosterEntry) {
        if let Some(slot) = self.slots[..self.max_clients].get_mut(id.index()) {
            entry.connection_id = id;
            slot.entry = entry;
        }
    }

    pub fn is_ready(&self, id: ConnectionId) -> bool {
        self.ready.get(id.index()).copied().unwrap_or(false)
    }

    pub fn set_ready(&mut self, id: ConnectionId, ready: bool) {
        if id.index() < self.max_clients {
            self.ready[id.index()] = ready;
        }
    }

    pub fn set_club_level(&mut self, id: ConnectionId, level: u8) {
        if let Some(slot) = self.slots[..self.max_clients].get_mut(id.index()) {
            slot.club_level = level.min(MAX_CLUB_LEVEL);
        }
    }

    pub fn set_rtt(&mut self, id: ConnectionId, rtt: Duration) {
        if let Some(slot) = self.slots[..self.max_clients].get_mut(id.index()) {
            slot.rtt = rtt;
        }
    }

    pub fn host(&self) -> Option<ConnectionId> {
        self.host
    }

    pub fn set_host(&mut self, host: Option<ConnectionId>) {
        self.host = host;
    }

    pub fn is_host(&self, id: ConnectionId) -> bool {
        self.host == Some(id)
    }

    /// Lowest connected slot, used when the host leaves
    pub fn first_connected(&self) -> Option<ConnectionId> {
        self.slots()
            .find(|(_, slot)| slot.is_connected())
            .map(|(id, _)| id)
    }

    /// Connections with at least one non-bot player
    pub fn human_connection_count(&self) -> usize {
        self.populated()
            .filter(|(_, slot)| slot.entry.has_human())
            .count()
    }

    /// Every populated slot except the host is ready, and the number of
    /// human connections suits the score type.
    pub fn can_start(&self) -> bool {
        let all_ready = self
            .populated()
            .all(|(id, _)| self.is_host(id) || self.is_ready(id));

        all_ready
            && self
                .config
                .score_type
                .connection_bounds()
                .contains(&self.human_connection_count())
    }

    /// Minimum club level over populated slots
    pub fn effective_club_limit(&self) -> u8 {
        self.populated()
            .map(|(_, slot)| slot.club_level)
            .min()
            .unwrap_or(MAX_CLUB_LEVEL)
    }
}

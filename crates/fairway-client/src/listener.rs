//! Listener registry for mirror events.

use crate::mirror::MirrorEvent;

/// Handle returned by [`ListenerRegistry::register`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u32);

/// Receives lobby changes as the mirror applies them
pub trait LobbyListener {
    fn on_event(&mut self, event: &MirrorEvent);
}

impl<F: FnMut(&MirrorEvent)> LobbyListener for F {
    fn on_event(&mut self, event: &MirrorEvent) {
        self(event)
    }
}

/// Listeners keyed by id, dispatched in registration order
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u32,
    listeners: Vec<(ListenerId, Box<dyn LobbyListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Box<dyn LobbyListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.listeners.push((id, listener));
        id
    }

    /// Returns false if the id was not registered
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, event: &MirrorEvent) {
        for (_, listener) in &mut self.listeners {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

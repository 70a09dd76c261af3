//! Role- and chirality-scoped fan-out of classified actions.
//!
//! Subscribers are injected by whoever builds the engine; there are no
//! global event hubs. Delivery is synchronous: [`InteractionManager::dispatch`]
//! returns only after every interested subscriber has seen the action, so
//! actions from one frame are fully delivered before the next frame's.

use handcursor_proto::{Chirality, HandType, InputAction};

/// Receives dispatched actions.
pub trait ActionSubscriber: Send {
    /// Called once per action routed to this subscriber's channel.
    fn on_action(&mut self, action: &InputAction);
}

impl<F> ActionSubscriber for F
where
    F: FnMut(&InputAction) + Send,
{
    fn on_action(&mut self, action: &InputAction) {
        self(action);
    }
}

/// Subscription scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Every action.
    All,
    /// Actions from the primary hand.
    Primary,
    /// Actions from a left hand.
    Left,
    /// Actions from a right hand.
    Right,
}

impl Channel {
    /// Channels an action from `role` is delivered on, in delivery order.
    pub fn route(role: HandType, action: &InputAction) -> impl Iterator<Item = Self> {
        let role_channel = (role == HandType::Primary).then_some(Self::Primary);
        let chirality_channel = match action.chirality {
            Chirality::Left => Some(Self::Left),
            Chirality::Right => Some(Self::Right),
            Chirality::Unknown => None,
        };
        std::iter::once(Self::All).chain(role_channel).chain(chirality_channel)
    }

    const fn slot(self) -> usize {
        match self {
            Self::All => 0,
            Self::Primary => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }
}

/// Fan-out over the four [`Channel`]s.
#[derive(Default)]
pub struct InteractionManager {
    channels: [Vec<Box<dyn ActionSubscriber>>; 4],
}

impl std::fmt::Debug for InteractionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionManager")
            .field("subscribers", &self.channels.iter().map(Vec::len).collect::<Vec<_>>())
            .finish()
    }
}

impl InteractionManager {
    /// Manager with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` on `channel`. Subscribers on one channel are
    /// called in registration order.
    pub fn subscribe(&mut self, channel: Channel, subscriber: impl ActionSubscriber + 'static) {
        self.channels[channel.slot()].push(Box::new(subscriber));
    }

    /// Number of subscribers on `channel`.
    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.channels[channel.slot()].len()
    }

    /// Deliver `action` from a hand in `role`: ALL, then PRIMARY if
    /// applicable, then LEFT or RIGHT by chirality.
    pub fn dispatch(&mut self, role: HandType, action: &InputAction) {
        for channel in Channel::route(role, action) {
            for subscriber in &mut self.channels[channel.slot()] {
                subscriber.on_action(action);
            }
        }
    }
}

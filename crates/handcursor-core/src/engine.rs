//! Per-tick orchestration.
//!
//! The engine is the single consumer of sensor events. For every frame it
//! assigns hand roles, runs each tracked hand through its
//! [`PositioningModule`] and [`InteractionClassifier`], filters the result
//! through the [`PluginChain`] and hands it to the [`InteractionManager`].
//!
//! # Architecture: Action-Based State Machine
//!
//! - Time comes from sensor timestamps; the engine never reads a clock.
//! - I/O is injected: a [`ConfigLoader`] for reloads, subscribers for
//!   actions, a [`ConfigSnapshot`] and [`SharedStatus`] for readers on
//!   other threads.
//! - Anything the driver must act on beyond input actions comes back as
//!   [`EngineAction`]s.
//!
//! # Tracking state
//!
//! ```text
//! ┌─────────────┐  Connected   ┌───────────┐
//! │ Unavailable │─────────────>│ Connected │
//! └─────────────┘<─────────────└───────────┘
//!                 Disconnected
//!                 (CANCEL active presses, then HANDS_LOST)
//! ```
//!
//! Frames received while unavailable are dropped.
//!
//! # Interaction zone
//!
//! When the zone is enabled, a hand outside it is not classified unless it
//! is holding a press. Leaving the zone resets the classifier, so a dwell or
//! push can only begin inside the zone and every DOWN that reaches a
//! subscriber is later followed by UP or CANCEL.
//!
//! # Configuration
//!
//! Each call to [`Engine::handle`] or [`Engine::idle`] first drains queued
//! [`EngineCommand`]s and then the [`DirtyFlag`]. Configuration therefore
//! only changes between ticks, never during one.

use std::sync::mpsc::{Receiver, TryRecvError};

use handcursor_proto::{
    Chirality, HandType, InputAction,
    payloads::{
        presence::{HandPresenceEvent, HandPresenceState},
        status::{ConfigurationStatus, TrackingServiceState},
    },
};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{ConfigBundle, ConfigLoader, ConfigSnapshot, ConfigStore, DirtyFlag},
    dispatch::InteractionManager,
    hand::{HandFrame, SensorEvent},
    interaction::{ClassifierInput, InteractionClassifier, classifier_for},
    plugin::{InteractionZone, PluginChain},
    positioning::PositioningModule,
    roles::{HandRoles, RoleEvent},
    status::SharedStatus,
};

/// Requests submitted to the engine from other threads.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Replace the live configuration. The bundle is validated again on
    /// the tick thread before use.
    ApplyConfig(ConfigBundle),
}

/// Side effects for the driver to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAction {
    /// Broadcast a presence change.
    HandPresence(HandPresenceEvent),
    /// A new configuration generation took effect.
    ConfigReloaded {
        /// Generation now in effect.
        generation: u64,
    },
}

/// Classification state for one hand role.
struct HandSlot {
    positioning: PositioningModule,
    classifier: Box<dyn InteractionClassifier>,
    chirality: Chirality,
}

impl HandSlot {
    fn new(bundle: &ConfigBundle) -> Self {
        Self {
            positioning: PositioningModule::new(bundle),
            classifier: classifier_for(bundle.interaction.interaction_type),
            chirality: Chirality::Unknown,
        }
    }
}

/// Turns sensor events into dispatched input actions.
pub struct Engine {
    store: ConfigStore,
    manager: InteractionManager,
    plugins: PluginChain,
    zone: Option<InteractionZone>,
    roles: HandRoles,
    /// Indexed by [`HandRoles::slot_index`].
    slots: [HandSlot; 2],
    connected: bool,
    last_timestamp_us: i64,

    loader: Option<Box<dyn ConfigLoader>>,
    dirty: Option<DirtyFlag>,
    commands: Option<Receiver<EngineCommand>>,
    snapshot: Option<ConfigSnapshot>,
    status: Option<SharedStatus>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("generation", &self.store.generation())
            .field("connected", &self.connected)
            .field("roles", &self.roles)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Engine in the unavailable state with `bundle` as generation 0.
    pub fn new(bundle: ConfigBundle, manager: InteractionManager) -> Self {
        let slots = [HandSlot::new(&bundle), HandSlot::new(&bundle)];
        Self {
            plugins: PluginChain::from_config(&bundle.interaction),
            zone: InteractionZone::from_config(&bundle.interaction),
            store: ConfigStore::new(bundle),
            manager,
            roles: HandRoles::new(),
            slots,
            connected: false,
            last_timestamp_us: 0,
            loader: None,
            dirty: None,
            commands: None,
            snapshot: None,
            status: None,
        }
    }

    /// Reload through `loader` whenever the dirty flag is raised.
    #[must_use]
    pub fn with_loader(mut self, loader: impl ConfigLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Watch `flag` for reload requests.
    #[must_use]
    pub fn with_dirty_flag(mut self, flag: DirtyFlag) -> Self {
        self.dirty = Some(flag);
        self
    }

    /// Accept commands from `commands`.
    #[must_use]
    pub fn with_commands(mut self, commands: Receiver<EngineCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Publish every configuration change to `snapshot`.
    #[must_use]
    pub fn with_snapshot(mut self, snapshot: ConfigSnapshot) -> Self {
        snapshot.publish(self.store.bundle().clone());
        self.snapshot = Some(snapshot);
        self
    }

    /// Report tracking and configuration health to `status`.
    #[must_use]
    pub fn with_status(mut self, status: SharedStatus) -> Self {
        status.set_tracking(self.tracking_state());
        self.status = Some(status);
        self
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ConfigBundle {
        self.store.bundle()
    }

    /// Generation of the configuration in effect.
    pub fn generation(&self) -> u64 {
        self.store.generation()
    }

    /// Whether the sensor is connected.
    pub fn tracking_state(&self) -> TrackingServiceState {
        if self.connected { TrackingServiceState::Connected } else { TrackingServiceState::Unavailable }
    }

    /// Number of hands holding a role.
    pub fn hand_count(&self) -> usize {
        self.roles.count()
    }

    /// Process one sensor event.
    pub fn handle(&mut self, event: SensorEvent) -> Vec<EngineAction> {
        let mut actions = self.refresh();
        match event {
            SensorEvent::Frame(frame) => self.on_frame(&frame, &mut actions),
            SensorEvent::Connected => self.on_connected(),
            SensorEvent::Disconnected => self.on_disconnected(&mut actions),
        }
        actions
    }

    /// No sensor event arrived this poll interval; still apply pending
    /// configuration.
    pub fn idle(&mut self) -> Vec<EngineAction> {
        self.refresh()
    }

    /// Replace the configuration directly, as if commanded.
    pub fn apply_config(&mut self, bundle: ConfigBundle) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        self.apply(bundle, &mut actions);
        actions
    }

    fn refresh(&mut self) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        while let Some(command) = self.next_command() {
            match command {
                EngineCommand::ApplyConfig(bundle) => self.apply(bundle, &mut actions),
            }
        }

        if self.dirty.as_ref().is_some_and(DirtyFlag::take) {
            self.reload(&mut actions);
        }
        actions
    }

    fn next_command(&mut self) -> Option<EngineCommand> {
        let commands = self.commands.as_ref()?;
        match commands.try_recv() {
            Ok(command) => Some(command),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                debug!("engine command channel closed");
                self.commands = None;
                None
            },
        }
    }

    fn reload(&mut self, actions: &mut Vec<EngineAction>) {
        let Some(loader) = self.loader.as_mut() else {
            trace!("dirty flag raised without a loader");
            return;
        };
        match loader.load() {
            Ok(bundle) => {
                self.apply(bundle, actions);
                self.set_configuration_status(ConfigurationStatus::Loaded);
            },
            Err(error) => {
                warn!(%error, generation = self.store.generation(), "reload failed, keeping current configuration");
                self.set_configuration_status(ConfigurationStatus::Errored);
            },
        }
    }

    fn apply(&mut self, bundle: ConfigBundle, actions: &mut Vec<EngineAction>) {
        if let Err(error) = bundle.validate() {
            warn!(%error, "rejected configuration");
            return;
        }

        let kind = bundle.interaction.interaction_type;
        if kind != self.store.bundle().interaction.interaction_type {
            info!(?kind, "interaction type changed");
            for role in [HandType::Secondary, HandType::Primary] {
                self.release_press(role);
            }
            for slot in &mut self.slots {
                slot.classifier = classifier_for(kind);
            }
        }

        for slot in &mut self.slots {
            slot.positioning.configure(&bundle);
        }
        self.plugins = PluginChain::from_config(&bundle.interaction);
        self.zone = InteractionZone::from_config(&bundle.interaction);
        if let Some(snapshot) = &self.snapshot {
            snapshot.publish(bundle.clone());
        }
        let generation = self.store.replace(bundle);
        info!(generation, "configuration applied");
        actions.push(EngineAction::ConfigReloaded { generation });
    }

    fn on_connected(&mut self) {
        if self.connected {
            return;
        }
        info!("tracking connected");
        self.roles = HandRoles::new();
        let bundle = self.store.bundle();
        self.slots = [HandSlot::new(bundle), HandSlot::new(bundle)];
        self.connected = true;
        self.set_tracking_status();
    }

    fn on_disconnected(&mut self, actions: &mut Vec<EngineAction>) {
        if !self.connected {
            return;
        }
        info!(hands = self.roles.count(), "tracking disconnected");
        for event in self.roles.clear() {
            if let RoleEvent::Lost { role, .. } = event {
                self.lose_hand(role);
            }
        }
        actions.push(presence(HandPresenceState::HandsLost));
        self.connected = false;
        self.set_tracking_status();
    }

    fn on_frame(&mut self, frame: &HandFrame, actions: &mut Vec<EngineAction>) {
        if !self.connected {
            trace!(timestamp = frame.timestamp_us, "frame dropped, tracking unavailable");
            return;
        }
        self.last_timestamp_us = frame.timestamp_us;
        let had_hands = !self.roles.is_empty();

        let ids: Vec<u32> = frame.hands.iter().map(|hand| hand.id).collect();
        let hand_lost_frames = self.store.bundle().interaction.hand_lost_frames;
        for event in self.roles.observe(&ids, hand_lost_frames) {
            debug!(?event, timestamp = frame.timestamp_us, "hand role change");
            match event {
                RoleEvent::Lost { role, .. } => self.lose_hand(role),
                RoleEvent::Promoted { .. } => self.slots.swap(0, 1),
                RoleEvent::Assigned { .. } => {},
            }
        }

        let roles: Vec<HandType> = self.roles.assigned().collect();
        for role in roles {
            let hand = self.roles.id_of(role).and_then(|id| frame.hand(id));
            let bundle = self.store.bundle();
            let slot = &mut self.slots[HandRoles::slot_index(role)];
            if let Some(hand) = hand {
                slot.chirality = hand.chirality;
            }

            let Some(positions) = slot.positioning.calculate(hand, frame.timestamp_us, bundle)
            else {
                continue;
            };
            let outside_zone =
                self.zone.is_some_and(|zone| !zone.contains(positions.distance_from_screen));
            if outside_zone && !slot.classifier.is_pressed() {
                let cancel = slot.classifier.hand_lost(frame.timestamp_us);
                if let Some(cancel) = cancel {
                    deliver(&self.plugins, &mut self.manager, role, cancel);
                }
                continue;
            }
            let input = ClassifierInput {
                timestamp_us: frame.timestamp_us,
                hand_type: role,
                chirality: slot.chirality,
                positions,
                hand,
            };
            let action = slot.classifier.update(&input, &bundle.interaction);
            slot.positioning.set_drag_mode(slot.classifier.is_pressed());
            if let Some(action) = action {
                deliver(&self.plugins, &mut self.manager, role, action);
            }
        }

        match (had_hands, self.roles.is_empty()) {
            (false, false) => actions.push(presence(HandPresenceState::HandFound)),
            (true, true) => actions.push(presence(HandPresenceState::HandsLost)),
            _ => {},
        }
    }

    /// Cancel the slot's gesture and forget its history.
    fn lose_hand(&mut self, role: HandType) {
        self.release_press(role);
        let slot = &mut self.slots[HandRoles::slot_index(role)];
        slot.positioning.reset();
        slot.chirality = Chirality::Unknown;
    }

    /// Cancel an in-progress gesture in `role`'s slot, if any.
    fn release_press(&mut self, role: HandType) {
        let slot = &mut self.slots[HandRoles::slot_index(role)];
        let cancel = slot.classifier.hand_lost(self.last_timestamp_us);
        slot.positioning.set_drag_mode(false);
        if let Some(cancel) = cancel {
            deliver(&self.plugins, &mut self.manager, role, cancel);
        }
    }

    fn set_tracking_status(&self) {
        if let Some(status) = &self.status {
            status.set_tracking(self.tracking_state());
        }
    }

    fn set_configuration_status(&self, configuration: ConfigurationStatus) {
        if let Some(status) = &self.status {
            status.set_configuration(configuration);
        }
    }
}

fn deliver(
    plugins: &PluginChain,
    manager: &mut InteractionManager,
    role: HandType,
    action: InputAction,
) {
    match plugins.apply(action) {
        Some(action) => {
            trace!(?role, input_type = ?action.input_type, "dispatching action");
            manager.dispatch(role, &action);
        },
        None => trace!(?role, input_type = ?action.input_type, "action filtered"),
    }
}

fn presence(state: HandPresenceState) -> EngineAction {
    EngineAction::HandPresence(HandPresenceEvent { state })
}

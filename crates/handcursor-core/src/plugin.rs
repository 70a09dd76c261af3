//! Ordered action filters applied between classification and dispatch.
//!
//! Each stage maps an action to `Some(action)` (possibly rewritten) or
//! `None` to drop it. Stages run left to right; the first `None` stops the
//! chain.

use handcursor_proto::{InputAction, InputType};

use crate::config::InteractionConfig;

/// One stage of the chain.
pub type Plugin = Box<dyn Fn(InputAction) -> Option<InputAction> + Send>;

/// Ordered list of [`Plugin`]s.
#[derive(Default)]
pub struct PluginChain {
    stages: Vec<Plugin>,
}

impl std::fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginChain").field("stages", &self.stages.len()).finish()
    }
}

impl PluginChain {
    /// Empty chain; passes every action through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with `plugin` appended.
    #[must_use]
    pub fn with(mut self, plugin: Plugin) -> Self {
        self.stages.push(plugin);
        self
    }

    /// Built-in stages enabled by `config`.
    pub fn from_config(config: &InteractionConfig) -> Self {
        let chain = Self::new();
        match InteractionZone::from_config(config) {
            Some(zone) => chain.with(interaction_zone(zone.min_m, zone.max_m)),
            None => chain,
        }
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run `action` through every stage.
    pub fn apply(&self, action: InputAction) -> Option<InputAction> {
        self.stages.iter().try_fold(action, |action, stage| stage(action))
    }
}

/// Band of distances from the screen in which a hand may interact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionZone {
    /// Nearest distance, metres.
    pub min_m: f32,
    /// Farthest distance, metres.
    pub max_m: f32,
}

impl InteractionZone {
    /// The configured zone, or `None` when the zone is disabled.
    pub fn from_config(config: &InteractionConfig) -> Option<Self> {
        config.interaction_zone_enabled.then(|| Self {
            min_m: config.interaction_min_distance_cm / 100.0,
            max_m: config.interaction_max_distance_cm / 100.0,
        })
    }

    /// Whether `distance_m` lies inside the band.
    pub fn contains(&self, distance_m: f32) -> bool {
        (self.min_m..=self.max_m).contains(&distance_m)
    }
}

/// Drops pointer-positioning actions whose distance lies outside
/// `[min_m, max_m]`. Actions that continue or end a press always pass, so a
/// press that leaves the zone still terminates.
pub fn interaction_zone(min_m: f32, max_m: f32) -> Plugin {
    let zone = InteractionZone { min_m, max_m };
    Box::new(move |action: InputAction| match action.input_type {
        InputType::Hover | InputType::Move | InputType::Down => {
            zone.contains(action.distance_from_screen).then_some(action)
        },
        InputType::Hold | InputType::Drag | InputType::Up | InputType::Cancel => Some(action),
    })
}

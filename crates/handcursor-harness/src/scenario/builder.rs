//! Scenario builder API.
//!
//! Provides a declarative API for scripting the engine that enforces the
//! oracle pattern: a scenario cannot run until it has been given one.

use handcursor_core::{ConfigBundle, HandFrame, SensorEvent};
use tracing::debug;

use crate::{
    SimSensor,
    scenario::{OracleFn, World},
};

type FrameScript = Box<dyn FnOnce(&mut SimSensor) -> Vec<HandFrame>>;

enum Step {
    Event(SensorEvent),
    Frames(FrameScript),
    Idle(usize),
    Reload(ConfigBundle),
    CorruptReload(String),
    Check(String, OracleFn),
}

/// Scenario builder.
///
/// Steps run in the order they are added, against one engine and one
/// scripted sensor.
pub struct Scenario {
    name: String,
    config: ConfigBundle,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a new scenario with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), config: ConfigBundle::default(), steps: Vec::new() }
    }

    /// Start the engine (and calibrate the sensor) with `bundle`.
    #[must_use]
    pub fn config(mut self, bundle: ConfigBundle) -> Self {
        self.config = bundle;
        self
    }

    /// The sensor reports itself connected.
    #[must_use]
    pub fn connect(mut self) -> Self {
        self.steps.push(Step::Event(SensorEvent::Connected));
        self
    }

    /// The sensor goes away.
    #[must_use]
    pub fn disconnect(mut self) -> Self {
        self.steps.push(Step::Event(SensorEvent::Disconnected));
        self
    }

    /// Feed the frames `script` produces from the scripted sensor.
    #[must_use]
    pub fn frames(mut self, script: impl FnOnce(&mut SimSensor) -> Vec<HandFrame> + 'static) -> Self {
        self.steps.push(Step::Frames(Box::new(script)));
        self
    }

    /// Tick idle `count` times.
    #[must_use]
    pub fn idle(mut self, count: usize) -> Self {
        self.steps.push(Step::Idle(count));
        self
    }

    /// Write `bundle` "to disk" and raise the dirty flag. The engine picks
    /// it up on its next tick; the sensor is recalibrated immediately.
    #[must_use]
    pub fn reload(mut self, bundle: ConfigBundle) -> Self {
        self.steps.push(Step::Reload(bundle));
        self
    }

    /// Corrupt the documents and raise the dirty flag.
    #[must_use]
    pub fn corrupt_reload(mut self, reason: impl Into<String>) -> Self {
        self.steps.push(Step::CorruptReload(reason.into()));
        self
    }

    /// Verify `oracle` at this point of the script.
    #[must_use]
    pub fn check(mut self, label: impl Into<String>, oracle: OracleFn) -> Self {
        self.steps.push(Step::Check(label.into(), oracle));
        self
    }

    /// Set the final oracle and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute every step, then verify the final world.
    pub fn run(self) -> Result<(), String> {
        self.run_world().map(|_| ())
    }

    /// Execute and hand back the world for further inspection.
    pub fn run_world(self) -> Result<World, String> {
        let Scenario { name, config, steps } = self.scenario;
        let mut world = World::new(config);

        for (index, step) in steps.into_iter().enumerate() {
            match step {
                Step::Event(event) => world.feed(event),
                Step::Frames(script) => {
                    let frames = script(world.sensor_mut());
                    debug!(scenario = %name, step = index, frames = frames.len(), "feeding frames");
                    world.feed_frames(frames);
                },
                Step::Idle(count) => {
                    for _ in 0..count {
                        world.idle();
                    }
                },
                Step::Reload(bundle) => {
                    world.sensor_mut().set_config(bundle.clone());
                    world.loader().set(bundle);
                    world.dirty().mark();
                },
                Step::CorruptReload(reason) => {
                    world.loader().corrupt(reason);
                    world.dirty().mark();
                },
                Step::Check(label, oracle) => {
                    oracle(&world).map_err(|e| format!("Scenario '{name}' check '{label}': {e}"))?;
                },
            }
        }

        (self.oracle)(&world).map_err(|e| format!("Scenario '{name}': {e}"))?;
        Ok(world)
    }
}

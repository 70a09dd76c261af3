//! World state for scenario execution.
//!
//! The World owns the engine under test, the scripted sensor feeding it and
//! the recorders on every dispatch channel, and provides the queries
//! oracles verify against.

use handcursor_core::{
    Channel, ConfigBundle, DirtyFlag, Engine, EngineAction, HandFrame, InteractionManager,
    SensorEvent,
};
use handcursor_proto::payloads::presence::HandPresenceState;

use crate::{ActionRecorder, ScriptedLoader, SimSensor};

const CHANNELS: [Channel; 4] = [Channel::All, Channel::Primary, Channel::Left, Channel::Right];

/// Engine plus everything observing it.
#[derive(Debug)]
pub struct World {
    engine: Engine,
    sensor: SimSensor,
    recorders: [ActionRecorder; 4],
    presence: Vec<HandPresenceState>,
    generations: Vec<u64>,
    loader: ScriptedLoader,
    dirty: DirtyFlag,
    events: usize,
}

impl World {
    /// Fresh engine configured with `bundle`, tracking still unavailable.
    pub fn new(bundle: ConfigBundle) -> Self {
        let recorders: [ActionRecorder; 4] = Default::default();
        let mut manager = InteractionManager::new();
        for (channel, recorder) in CHANNELS.iter().zip(&recorders) {
            manager.subscribe(*channel, recorder.clone());
        }

        let loader = ScriptedLoader::new();
        let dirty = DirtyFlag::new();
        let engine = Engine::new(bundle.clone(), manager)
            .with_loader(loader.clone())
            .with_dirty_flag(dirty.clone());

        Self {
            engine,
            sensor: SimSensor::new(bundle),
            recorders,
            presence: Vec::new(),
            generations: Vec::new(),
            loader,
            dirty,
            events: 0,
        }
    }

    /// Deliver one sensor event.
    pub fn feed(&mut self, event: SensorEvent) {
        self.events += 1;
        let actions = self.engine.handle(event);
        self.record(actions);
    }

    /// Deliver frames in order.
    pub fn feed_frames(&mut self, frames: Vec<HandFrame>) {
        for frame in frames {
            self.feed(SensorEvent::Frame(frame));
        }
    }

    /// Tick without a sensor event.
    pub fn idle(&mut self) {
        let actions = self.engine.idle();
        self.record(actions);
    }

    fn record(&mut self, actions: Vec<EngineAction>) {
        for action in actions {
            match action {
                EngineAction::HandPresence(event) => self.presence.push(event.state),
                EngineAction::ConfigReloaded { generation } => self.generations.push(generation),
            }
        }
    }

    /// The engine under test.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The scripted sensor.
    pub fn sensor(&self) -> &SimSensor {
        &self.sensor
    }

    /// The scripted sensor, for generating frames.
    pub fn sensor_mut(&mut self) -> &mut SimSensor {
        &mut self.sensor
    }

    /// Actions delivered on [`Channel::All`].
    pub fn actions(&self) -> &ActionRecorder {
        self.channel(Channel::All)
    }

    /// Actions delivered on `channel`.
    pub fn channel(&self, channel: Channel) -> &ActionRecorder {
        let index = CHANNELS.iter().position(|c| *c == channel).unwrap_or(0);
        &self.recorders[index]
    }

    /// Presence notifications, in order.
    pub fn presence(&self) -> &[HandPresenceState] {
        &self.presence
    }

    /// Generations reported by `ConfigReloaded`, in order.
    pub fn generations(&self) -> &[u64] {
        &self.generations
    }

    /// Loader the engine reloads through.
    pub fn loader(&self) -> &ScriptedLoader {
        &self.loader
    }

    /// Reload signal watched by the engine.
    pub fn dirty(&self) -> &DirtyFlag {
        &self.dirty
    }

    /// Number of sensor events delivered.
    pub fn events(&self) -> usize {
        self.events
    }
}

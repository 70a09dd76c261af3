//! Process wiring: the sensor loop thread and the assembled service.

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use handcursor_core::{
    Channel, ConfigBundle, ConfigSnapshot, DirtyFlag, Engine, EngineAction, InteractionManager,
    SharedStatus,
};
use handcursor_proto::payloads::status::ConfigurationStatus;
use tracing::{debug, info, warn};

use crate::{
    broadcast::{BroadcastSubscriber, ConnectionBroadcast},
    config_files::{ConfigFiles, FileLoader, resolve_base_dir},
    error::ServerError,
    listener::{ListenerConfig, WsListener},
    router::{RequestRouter, RouterContext},
    sensor::{ChannelSource, FrameSource, ReplaySource, SensorHandle, SourcePoll, TrackingSettings},
    watcher::ConfigWatcher,
};

/// How long the sensor loop waits for an event before ticking idle.
pub const SENSOR_POLL: Duration = Duration::from_millis(100);

/// Drives an [`Engine`] from a [`FrameSource`] on a dedicated thread.
///
/// Input actions reach clients through the engine's subscribers; presence
/// changes are broadcast here.
#[derive(Debug)]
pub struct SensorLoop {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SensorLoop {
    /// Start the loop. It runs until [`SensorLoop::stop`] is called; a
    /// finished source leaves the engine ticking idle so config changes
    /// still apply.
    pub fn spawn(
        mut engine: Engine,
        mut source: Box<dyn FrameSource>,
        broadcast: Arc<ConnectionBroadcast>,
    ) -> Result<Self, ServerError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new().name("sensor-loop".into()).spawn(move || {
            let mut finished = false;
            while !stop_flag.load(Ordering::Acquire) {
                let actions = if finished {
                    thread::sleep(SENSOR_POLL);
                    engine.idle()
                } else {
                    match source.poll(SENSOR_POLL) {
                        SourcePoll::Event(event) => engine.handle(event),
                        SourcePoll::Idle => engine.idle(),
                        SourcePoll::Finished => {
                            info!("frame source finished");
                            finished = true;
                            engine.idle()
                        },
                    }
                };
                execute(&actions, &broadcast);
            }
            debug!("sensor loop stopped");
        })?;
        Ok(Self { stop, thread: Some(thread) })
    }

    /// Stop the loop and wait for the thread.
    pub fn stop(mut self) -> Result<(), ServerError> {
        self.halt()
    }

    fn halt(&mut self) -> Result<(), ServerError> {
        self.stop.store(true, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| ServerError::SensorThread),
            None => Ok(()),
        }
    }
}

impl Drop for SensorLoop {
    fn drop(&mut self) {
        if self.halt().is_err() {
            warn!("sensor loop thread panicked");
        }
    }
}

fn execute(actions: &[EngineAction], broadcast: &ConnectionBroadcast) {
    for action in actions {
        match action {
            EngineAction::HandPresence(event) => {
                if let Err(error) = broadcast.broadcast_presence(event.state) {
                    warn!(%error, "failed to broadcast hand presence");
                }
            },
            EngineAction::ConfigReloaded { generation } => {
                debug!(generation, "configuration in effect");
            },
        }
    }
}

/// Everything [`Service::start`] needs.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Socket endpoint.
    pub listener: ListenerConfig,
    /// Config base directory; resolved from the environment when absent.
    pub config_dir: Option<PathBuf>,
    /// Recording to play as the sensor. Without one, frames are pushed
    /// through [`Service::sensor`].
    pub replay: Option<PathBuf>,
    /// Skip the filesystem watcher.
    pub no_watch: bool,
}

/// The running service.
#[derive(Debug)]
pub struct Service {
    listener: Arc<WsListener>,
    broadcast: Arc<ConnectionBroadcast>,
    sensor: Option<SensorHandle>,
    sensor_loop: SensorLoop,
    watcher: Option<ConfigWatcher>,
    status: SharedStatus,
    dirty: DirtyFlag,
}

impl Service {
    /// Load configuration, bind the socket and start the sensor loop.
    ///
    /// A corrupt configuration is not fatal: defaults are used and the
    /// status reports `Errored`. Failing to bind is.
    pub async fn start(config: ServiceConfig) -> Result<Self, ServerError> {
        let files = Arc::new(ConfigFiles::new(resolve_base_dir(config.config_dir.as_deref())));
        files.refresh_location();

        let status = SharedStatus::new();
        let bundle = match files.load() {
            Ok(bundle) => {
                info!(dir = %files.dir().display(), "configuration loaded");
                status.set_configuration(ConfigurationStatus::Loaded);
                bundle
            },
            Err(error) => {
                warn!(%error, "configuration unusable, starting with defaults");
                status.set_configuration(ConfigurationStatus::Errored);
                ConfigBundle::default()
            },
        };

        let snapshot = ConfigSnapshot::new(bundle.clone());
        let dirty = DirtyFlag::new();
        let tracking = TrackingSettings::default();
        let (commands, command_queue) = mpsc::channel();
        let broadcast = Arc::new(ConnectionBroadcast::new());

        let router = Arc::new(RequestRouter::new(RouterContext {
            snapshot: snapshot.clone(),
            commands,
            files: Arc::clone(&files),
            dirty: dirty.clone(),
            tracking,
            status: status.clone(),
        }));
        let listener = WsListener::bind(&config.listener, Arc::clone(&broadcast), router).await?;

        let mut manager = InteractionManager::new();
        manager.subscribe(Channel::All, BroadcastSubscriber(Arc::clone(&broadcast)));
        let engine = Engine::new(bundle, manager)
            .with_loader(FileLoader(Arc::clone(&files)))
            .with_dirty_flag(dirty.clone())
            .with_commands(command_queue)
            .with_snapshot(snapshot)
            .with_status(status.clone());

        let (source, sensor): (Box<dyn FrameSource>, _) = match &config.replay {
            Some(path) => (Box::new(ReplaySource::open(path)?), None),
            None => {
                let (handle, source) = ChannelSource::channel();
                (Box::new(source), Some(handle))
            },
        };

        let watcher = if config.no_watch {
            None
        } else {
            ConfigWatcher::spawn(files, dirty.clone())
                .inspect_err(|error| warn!(%error, "config watching disabled"))
                .ok()
        };

        let sensor_loop = SensorLoop::spawn(engine, source, Arc::clone(&broadcast))?;

        Ok(Self { listener, broadcast, sensor, sensor_loop, watcher, status, dirty })
    }

    /// Address clients connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Feeds the sensor loop when no recording was given.
    pub fn sensor(&self) -> Option<&SensorHandle> {
        self.sensor.as_ref()
    }

    /// The open-connection set.
    pub fn broadcast(&self) -> &Arc<ConnectionBroadcast> {
        &self.broadcast
    }

    /// Service health as reported to clients.
    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    /// Ask for a reload from disk on the next tick.
    pub fn request_reload(&self) {
        self.dirty.mark();
    }

    /// Stop accepting, stop the sensor loop and the watcher.
    pub fn shutdown(self) -> Result<(), ServerError> {
        let Self { listener, sensor_loop, watcher, sensor, .. } = self;
        listener.shutdown();
        drop(sensor);
        drop(watcher);
        let result = sensor_loop.stop();
        info!("service stopped");
        result
    }
}

//! Filesystem watch that raises the reload flag.
//!
//! The watch thread never reloads anything itself. It only marks the
//! [`DirtyFlag`]; the sensor thread performs the reload between ticks.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use handcursor_core::DirtyFlag;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::{
    config_files::{ConfigFiles, INTERACTION_FILE, LOCATION_POINTER, PHYSICAL_FILE},
    error::ServerError,
};

const STOP_POLL: Duration = Duration::from_millis(200);

/// Watches the config base directory and the documents' directory.
///
/// Dropping the watcher stops its thread.
#[derive(Debug)]
pub struct ConfigWatcher {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    /// Start watching `files`, marking `dirty` on every relevant change.
    pub fn spawn(files: Arc<ConfigFiles>, dirty: DirtyFlag) -> Result<Self, ServerError> {
        let (events, receiver) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(events)?;

        fs::create_dir_all(files.base())?;
        watcher.watch(files.base(), RecursiveMode::NonRecursive)?;
        let mut watched_dir = files.dir();
        if watched_dir != files.base() {
            fs::create_dir_all(&watched_dir)?;
            watcher.watch(&watched_dir, RecursiveMode::NonRecursive)?;
        }
        info!(base = %files.base().display(), dir = %watched_dir.display(), "watching configuration");

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::Builder::new().name("config-watcher".into()).spawn(move || {
            while !stop_flag.load(Ordering::Acquire) {
                match receiver.recv_timeout(STOP_POLL) {
                    Ok(Ok(event)) => {
                        on_event(&event, &files, &dirty, &mut watcher, &mut watched_dir);
                    },
                    Ok(Err(error)) => warn!(%error, "config watch error"),
                    Err(mpsc::RecvTimeoutError::Timeout) => {},
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("config watcher stopped");
        })?;

        Ok(Self { stop, thread: Some(thread) })
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("config watcher thread panicked");
            }
        }
    }
}

fn on_event(
    event: &Event,
    files: &ConfigFiles,
    dirty: &DirtyFlag,
    watcher: &mut RecommendedWatcher,
    watched_dir: &mut PathBuf,
) {
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    for path in &event.paths {
        match file_name(path) {
            Some(LOCATION_POINTER) => {
                if files.refresh_location() {
                    rewatch(files, watcher, watched_dir);
                    dirty.mark();
                }
            },
            Some(INTERACTION_FILE | PHYSICAL_FILE) => {
                debug!(path = %path.display(), kind = ?event.kind, "configuration changed");
                dirty.mark();
            },
            _ => {},
        }
    }
}

fn rewatch(files: &ConfigFiles, watcher: &mut RecommendedWatcher, watched_dir: &mut PathBuf) {
    let next = files.dir();
    if *watched_dir != files.base() {
        if let Err(error) = watcher.unwatch(watched_dir) {
            debug!(%error, "unwatch of previous config directory failed");
        }
    }
    if next != files.base() {
        if let Err(error) = fs::create_dir_all(&next) {
            warn!(%error, dir = %next.display(), "cannot create config directory");
        }
        if let Err(error) = watcher.watch(&next, RecursiveMode::NonRecursive) {
            warn!(%error, dir = %next.display(), "cannot watch config directory");
        }
    }
    *watched_dir = next;
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

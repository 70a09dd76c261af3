//! Live configuration store and cross-thread reload signalling.
//!
//! The store is owned by the tick thread. Other threads never touch it
//! directly: the file watcher only raises a [`DirtyFlag`], request handlers
//! read a published [`ConfigSnapshot`] and submit changes through the
//! engine's command channel. The tick thread drains both at the start of a
//! tick, so a configuration never changes halfway through classification.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use super::ConfigBundle;
use crate::ConfigError;

/// Loads both configuration documents from wherever they persist.
pub trait ConfigLoader: Send {
    /// Read, parse and validate the documents.
    fn load(&mut self) -> Result<ConfigBundle, ConfigError>;
}

/// Single-bit "configuration changed on disk" signal.
///
/// Set from any thread; consumed with [`DirtyFlag::take`] by the one thread
/// that reloads.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    /// Create a clear flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that a reload is needed.
    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Whether a reload is pending.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The configuration currently driving classification.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    bundle: ConfigBundle,
    generation: u64,
}

impl ConfigStore {
    /// Start at generation 0 with `bundle`.
    pub fn new(bundle: ConfigBundle) -> Self {
        Self { bundle, generation: 0 }
    }

    /// Current configuration.
    pub fn bundle(&self) -> &ConfigBundle {
        &self.bundle
    }

    /// Number of replacements since start-up.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Swap in a new configuration, returning the new generation.
    pub fn replace(&mut self, bundle: ConfigBundle) -> u64 {
        self.bundle = bundle;
        self.generation += 1;
        self.generation
    }
}

/// Read-mostly copy of the live configuration for other threads.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot(Arc<RwLock<ConfigBundle>>);

impl ConfigSnapshot {
    /// Snapshot holding `bundle`.
    pub fn new(bundle: ConfigBundle) -> Self {
        Self(Arc::new(RwLock::new(bundle)))
    }

    /// Copy of the most recently published configuration.
    pub fn get(&self) -> ConfigBundle {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Publish a new configuration.
    pub fn publish(&self, bundle: ConfigBundle) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = bundle;
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn take_clears_the_flag() {
        let flag = DirtyFlag::new();
        assert!(!flag.take());
        flag.mark();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn flag_is_shared_across_threads() {
        let flag = DirtyFlag::new();
        let remote = flag.clone();
        thread::spawn(move || remote.mark()).join().unwrap();
        assert!(flag.take());
    }

    #[test]
    fn replace_bumps_generation() {
        let mut store = ConfigStore::new(ConfigBundle::default());
        assert_eq!(store.generation(), 0);
        let mut next = ConfigBundle::default();
        next.interaction.deadzone_radius_m = 0.01;
        assert_eq!(store.replace(next.clone()), 1);
        assert_eq!(store.bundle(), &next);
    }

    #[test]
    fn snapshot_sees_published_bundle() {
        let snapshot = ConfigSnapshot::new(ConfigBundle::default());
        let reader = snapshot.clone();
        let mut next = ConfigBundle::default();
        next.physical.screen_width_px = 800;
        snapshot.publish(next);
        assert_eq!(reader.get().physical.screen_width_px, 800);
    }
}

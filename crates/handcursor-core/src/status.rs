//! Service health shared between the tick thread and request handlers.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, Ordering},
};

use handcursor_proto::payloads::status::{ConfigurationStatus, TrackingServiceState};

/// Lock-free status cell. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    tracking: AtomicBool,
    configuration: AtomicU8,
}

const NOT_LOADED: u8 = 0;
const LOADED: u8 = 1;
const ERRORED: u8 = 2;

impl SharedStatus {
    /// Unavailable tracking, nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor connection state.
    pub fn tracking(&self) -> TrackingServiceState {
        if self.inner.tracking.load(Ordering::Acquire) {
            TrackingServiceState::Connected
        } else {
            TrackingServiceState::Unavailable
        }
    }

    /// Record the sensor connection state.
    pub fn set_tracking(&self, state: TrackingServiceState) {
        let connected = state == TrackingServiceState::Connected;
        self.inner.tracking.store(connected, Ordering::Release);
    }

    /// Outcome of the most recent configuration load.
    pub fn configuration(&self) -> ConfigurationStatus {
        match self.inner.configuration.load(Ordering::Acquire) {
            LOADED => ConfigurationStatus::Loaded,
            ERRORED => ConfigurationStatus::Errored,
            _ => ConfigurationStatus::NotLoaded,
        }
    }

    /// Record the outcome of a configuration load.
    pub fn set_configuration(&self, status: ConfigurationStatus) {
        let raw = match status {
            ConfigurationStatus::NotLoaded => NOT_LOADED,
            ConfigurationStatus::Loaded => LOADED,
            ConfigurationStatus::Errored => ERRORED,
        };
        self.inner.configuration.store(raw, Ordering::Release);
    }
}

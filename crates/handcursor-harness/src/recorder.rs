//! Recording subscribers and scripted collaborators for the engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use handcursor_core::{ActionSubscriber, ConfigBundle, ConfigError, ConfigLoader};
use handcursor_proto::{InputAction, InputType};

/// Subscriber that keeps every action it is handed.
///
/// Clones share the same log, so a test can keep one clone while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ActionRecorder(Arc<Mutex<Vec<InputAction>>>);

impl ActionRecorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn actions(&self) -> Vec<InputAction> {
        self.lock().clone()
    }

    /// Input types recorded so far, in order.
    pub fn types(&self) -> Vec<InputType> {
        self.lock().iter().map(|action| action.input_type).collect()
    }

    /// How many actions of `input_type` were recorded.
    pub fn count(&self, input_type: InputType) -> usize {
        self.lock().iter().filter(|action| action.input_type == input_type).count()
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the log, leaving it empty.
    pub fn drain(&self) -> Vec<InputAction> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InputAction>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActionSubscriber for ActionRecorder {
    fn on_action(&mut self, action: &InputAction) {
        self.lock().push(*action);
    }
}

/// Outcome the next reload should produce.
#[derive(Debug, Clone)]
enum NextLoad {
    Bundle(ConfigBundle),
    Corrupt(String),
}

/// Loader whose result the test decides.
///
/// Until [`ScriptedLoader::set`] or [`ScriptedLoader::corrupt`] is called
/// it reports the configuration as unreadable.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoader {
    next: Arc<Mutex<Option<NextLoad>>>,
    loads: Arc<Mutex<usize>>,
}

impl ScriptedLoader {
    /// Loader with nothing to load yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next load return `bundle`.
    pub fn set(&self, bundle: ConfigBundle) {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner) = Some(NextLoad::Bundle(bundle));
    }

    /// Make the next load fail as if the document were corrupt.
    pub fn corrupt(&self, reason: impl Into<String>) {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner) = Some(NextLoad::Corrupt(reason.into()));
    }

    /// How many times the engine loaded.
    pub fn loads(&self) -> usize {
        *self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigLoader for ScriptedLoader {
    fn load(&mut self) -> Result<ConfigBundle, ConfigError> {
        *self.loads.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        match self.next.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(NextLoad::Bundle(bundle)) => Ok(bundle),
            Some(NextLoad::Corrupt(reason)) => {
                Err(ConfigError::Parse { document: "InteractionConfig.json", reason })
            },
            None => Err(ConfigError::Invalid("no configuration scripted".into())),
        }
    }
}

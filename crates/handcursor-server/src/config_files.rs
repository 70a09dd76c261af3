//! Configuration documents on disk.
//!
//! Two JSON documents live side by side in the config directory. The
//! directory is found once at startup from a base directory, which may
//! contain a `config-location` pointer file redirecting to another
//! directory. The pointer is re-read whenever the watcher reports a change
//! in the base directory.

use std::{
    env,
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use handcursor_core::{
    ConfigBundle, ConfigError, ConfigLoader, InteractionConfig, PhysicalConfig,
    config::parse_document,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Interaction settings document.
pub const INTERACTION_FILE: &str = "InteractionConfig.json";
/// Physical calibration document.
pub const PHYSICAL_FILE: &str = "PhysicalConfig.json";
/// Optional file in the base directory naming the real config directory.
pub const LOCATION_POINTER: &str = "config-location";
/// Environment variable overriding the base directory.
pub const CONFIG_DIR_ENV: &str = "HANDCURSOR_CONFIG_DIR";

/// Pick the base directory: explicit flag, then environment, then the
/// user's config directory, then `./config`.
pub fn resolve_base_dir(explicit: Option<&Path>) -> PathBuf {
    base_dir_from(explicit, env::var_os(CONFIG_DIR_ENV), env::var_os("HOME"))
}

fn base_dir_from(
    explicit: Option<&Path>,
    from_env: Option<OsString>,
    home: Option<OsString>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = from_env.filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(home) = home.filter(|home| !home.is_empty()) {
        return PathBuf::from(home).join(".config").join("handcursor");
    }
    PathBuf::from("config")
}

/// The two documents and where they live.
#[derive(Debug)]
pub struct ConfigFiles {
    base: PathBuf,
    dir: RwLock<PathBuf>,
}

impl ConfigFiles {
    /// Files under `base`, following its location pointer if present.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let dir = locate(&base);
        info!(base = %base.display(), dir = %dir.display(), "config directory resolved");
        Self { base, dir: RwLock::new(dir) }
    }

    /// Base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory the documents are read from.
    pub fn dir(&self) -> PathBuf {
        self.dir.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Full path of `file` in the current directory.
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir().join(file)
    }

    /// Re-read the location pointer. Returns whether the directory moved.
    pub fn refresh_location(&self) -> bool {
        let next = locate(&self.base);
        let mut dir = self.dir.write().unwrap_or_else(PoisonError::into_inner);
        if *dir == next {
            return false;
        }
        info!(from = %dir.display(), to = %next.display(), "config directory moved");
        *dir = next;
        true
    }

    /// Create the directory and any missing document with defaults.
    pub fn ensure_defaults(&self) -> Result<(), ConfigError> {
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir.clone(), source })?;

        let (interaction, physical) = ConfigBundle::default().to_json()?;
        for (file, document) in [(INTERACTION_FILE, interaction), (PHYSICAL_FILE, physical)] {
            let path = dir.join(file);
            if !path.exists() {
                info!(path = %path.display(), "writing default configuration");
                write_document(&path, &document)?;
            }
        }
        Ok(())
    }

    /// Both documents as raw JSON, as stored.
    pub fn read_documents(&self) -> Result<(Value, Value), ConfigError> {
        let interaction = read_json(&self.path(INTERACTION_FILE), "InteractionConfig")?;
        let physical = read_json(&self.path(PHYSICAL_FILE), "PhysicalConfig")?;
        Ok((interaction, physical))
    }

    /// Read, parse and validate both documents, creating defaults first.
    pub fn load(&self) -> Result<ConfigBundle, ConfigError> {
        self.ensure_defaults()?;
        let interaction: InteractionConfig =
            parse_document("InteractionConfig", &read_text(&self.path(INTERACTION_FILE))?)?;
        let physical: PhysicalConfig =
            parse_document("PhysicalConfig", &read_text(&self.path(PHYSICAL_FILE))?)?;
        let bundle = ConfigBundle { interaction, physical };
        bundle.validate()?;
        debug!(dir = %self.dir().display(), "configuration loaded from disk");
        Ok(bundle)
    }

    /// Persist both documents.
    pub fn write(&self, bundle: &ConfigBundle) -> Result<(), ConfigError> {
        bundle.validate()?;
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir.clone(), source })?;
        let (interaction, physical) = bundle.to_json()?;
        write_document(&dir.join(INTERACTION_FILE), &interaction)?;
        write_document(&dir.join(PHYSICAL_FILE), &physical)
    }
}

/// Reloads from [`ConfigFiles`], refreshing the location pointer first.
#[derive(Debug, Clone)]
pub struct FileLoader(pub std::sync::Arc<ConfigFiles>);

impl ConfigLoader for FileLoader {
    fn load(&mut self) -> Result<ConfigBundle, ConfigError> {
        self.0.refresh_location();
        self.0.load()
    }
}

fn locate(base: &Path) -> PathBuf {
    let pointer = base.join(LOCATION_POINTER);
    match fs::read_to_string(&pointer) {
        Ok(text) => {
            let target = PathBuf::from(text.trim());
            if text.trim().is_empty() {
                warn!(pointer = %pointer.display(), "empty config location pointer ignored");
                return base.to_path_buf();
            }
            if target.is_relative() { base.join(target) } else { target }
        },
        Err(error) if error.kind() == io::ErrorKind::NotFound => base.to_path_buf(),
        Err(error) => {
            warn!(pointer = %pointer.display(), %error, "unreadable config location pointer ignored");
            base.to_path_buf()
        },
    }
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

fn read_json(path: &Path, document: &'static str) -> Result<Value, ConfigError> {
    parse_document(document, &read_text(path)?)
}

/// Write through a temporary file and rename, so a reader never sees a
/// half-written document.
fn write_document(path: &Path, document: &Value) -> Result<(), ConfigError> {
    let text = serde_json::to_string_pretty(document)
        .map_err(|e| ConfigError::Invalid(format!("cannot serialise {}: {e}", path.display())))?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, text).map_err(|source| ConfigError::Io { path: staging.clone(), source })?;
    fs::rename(&staging, path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use handcursor_proto::InteractionType;

    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let dir = base_dir_from(Some(Path::new("/x")), Some("/env".into()), Some("/home/u".into()));
        assert_eq!(dir, PathBuf::from("/x"));
    }

    #[test]
    fn env_then_home_then_local() {
        assert_eq!(base_dir_from(None, Some("/env".into()), Some("/h".into())), PathBuf::from("/env"));
        assert_eq!(
            base_dir_from(None, None, Some("/h".into())),
            PathBuf::from("/h/.config/handcursor")
        );
        assert_eq!(base_dir_from(None, Some("".into()), None), PathBuf::from("config"));
    }

    #[test]
    fn first_load_writes_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let files = ConfigFiles::new(tmp.path().join("nested"));
        let bundle = files.load().unwrap();
        assert_eq!(bundle, ConfigBundle::default());
        assert!(files.path(INTERACTION_FILE).exists());
        assert!(files.path(PHYSICAL_FILE).exists());
    }

    #[test]
    fn partial_document_is_completed_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(INTERACTION_FILE), r#"{"InteractionType":"GRAB"}"#).unwrap();
        let files = ConfigFiles::new(tmp.path());
        let bundle = files.load().unwrap();
        assert_eq!(bundle.interaction.interaction_type, InteractionType::Grab);
        assert_eq!(bundle.physical, PhysicalConfig::default());
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(PHYSICAL_FILE), "{ nope").unwrap();
        let files = ConfigFiles::new(tmp.path());
        assert!(matches!(files.load(), Err(ConfigError::Parse { document: "PhysicalConfig", .. })));
    }

    #[test]
    fn write_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let files = ConfigFiles::new(tmp.path());
        let mut bundle = ConfigBundle::default();
        bundle.interaction.hand_lost_frames = 7;
        files.write(&bundle).unwrap();
        assert_eq!(files.load().unwrap(), bundle);
        assert!(!tmp.path().join("InteractionConfig.json.tmp").exists());
    }

    #[test]
    fn pointer_redirects_and_is_rechecked() {
        let tmp = tempfile::tempdir().unwrap();
        let files = ConfigFiles::new(tmp.path());
        assert_eq!(files.dir(), tmp.path());
        assert!(!files.refresh_location());

        fs::write(tmp.path().join(LOCATION_POINTER), "elsewhere\n").unwrap();
        assert!(files.refresh_location());
        assert_eq!(files.dir(), tmp.path().join("elsewhere"));
        files.load().unwrap();
        assert!(tmp.path().join("elsewhere").join(INTERACTION_FILE).exists());
    }
}

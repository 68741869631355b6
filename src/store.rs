//! On-disk persistence for conversations, profiles, and settings.
//!
//! Everything lives under a single root directory passed in explicitly at
//! process start, laid out as:
//!
//! ```text
//! <root>/settings.json
//! <root>/profiles/<name>.json
//! <root>/sessions/<name>.json
//! ```
//!
//! The library core never touches the store; persistence is a front-end
//! concern layered on top of [`Conversation`] and [`Profile`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::profile::Profile;
use crate::{Error, Result};

/// Cross-run front-end settings: the active profile and session, and the
/// saved API key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the profile loaded when none is specified.
    #[serde(default)]
    pub profile: String,

    /// Name of the session resumed when none is specified.
    #[serde(default)]
    pub session: String,

    /// Saved API key, applied when the environment provides none.
    #[serde(default)]
    pub credential: String,
}

/// Filesystem-backed store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a store rooted at the given directory. The directory need
    /// not exist yet; it is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the default store root.
    ///
    /// Checks `$PARLEY_DATA_DIR`, then `$XDG_DATA_HOME/parley`, then
    /// `$HOME/.local/share/parley`.
    pub fn default_root() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("PARLEY_DATA_DIR") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir).join("parley"));
            }
        }
        if let Ok(dir) = std::env::var("HOME") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir).join(".local/share/parley"));
            }
        }
        Err(Error::validation(
            "cannot resolve a data directory; set PARLEY_DATA_DIR",
            Some("root".to_string()),
        ))
    }

    /// The directory this store reads and writes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the settings file, or defaults if it does not exist.
    pub fn load_settings(&self) -> Result<Settings> {
        match self.read_json(&self.root.join("settings.json"))? {
            Some(settings) => Ok(settings),
            None => Ok(Settings::default()),
        }
    }

    /// Persist the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_json(&self.root.join("settings.json"), settings)
    }

    /// Load a conversation by name, if one was saved under that name.
    pub fn load_conversation(&self, name: &str) -> Result<Option<Conversation>> {
        self.read_json(&self.session_path(name)?)
    }

    /// Persist a conversation under its name.
    pub fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.write_json(&self.session_path(&conversation.name)?, conversation)
    }

    /// Remove a saved conversation. Missing files are not an error.
    pub fn remove_conversation(&self, name: &str) -> Result<()> {
        Self::remove(&self.session_path(name)?)
    }

    /// Load a profile by name, if one was saved under that name.
    pub fn load_profile(&self, name: &str) -> Result<Option<Profile>> {
        self.read_json(&self.profile_path(name)?)
    }

    /// Persist a profile under its name.
    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.write_json(&self.profile_path(&profile.name)?, profile)
    }

    /// Names of all saved conversations, sorted.
    pub fn list_conversations(&self) -> Result<Vec<String>> {
        Self::list(&self.root.join("sessions"))
    }

    /// Names of all saved profiles, sorted.
    pub fn list_profiles(&self) -> Result<Vec<String>> {
        Self::list(&self.root.join("profiles"))
    }

    fn session_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join("sessions").join(Self::file_name(name)?))
    }

    fn profile_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join("profiles").join(Self::file_name(name)?))
    }

    /// Names become file names, so path separators and traversal are
    /// rejected outright.
    fn file_name(name: &str) -> Result<String> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(Error::validation(
                format!("invalid name: {name:?}"),
                Some("name".to_string()),
            ));
        }
        Ok(format!("{name}.json"))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::io(
                    format!("cannot read {}", path.display()),
                    e,
                ));
            }
        };
        let value = serde_json::from_str(&contents).map_err(|e| {
            Error::serialization(format!("cannot parse {}", path.display()), Some(Box::new(e)))
        })?;
        Ok(Some(value))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("cannot create {}", parent.display()), e)
            })?;
        }
        let contents = serde_json::to_string_pretty(value)
            .map_err(|e| Error::serialization("cannot serialize", Some(Box::new(e))))?;
        fs::write(path, contents)
            .map_err(|e| Error::io(format!("cannot write {}", path.display()), e))?;
        Ok(())
    }

    fn remove(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(format!("cannot remove {}", path.display()), e)),
        }
    }

    fn list(dir: &Path) -> Result<Vec<String>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::io(format!("cannot list {}", dir.display()), e));
            }
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::io(format!("cannot list {}", dir.display()), e))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

//! On-disk session and preference storage
//!
//! Both files live under the platform's local data directory and are wrapped
//! in a versioned envelope. Writes go through a temporary file and a rename so
//! a crash never leaves a half-written file behind.

use directories::ProjectDirs;
use doc_model::{Preferences, SessionFile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const PREFS_SCHEMA_VERSION: u32 = 1;
const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesEnvelope {
    version: u32,
    preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionEnvelope {
    version: u32,
    session: SessionFile,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "Highlighter", "Highlighter")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().to_path_buf() })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        let path = self.preferences_path();
        if !path.exists() {
            return Ok(Preferences::default());
        }

        let bytes = fs::read(path)?;
        let envelope: PreferencesEnvelope = serde_json::from_slice(&bytes)?;

        Ok(envelope.preferences)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        let envelope =
            PreferencesEnvelope { version: PREFS_SCHEMA_VERSION, preferences: preferences.clone() };

        self.write_atomic(&self.preferences_path(), &serde_json::to_vec_pretty(&envelope)?)
    }

    /// Last saved session, or `None` when nothing has been saved yet.
    pub fn load_session(&self) -> Result<Option<SessionFile>, StorageError> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(path)?;
        let envelope: SessionEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version != SESSION_SCHEMA_VERSION {
            log::warn!(
                "session schema version {} differs from {}",
                envelope.version,
                SESSION_SCHEMA_VERSION
            );
        }

        Ok(Some(envelope.session))
    }

    pub fn save_session(&self, session: &SessionFile) -> Result<(), StorageError> {
        let envelope =
            SessionEnvelope { version: SESSION_SCHEMA_VERSION, session: session.clone() };

        self.write_atomic(&self.session_path(), &serde_json::to_vec_pretty(&envelope)?)?;
        log::debug!("saved session to {}", self.session_path().display());
        Ok(())
    }

    pub fn clear_session(&self) -> Result<(), StorageError> {
        match fs::remove_file(self.session_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn preferences_path(&self) -> PathBuf {
        self.root.join("preferences.json")
    }

    fn session_path(&self) -> PathBuf {
        self.root.join("session.json")
    }
}

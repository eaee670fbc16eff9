use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use shared::{DeviceIdentity, LampError, StoredIdentity};
use tracing::{debug, info, warn};

pub mod calibration;

pub use calibration::{propagate_calibration, CalibrationArtifact};

/// File name of the persisted identity record.
pub const CONFIG_FILE_NAME: &str = ".lelamp_config.json";

/// Single-slot persistence for the device identity.
pub trait IdentityStore: Send + Sync {
    /// Overwrites the stored record with `identity`.
    fn save(&self, identity: &DeviceIdentity) -> Result<(), LampError>;
    /// Returns the stored identity, or an absent one when nothing usable is on disk.
    fn load(&self) -> StoredIdentity;
    fn path(&self) -> &Path;
}

#[derive(Debug, Serialize)]
struct ConfigRecord<'a> {
    id: &'a str,
    port: &'a str,
}

/// `.lelamp_config.json` beside the running executable, or in the working
/// directory when the executable path cannot be resolved.
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

/// JSON file backed [`IdentityStore`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn persistence_error(&self, source: std::io::Error) -> LampError {
        LampError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl IdentityStore for ConfigStore {
    fn save(&self, identity: &DeviceIdentity) -> Result<(), LampError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.persistence_error(err))?;
        }

        let record = ConfigRecord {
            id: identity.id(),
            port: identity.port(),
        };
        let body = serde_json::to_string_pretty(&record)
            .map_err(|err| self.persistence_error(std::io::Error::other(err)))?;
        fs::write(&self.path, body).map_err(|err| self.persistence_error(err))?;

        info!(
            path = %self.path.display(),
            id = identity.id(),
            port = identity.port(),
            "saved device identity"
        );
        Ok(())
    }

    fn load(&self) -> StoredIdentity {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no stored device identity");
            return StoredIdentity::absent();
        }

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable config record");
                return StoredIdentity::absent();
            }
        };

        match serde_json::from_str::<StoredIdentity>(&raw) {
            Ok(stored) => StoredIdentity {
                id: stored.id.filter(|v| !v.trim().is_empty()),
                port: stored.port.filter(|v| !v.trim().is_empty()),
            },
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring malformed config record");
                StoredIdentity::absent()
            }
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

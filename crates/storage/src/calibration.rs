//! Calibration artifacts and their propagation from follower to leader.

use std::{
    collections::BTreeMap,
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};
use shared::LampError;
use tracing::info;

/// Parameter name to numeric value, as written by a calibrated arm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationArtifact {
    params: BTreeMap<String, f64>,
}

impl CalibrationArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.params.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let raw = fs::read(path)?;
        serde_json::from_slice(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    /// Writes the artifact as pretty JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, body)
    }
}

/// Copies the follower's calibration document to the leader's location.
///
/// The source must parse as a JSON object; its bytes are written unchanged.
/// Returns the number of top-level parameters transferred.
pub fn propagate_calibration(follower: &Path, leader: &Path) -> Result<usize, LampError> {
    let raw = fs::read(follower).map_err(|err| {
        LampError::transfer(follower, format!("cannot read follower calibration: {err}"))
    })?;

    let document: serde_json::Value = serde_json::from_slice(&raw).map_err(|err| {
        LampError::transfer(follower, format!("follower calibration is not valid JSON: {err}"))
    })?;
    let entries = document
        .as_object()
        .map(|params| params.len())
        .ok_or_else(|| LampError::transfer(follower, "follower calibration is not a JSON object"))?;

    if let Some(parent) = leader.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            LampError::transfer(
                leader,
                format!("cannot create '{}': {err}", parent.display()),
            )
        })?;
    }
    fs::write(leader, &raw).map_err(|err| {
        LampError::transfer(leader, format!("cannot write leader calibration: {err}"))
    })?;

    info!(
        from = %follower.display(),
        to = %leader.display(),
        entries,
        "propagated follower calibration to leader"
    );
    Ok(entries)
}

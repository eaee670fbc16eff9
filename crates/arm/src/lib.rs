//! Device session boundary for the follower and leader arms.
//!
//! The orchestrator only talks to [`DeviceSession`] and [`SessionFactory`];
//! servo drivers live behind them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared::{DeviceIdentity, LampError, Role};

mod port_arm;

pub use port_arm::{PortArm, PortArmFactory, BAUD_RATE, LAMP_JOINTS};

/// A hardware link to one arm. Never reused across workflows.
#[async_trait]
pub trait DeviceSession: Send {
    fn role(&self) -> Role;
    fn identity(&self) -> &DeviceIdentity;
    /// Opens the link. With `auto_calibrate` false no calibration happens here.
    async fn connect(&mut self, auto_calibrate: bool) -> Result<(), LampError>;
    /// Calibrates a connected arm and writes its artifact.
    async fn calibrate(&mut self) -> Result<(), LampError>;
    /// Releases the link. Only valid while connected.
    async fn disconnect(&mut self) -> Result<(), LampError>;
    fn is_connected(&self) -> bool;
    /// Available before connecting.
    fn calibration_artifact_path(&self) -> &Path;
}

/// Constructs sessions without performing any I/O.
pub trait SessionFactory: Send + Sync {
    fn open(
        &self,
        role: Role,
        identity: &DeviceIdentity,
    ) -> Result<Box<dyn DeviceSession>, LampError>;
}

/// Where calibration artifacts live for each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationLayout {
    root: PathBuf,
}

impl CalibrationLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<user cache>/lelamp/calibration`, or a relative `calibration` directory
    /// when the platform has no cache directory.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .map(|cache| cache.join("lelamp").join("calibration"))
            .unwrap_or_else(|| PathBuf::from("calibration"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, role: Role, identity: &DeviceIdentity) -> PathBuf {
        let (kind, device) = match role {
            Role::Follower => ("robots", "lelamp_follower"),
            Role::Leader => ("teleoperators", "lelamp_leader"),
        };
        self.root
            .join(kind)
            .join(device)
            .join(format!("{}.json", identity.id()))
    }
}

impl Default for CalibrationLayout {
    fn default() -> Self {
        Self::new(Self::default_root())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use serialport::SerialPort;
use shared::{DeviceIdentity, LampError, Role};
use storage::CalibrationArtifact;
use tracing::{debug, info};

use crate::{CalibrationLayout, DeviceSession, SessionFactory};

/// Servo joints of the lamp arm, base to head.
pub const LAMP_JOINTS: [&str; 5] = [
    "base_yaw",
    "base_pitch",
    "elbow_pitch",
    "wrist_roll",
    "wrist_pitch",
];

const NOMINAL_HOMING_OFFSET: f64 = 0.0;
const NOMINAL_RANGE_MIN: f64 = 0.0;
const NOMINAL_RANGE_MAX: f64 = 4095.0;

/// Feetech bus servo default line rate.
pub const BAUD_RATE: u32 = 1_000_000;
const PORT_TIMEOUT: Duration = Duration::from_millis(100);

/// Arm reached through a serial device node.
///
/// Connecting opens the port as a serial line at [`BAUD_RATE`]; anything that
/// is not a terminal device is refused. Calibration records nominal joint
/// parameters for every lamp joint.
pub struct PortArm {
    role: Role,
    identity: DeviceIdentity,
    artifact_path: PathBuf,
    link: Option<Box<dyn SerialPort>>,
}

impl PortArm {
    pub fn new(role: Role, identity: DeviceIdentity, artifact_path: PathBuf) -> Self {
        Self {
            role,
            identity,
            artifact_path,
            link: None,
        }
    }

    fn nominal_calibration() -> CalibrationArtifact {
        let mut artifact = CalibrationArtifact::new();
        for joint in LAMP_JOINTS {
            artifact.insert(format!("{joint}.homing_offset"), NOMINAL_HOMING_OFFSET);
            artifact.insert(format!("{joint}.range_min"), NOMINAL_RANGE_MIN);
            artifact.insert(format!("{joint}.range_max"), NOMINAL_RANGE_MAX);
        }
        artifact
    }
}

#[async_trait]
impl DeviceSession for PortArm {
    fn role(&self) -> Role {
        self.role
    }

    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    async fn connect(&mut self, auto_calibrate: bool) -> Result<(), LampError> {
        if self.link.is_some() {
            return Err(LampError::connection(
                self.identity.port(),
                format!("{} arm is already connected", self.role),
            ));
        }

        let port = self.identity.port().to_owned();
        let link = tokio::task::spawn_blocking(move || open_serial(&port))
            .await
            .map_err(|err| LampError::connection(self.identity.port(), err.to_string()))??;
        self.link = Some(link);
        info!(role = %self.role, id = self.identity.id(), port = self.identity.port(), "arm connected");

        if auto_calibrate {
            self.calibrate().await?;
        }
        Ok(())
    }

    async fn calibrate(&mut self) -> Result<(), LampError> {
        if self.link.is_none() {
            return Err(LampError::Calibration(format!(
                "{} arm on {} is not connected",
                self.role,
                self.identity.port()
            )));
        }

        let artifact = Self::nominal_calibration();
        artifact.save(&self.artifact_path).map_err(|err| {
            LampError::Calibration(format!(
                "cannot write calibration to '{}': {err}",
                self.artifact_path.display()
            ))
        })?;
        info!(
            role = %self.role,
            path = %self.artifact_path.display(),
            params = artifact.len(),
            "calibration written"
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), LampError> {
        match self.link.take() {
            Some(link) => {
                drop(link);
                debug!(role = %self.role, port = self.identity.port(), "arm disconnected");
                Ok(())
            }
            None => Err(LampError::connection(
                self.identity.port(),
                format!("{} arm is not connected", self.role),
            )),
        }
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    fn calibration_artifact_path(&self) -> &Path {
        &self.artifact_path
    }
}

fn open_serial(path: &str) -> Result<Box<dyn SerialPort>, LampError> {
    debug!(port = path, baud = BAUD_RATE, "opening serial port");
    serialport::new(path, BAUD_RATE)
        .timeout(PORT_TIMEOUT)
        .open()
        .map_err(|err| LampError::connection(path, err.to_string()))
}

/// Builds [`PortArm`] sessions with artifact paths from a [`CalibrationLayout`].
#[derive(Debug, Clone, Default)]
pub struct PortArmFactory {
    layout: CalibrationLayout,
}

impl PortArmFactory {
    pub fn new(layout: CalibrationLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &CalibrationLayout {
        &self.layout
    }
}

impl SessionFactory for PortArmFactory {
    fn open(
        &self,
        role: Role,
        identity: &DeviceIdentity,
    ) -> Result<Box<dyn DeviceSession>, LampError> {
        let artifact_path = self.layout.artifact_path(role, identity);
        Ok(Box::new(PortArm::new(role, identity.clone(), artifact_path)))
    }
}

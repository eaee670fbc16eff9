use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LampError;

/// Which arm a session addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Follower,
    Leader,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Follower => "follower",
            Role::Leader => "leader",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The addressable hardware target: lamp id plus serial port.
///
/// Both fields are guaranteed non-empty; construct through [`DeviceIdentity::new`].
/// Deserializing goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredIdentity")]
pub struct DeviceIdentity {
    id: String,
    port: String,
}

impl DeviceIdentity {
    pub fn new(id: impl Into<String>, port: impl Into<String>) -> Result<Self, LampError> {
        let id = id.into();
        let port = port.into();
        if id.trim().is_empty() {
            return Err(LampError::Usage("lamp id must not be empty".into()));
        }
        if port.trim().is_empty() {
            return Err(LampError::Usage("serial port must not be empty".into()));
        }
        Ok(Self { id, port })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.port)
    }
}

/// Identity as read back from the config store. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl StoredIdentity {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.id.is_none() && self.port.is_none()
    }
}

impl From<&DeviceIdentity> for StoredIdentity {
    fn from(value: &DeviceIdentity) -> Self {
        Self {
            id: Some(value.id.clone()),
            port: Some(value.port.clone()),
        }
    }
}

impl TryFrom<StoredIdentity> for DeviceIdentity {
    type Error = LampError;

    fn try_from(value: StoredIdentity) -> Result<Self, Self::Error> {
        match (value.id, value.port) {
            (Some(id), Some(port)) => DeviceIdentity::new(id, port),
            (None, _) => Err(LampError::Usage("lamp id is missing".into())),
            (_, None) => Err(LampError::Usage("serial port is missing".into())),
        }
    }
}

/// One 8-bit intensity per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const OFF: Rgb = Rgb(0, 0, 0);
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Rgb(r, g, b)
    }
}

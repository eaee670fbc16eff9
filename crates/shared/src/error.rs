use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Connection,
    Calibration,
    Transfer,
    Persistence,
    Signal,
}

#[derive(Debug, Error)]
pub enum LampError {
    #[error("usage error: {0}")]
    Usage(String),
    #[error("failed to connect to {port}: {message}")]
    Connection { port: String, message: String },
    #[error("calibration failed: {0}")]
    Calibration(String),
    #[error("calibration transfer failed for '{}': {message}", .path.display())]
    Transfer { path: PathBuf, message: String },
    #[error("failed to persist config at '{}': {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("signal service error: {0}")]
    Signal(String),
}

impl LampError {
    pub fn connection(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            port: port.into(),
            message: message.into(),
        }
    }

    pub fn transfer(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Transfer {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LampError::Usage(_) => ErrorKind::Usage,
            LampError::Connection { .. } => ErrorKind::Connection,
            LampError::Calibration(_) => ErrorKind::Calibration,
            LampError::Transfer { .. } => ErrorKind::Transfer,
            LampError::Persistence { .. } => ErrorKind::Persistence,
            LampError::Signal(_) => ErrorKind::Signal,
        }
    }
}

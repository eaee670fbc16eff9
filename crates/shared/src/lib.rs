pub mod domain;
pub mod error;

pub use domain::{DeviceIdentity, Rgb, Role, StoredIdentity};
pub use error::{ErrorKind, LampError};

use arm::DeviceSession;
use shared::LampError;
use tracing::{info, warn};

/// Owns a session for the length of one workflow and releases it on every exit.
///
/// Release is explicit because disconnecting is async: every path out of a
/// workflow goes through [`ScopedSession::finish`].
pub struct ScopedSession {
    session: Box<dyn DeviceSession>,
}

impl ScopedSession {
    pub fn new(session: Box<dyn DeviceSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &dyn DeviceSession {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> &mut dyn DeviceSession {
        self.session.as_mut()
    }

    /// Disconnects when, and only when, the session reports itself connected.
    pub async fn release(mut self) -> Result<(), LampError> {
        if !self.session.is_connected() {
            return Ok(());
        }
        let role = self.session.role();
        info!(%role, port = self.session.identity().port(), "disconnecting arm");
        self.session.disconnect().await
    }

    /// Releases the session, then returns `outcome`. A workflow failure takes
    /// precedence over a failure to disconnect.
    pub async fn finish<T>(self, outcome: Result<T, LampError>) -> Result<T, LampError> {
        let role = self.session.role();
        let released = self.release().await;
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                warn!(%role, error = %cleanup, "disconnect failed during cleanup");
                Err(err)
            }
        }
    }
}

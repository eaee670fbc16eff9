use std::{path::PathBuf, sync::Arc};

use arm::{CalibrationLayout, PortArmFactory, SessionFactory};
use shared::{DeviceIdentity, ErrorKind, LampError, Rgb, Role};
use signal::{SignalCommand, SignalService};
use storage::{propagate_calibration, ConfigStore, IdentityStore};
use tracing::{error, info};

use crate::{
    mode::{Mode, Workflow},
    scope::ScopedSession,
    settings::Settings,
};

/// A failure the workflow logged and moved past.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToleratedFailure {
    pub step: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

/// What a completed workflow did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub workflow: Workflow,
    pub identity: DeviceIdentity,
    pub follower_artifact: Option<PathBuf>,
    pub leader_artifact: Option<PathBuf>,
    pub identity_saved: bool,
    pub tolerated: Vec<ToleratedFailure>,
}

impl WorkflowReport {
    fn new(workflow: Workflow, identity: &DeviceIdentity) -> Self {
        Self {
            workflow,
            identity: identity.clone(),
            follower_artifact: None,
            leader_artifact: None,
            identity_saved: false,
            tolerated: Vec::new(),
        }
    }
}

/// Runs one workflow per call over freshly opened sessions.
///
/// Sessions are strictly sequential: at most one hardware link is open at any
/// point, and every session that reports itself connected is disconnected
/// before the workflow returns.
#[derive(Clone)]
pub struct Orchestrator {
    sessions: Arc<dyn SessionFactory>,
    store: Arc<dyn IdentityStore>,
}

impl Orchestrator {
    pub fn new(sessions: Arc<dyn SessionFactory>, store: Arc<dyn IdentityStore>) -> Self {
        Self { sessions, store }
    }

    /// Serial-port arms and the JSON config store, located per `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(PortArmFactory::new(CalibrationLayout::new(
                settings.calibration_dir.clone(),
            ))),
            Arc::new(ConfigStore::new(settings.config_path.clone())),
        )
    }

    pub fn store(&self) -> &dyn IdentityStore {
        self.store.as_ref()
    }

    /// Runs the workflow selected by `mode`.
    pub async fn run(
        &self,
        mode: Mode,
        identity: &DeviceIdentity,
    ) -> Result<WorkflowReport, LampError> {
        let workflow = mode.workflow();
        info!(%workflow, id = identity.id(), port = identity.port(), "starting workflow");

        let outcome = match mode {
            Mode::FollowerOnly => self.calibrate_follower(identity).await,
            Mode::LeaderOnly => self.calibrate_leader(identity).await,
            Mode::All => self.calibrate_all(identity).await,
            Mode::ConfigOnly => self.config_only(identity),
        };

        match &outcome {
            Ok(_) => info!(%workflow, "workflow completed"),
            Err(err) => error!(%workflow, error = %err, "workflow failed"),
        }
        outcome
    }

    pub async fn calibrate_follower(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<WorkflowReport, LampError> {
        let mut report = WorkflowReport::new(Workflow::CalibrateFollower, identity);
        let artifact = self
            .calibrate_role(Role::Follower, identity, &mut report)
            .await?;
        report.follower_artifact = Some(artifact);
        Ok(report)
    }

    pub async fn calibrate_leader(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<WorkflowReport, LampError> {
        let mut report = WorkflowReport::new(Workflow::CalibrateLeader, identity);
        let artifact = self
            .calibrate_role(Role::Leader, identity, &mut report)
            .await?;
        report.leader_artifact = Some(artifact);
        Ok(report)
    }

    /// Calibrates the follower, derives the leader's calibration from it and
    /// persists the identity. The leader is never connected or calibrated.
    pub async fn calibrate_all(
        &self,
        identity: &DeviceIdentity,
    ) -> Result<WorkflowReport, LampError> {
        let mut report = WorkflowReport::new(Workflow::CalibrateAll, identity);
        let follower_artifact = self
            .calibrate_role(Role::Follower, identity, &mut report)
            .await?;
        report.follower_artifact = Some(follower_artifact.clone());

        let leader = ScopedSession::new(self.sessions.open(Role::Leader, identity)?);
        let leader_artifact = leader.session().calibration_artifact_path().to_path_buf();
        let transferred = propagate_calibration(&follower_artifact, &leader_artifact);
        leader.finish(transferred).await?;
        report.leader_artifact = Some(leader_artifact);

        self.store.save(identity)?;
        report.identity_saved = true;
        Ok(report)
    }

    /// Persists the identity without touching any arm.
    pub fn config_only(&self, identity: &DeviceIdentity) -> Result<WorkflowReport, LampError> {
        let mut report = WorkflowReport::new(Workflow::ConfigOnly, identity);
        self.store.save(identity)?;
        report.identity_saved = true;
        Ok(report)
    }

    /// Turns the light off and releases the follower.
    ///
    /// A follower that cannot be opened or reached is logged and tolerated;
    /// the signal service is started, blanked and stopped regardless.
    pub async fn shutdown(
        &self,
        identity: &DeviceIdentity,
        signal: &mut dyn SignalService,
    ) -> Result<WorkflowReport, LampError> {
        let workflow = Workflow::Shutdown;
        let mut report = WorkflowReport::new(workflow, identity);
        let opened = self.sessions.open(Role::Follower, identity);
        let mut follower = match opened {
            Ok(session) => Some(ScopedSession::new(session)),
            Err(err) => {
                let policy = workflow.error_policy();
                Self::tolerate(&mut report, "open", policy.handle(workflow, "open", Err(err))?);
                None
            }
        };

        let outcome: Result<(), LampError> = async {
            if let Some(follower) = follower.as_mut() {
                self.connect(workflow, follower, &mut report).await?;
            }
            signal.start().await?;
            info!("turning off light");
            signal.dispatch(SignalCommand::Solid(Rgb::OFF)).await?;
            Ok(())
        }
        .await;

        let outcome = match follower {
            Some(follower) => follower.finish(outcome).await,
            None => outcome,
        };
        let stopped = signal.stop().await;
        match (outcome, stopped) {
            (Ok(()), Ok(())) => {
                info!(%workflow, tolerated = report.tolerated.len(), "turn off complete");
                Ok(report)
            }
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Err(err), Err(stop_err)) => {
                error!(error = %stop_err, "failed to stop signal service");
                Err(err)
            }
        }
    }

    /// Opens, connects and calibrates one arm, releasing it on every path.
    async fn calibrate_role(
        &self,
        role: Role,
        identity: &DeviceIdentity,
        report: &mut WorkflowReport,
    ) -> Result<PathBuf, LampError> {
        let workflow = report.workflow;
        let mut scope = ScopedSession::new(self.sessions.open(role, identity)?);
        info!(%workflow, %role, port = identity.port(), "calibrating arm");

        let outcome: Result<PathBuf, LampError> = async {
            self.connect(workflow, &mut scope, report).await?;
            scope.session_mut().calibrate().await?;
            Ok(scope.session().calibration_artifact_path().to_path_buf())
        }
        .await;

        match &outcome {
            Ok(path) => info!(%role, path = %path.display(), "arm calibration completed"),
            Err(err) => error!(%role, error = %err, "arm calibration failed"),
        }
        scope.finish(outcome).await
    }

    async fn connect(
        &self,
        workflow: Workflow,
        scope: &mut ScopedSession,
        report: &mut WorkflowReport,
    ) -> Result<(), LampError> {
        let session = scope.session_mut();
        info!(
            role = %session.role(),
            id = session.identity().id(),
            port = session.identity().port(),
            "connecting to arm"
        );
        let connected = session.connect(false).await;
        let tolerated = workflow.error_policy().handle(workflow, "connect", connected)?;
        Self::tolerate(report, "connect", tolerated);
        Ok(())
    }

    fn tolerate(report: &mut WorkflowReport, step: &'static str, failure: Option<LampError>) {
        if let Some(err) = failure {
            report.tolerated.push(ToleratedFailure {
                step,
                kind: err.kind(),
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;

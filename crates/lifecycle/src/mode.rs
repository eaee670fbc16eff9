//! Operating modes, the workflows they select, and per-workflow error policy.

use std::fmt;

use shared::LampError;
use tracing::warn;

/// Mode switches as supplied on the command line. At most one may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub follower_only: bool,
    pub leader_only: bool,
    pub config_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    FollowerOnly,
    LeaderOnly,
    /// Calibrate the follower, derive the leader, persist the identity.
    All,
    ConfigOnly,
}

impl Mode {
    pub fn resolve(flags: ModeFlags) -> Result<Mode, LampError> {
        let set: Vec<&str> = [
            (flags.follower_only, "--follower-only"),
            (flags.leader_only, "--leader-only"),
            (flags.config_only, "--config-only"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect();

        if set.len() > 1 {
            return Err(LampError::Usage(format!(
                "{} are mutually exclusive",
                set.join(", ")
            )));
        }

        Ok(if flags.follower_only {
            Mode::FollowerOnly
        } else if flags.leader_only {
            Mode::LeaderOnly
        } else if flags.config_only {
            Mode::ConfigOnly
        } else {
            Mode::All
        })
    }

    pub fn workflow(self) -> Workflow {
        match self {
            Mode::FollowerOnly => Workflow::CalibrateFollower,
            Mode::LeaderOnly => Workflow::CalibrateLeader,
            Mode::All => Workflow::CalibrateAll,
            Mode::ConfigOnly => Workflow::ConfigOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    CalibrateFollower,
    CalibrateLeader,
    CalibrateAll,
    ConfigOnly,
    Shutdown,
}

impl Workflow {
    pub fn name(self) -> &'static str {
        match self {
            Workflow::CalibrateFollower => "calibrate_follower",
            Workflow::CalibrateLeader => "calibrate_leader",
            Workflow::CalibrateAll => "calibrate_all",
            Workflow::ConfigOnly => "config_only",
            Workflow::Shutdown => "shutdown",
        }
    }

    /// How session failures are treated. Turning the light off must still
    /// happen when the arm is unreachable.
    pub fn error_policy(self) -> ErrorPolicy {
        match self {
            Workflow::Shutdown => ErrorPolicy::LogAndContinue,
            _ => ErrorPolicy::Propagate,
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    Propagate,
    LogAndContinue,
}

impl ErrorPolicy {
    /// `Err` when the failure aborts the workflow, `Ok(Some)` when it was
    /// logged and tolerated.
    pub fn handle(
        self,
        workflow: Workflow,
        step: &'static str,
        result: Result<(), LampError>,
    ) -> Result<Option<LampError>, LampError> {
        match (self, result) {
            (_, Ok(())) => Ok(None),
            (ErrorPolicy::Propagate, Err(err)) => Err(err),
            (ErrorPolicy::LogAndContinue, Err(err)) => {
                warn!(workflow = workflow.name(), step, error = %err, "continuing after failed step");
                Ok(Some(err))
            }
        }
    }
}

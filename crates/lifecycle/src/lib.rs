//! Calibration and configuration lifecycle for the lamp's follower and leader arms.

pub mod identity;
pub mod mode;
mod orchestrator;
mod scope;
pub mod settings;

pub use identity::reconcile_identity;
pub use mode::{ErrorPolicy, Mode, ModeFlags, Workflow};
pub use orchestrator::{Orchestrator, ToleratedFailure, WorkflowReport};
pub use scope::ScopedSession;
pub use settings::{load_settings, Settings};

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lifecycle::{load_settings, reconcile_identity, Mode, ModeFlags, Orchestrator, Settings};
use tracing::error;
use tracing_subscriber::EnvFilter;

const RULE: &str = "==================================================";

/// Calibrate the LeLamp arms and remember which lamp and port were used.
#[derive(Parser, Debug)]
#[command(name = "lelamp-calibrate")]
struct Args {
    /// Lamp id; defaults to the saved one.
    #[arg(long)]
    id: Option<String>,
    /// Serial port of the lamp; defaults to the saved one.
    #[arg(long)]
    port: Option<String>,
    /// Calibrate only the follower arm.
    #[arg(long)]
    follower_only: bool,
    /// Calibrate only the leader arm.
    #[arg(long)]
    leader_only: bool,
    /// Skip calibration and only save id and port.
    #[arg(long)]
    config_only: bool,
}

impl Args {
    fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            follower_only: self.follower_only,
            leader_only: self.leader_only,
            config_only: self.config_only,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse(), &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("calibration process failed: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args, settings: &Settings) -> Result<()> {
    let mode = Mode::resolve(args.mode_flags())?;
    let orchestrator = Orchestrator::from_settings(settings);
    let identity = reconcile_identity(args.id, args.port, orchestrator.store().load())?;

    println!("\n{RULE}");
    println!("{}", heading(mode));
    println!("{RULE}");

    let report = orchestrator
        .run(mode, &identity)
        .await
        .with_context(|| format!("{} for lamp {identity}", mode.workflow()))?;

    if let Some(path) = &report.follower_artifact {
        println!("follower calibration: {}", path.display());
    }
    if let Some(path) = &report.leader_artifact {
        println!("leader calibration: {}", path.display());
    }
    if report.identity_saved {
        println!(
            "config saved to {} with id {} and port {}",
            orchestrator.store().path().display(),
            identity.id(),
            identity.port()
        );
    }

    println!("\n{RULE}");
    println!("{}", completion(mode));
    println!("{RULE}");
    Ok(())
}

fn heading(mode: Mode) -> &'static str {
    match mode {
        Mode::FollowerOnly => "FOLLOWER ARM CALIBRATION",
        Mode::LeaderOnly => "LEADER ARM CALIBRATION",
        Mode::All => "ARM CALIBRATION",
        Mode::ConfigOnly => "SAVING LAMP CONFIG",
    }
}

fn completion(mode: Mode) -> &'static str {
    match mode {
        Mode::ConfigOnly => "CONFIG SAVED SUCCESSFULLY",
        _ => "CALIBRATION COMPLETED SUCCESSFULLY",
    }
}

#[cfg(test)]
mod tests {
    use shared::{ErrorKind, LampError};

    use super::*;

    fn settings_in(dir: &tempfile::TempDir) -> Settings {
        Settings {
            config_path: dir.path().join(".lelamp_config.json"),
            calibration_dir: dir.path().join("calibration"),
            log_filter: "info".into(),
        }
    }

    fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
        err.downcast_ref::<LampError>().map(LampError::kind)
    }

    #[tokio::test]
    async fn conflicting_modes_are_rejected_before_any_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(&dir);
        let args = Args::try_parse_from([
            "lelamp-calibrate",
            "--id",
            "lamp7",
            "--port",
            "/dev/ttyACM0",
            "--follower-only",
            "--leader-only",
        ])
        .expect("args");

        let err = run(args, &settings).await.expect_err("conflicting flags");

        assert_eq!(error_kind(&err), Some(ErrorKind::Usage));
        assert!(!settings.config_path.exists());
        assert!(!settings.calibration_dir.exists());
    }

    #[tokio::test]
    async fn config_only_persists_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(&dir);
        let args = Args::try_parse_from([
            "lelamp-calibrate",
            "--id",
            "lamp7",
            "--port",
            "/dev/ttyACM0",
            "--config-only",
        ])
        .expect("args");

        run(args, &settings).await.expect("config only");

        let raw = std::fs::read_to_string(&settings.config_path).expect("config record");
        assert!(raw.contains("\"lamp7\""));
        assert!(!settings.calibration_dir.exists());
    }

    #[tokio::test]
    async fn missing_identity_without_saved_config_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = Args::try_parse_from(["lelamp-calibrate"]).expect("args");

        let err = run(args, &settings_in(&dir)).await.expect_err("no identity");

        assert_eq!(error_kind(&err), Some(ErrorKind::Usage));
    }

    #[tokio::test]
    async fn unreachable_follower_fails_without_saving() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = settings_in(&dir);
        let missing_port = dir.path().join("ttyMissing");
        let args = Args::try_parse_from([
            "lelamp-calibrate",
            "--id",
            "lamp7",
            "--port",
            missing_port.to_str().expect("utf-8 path"),
        ])
        .expect("args");

        let err = run(args, &settings).await.expect_err("unreachable port");

        assert_eq!(error_kind(&err), Some(ErrorKind::Connection));
        assert!(!settings.config_path.exists());
    }
}

use std::{collections::HashMap, fs, path::PathBuf};

use arm::CalibrationLayout;
use storage::default_config_path;

pub const SETTINGS_FILE: &str = "lelamp.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    pub calibration_dir: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            calibration_dir: CalibrationLayout::default_root(),
            log_filter: "info".into(),
        }
    }
}

/// Defaults, then `lelamp.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        return;
    };
    if let Some(v) = file_cfg.get("config_path") {
        settings.config_path = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("calibration_dir") {
        settings.calibration_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("LELAMP_CONFIG_PATH") {
        settings.config_path = PathBuf::from(v);
    }
    if let Some(v) = var("LELAMP_CALIBRATION_DIR") {
        settings.calibration_dir = PathBuf::from(v);
    }
    if let Some(v) = var("LELAMP_LOG") {
        settings.log_filter = v;
    }
}

//! Configuration loading.
//!
//! YAML file with environment overrides. Resolution order for the file:
//! explicit `--config` flag, `GUIDEPOST_CONFIG_PATH`, then
//! `~/.guidepost/config.yaml`. A missing file yields defaults.
//!
//! Environment overrides: `GUIDEPOST_DB_PATH`, `GUIDEPOST_LISTEN`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How many tasks a user may have active at once.
///
/// `Single` (the default) enforces one globally active task per user in the
/// activation engine. Automatic seeding at path start and auto-advance on
/// completion are exempt, so the documented progression flows are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTaskPolicy {
    #[default]
    Single,
    Multiple,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database path.
    pub db_path: PathBuf,
    /// Listen address for the HTTP API.
    pub listen: String,
    /// Active-task concurrency policy.
    pub active_task_policy: ActiveTaskPolicy,
    /// Log filter directive (tracing `EnvFilter` syntax).
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("guidepost.db"),
            listen: "127.0.0.1:8733".to_string(),
            active_task_policy: ActiveTaskPolicy::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration, starting from the file (if any) and applying
    /// environment overrides on top.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit_path) {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            _ => Config::default(),
        };

        if let Ok(db_path) = std::env::var("GUIDEPOST_DB_PATH") {
            config.db_path = PathBuf::from(db_path);
        }
        if let Ok(listen) = std::env::var("GUIDEPOST_LISTEN") {
            config.listen = listen;
        }

        Ok(config)
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("GUIDEPOST_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".guidepost").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_single() {
        assert_eq!(Config::default().active_task_policy, ActiveTaskPolicy::Single);
    }

    #[test]
    fn policy_parses_from_yaml() {
        let config: Config =
            serde_yaml::from_str("active_task_policy: multiple\n").unwrap();
        assert_eq!(config.active_task_policy, ActiveTaskPolicy::Multiple);
    }
}

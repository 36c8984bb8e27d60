use crate::error::{PulseError, Result};
use crate::git::{GitRunner, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "gitpulse";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "gitpulse.db";

pub const DEFAULT_WINDOW_DAYS: u32 = 365;
/// Longest heat window, about ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    /// Author filters applied when none are given on the command line.
    pub authors: Vec<String>,
    pub git: GitSettings,
    pub heat: HeatSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub program: String,
    /// humantime duration, e.g. `10s` or `1m 30s`.
    pub timeout: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatSettings {
    pub window_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            authors: Vec::new(),
            git: GitSettings::default(),
            heat: HeatSettings::default(),
        }
    }
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            timeout: humantime::format_duration(DEFAULT_TIMEOUT).to_string(),
        }
    }
}

impl Default for HeatSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Config {
    /// Loads `path`, or the per-user config file when it exists, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_file(&p),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PulseError::Config(format!("cannot read {}: {e}", path.display())))?;
        Ok(toml::from_str(&text)?)
    }

    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.git.timeout)
            .map_err(|e| PulseError::Config(format!("invalid git timeout '{}': {e}", self.git.timeout)))
    }

    pub fn runner(&self) -> Result<GitRunner> {
        Ok(GitRunner::new(self.git.program.clone(), self.timeout()?))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DATABASE_FILE)
}

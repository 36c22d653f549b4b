//! Configuration file support for eggtimer.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/eggtimer/config.toml`.

use crate::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound accepted for `default_cycle_length`
pub const MAX_CYCLE_LENGTH_DAYS: i64 = 365;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub statistics: StatisticsConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Per-user parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,

    /// Days between ovulation and the next period
    #[serde(default = "default_luteal_phase_length")]
    pub luteal_phase_length: i64,

    /// User timezone as minutes east of UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
            luteal_phase_length: default_luteal_phase_length(),
            utc_offset_minutes: 0,
        }
    }
}

/// Statistics engine parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Number of most recent cycles in the rolling average
    #[serde(default = "default_averaging_window")]
    pub averaging_window: usize,

    /// Cycle length assumed before any cycle has been recorded
    #[serde(default = "default_cycle_length")]
    pub default_cycle_length: i64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            averaging_window: default_averaging_window(),
            default_cycle_length: default_cycle_length(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("eggtimer")
}

fn default_user_id() -> String {
    "default".into()
}

fn default_luteal_phase_length() -> i64 {
    14
}

fn default_averaging_window() -> usize {
    6
}

fn default_cycle_length() -> i64 {
    28
}

impl UserConfig {
    /// The user's timezone as a fixed UTC offset
    pub fn timezone(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                Error::Config(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        let default_cycle = self.statistics.default_cycle_length;
        if !(1..=MAX_CYCLE_LENGTH_DAYS).contains(&default_cycle) {
            return Err(Error::Config(format!(
                "default_cycle_length must be between 1 and {} days (got {})",
                MAX_CYCLE_LENGTH_DAYS, default_cycle
            )));
        }
        let luteal = self.user.luteal_phase_length;
        if !(0..default_cycle).contains(&luteal) {
            return Err(Error::Config(format!(
                "luteal_phase_length must be at least 0 and shorter than default_cycle_length {} (got {})",
                default_cycle, luteal
            )));
        }
        if self.statistics.averaging_window == 0 {
            return Err(Error::Config("averaging_window must be at least 1".into()));
        }
        self.user.timezone()?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("eggtimer").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

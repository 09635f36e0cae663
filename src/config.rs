use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::InsightError;
use crate::focus::{FocusConfig, ImbalanceConfig};
use crate::logging::LogConfig;
use crate::recovery::HrvTrendConfig;
use crate::rules::RuleConfig;
use crate::trends::TrendConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Insight engine thresholds
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Every tunable threshold the engine uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many recent sessions the class-streak rules look at
    #[serde(default = "default_recent_session_limit")]
    pub recent_session_limit: usize,

    #[serde(default)]
    pub trends: TrendConfig,

    #[serde(default)]
    pub imbalance: ImbalanceConfig,

    #[serde(default)]
    pub focus: FocusConfig,

    #[serde(default)]
    pub rules: RuleConfig,

    #[serde(default)]
    pub hrv: HrvTrendConfig,
}

fn default_recent_session_limit() -> usize {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            recent_session_limit: default_recent_session_limit(),
            trends: TrendConfig::default(),
            imbalance: ImbalanceConfig::default(),
            focus: FocusConfig::default(),
            rules: RuleConfig::default(),
            hrv: HrvTrendConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject threshold combinations that can't produce sensible verdicts
    pub fn validate(&self) -> crate::error::Result<()> {
        let hundred = Decimal::from(100);

        if self.trends.window_periods == 0 || self.trends.window_periods * 2 > 8 {
            return Err(InsightError::Configuration(format!(
                "trends.window_periods must be between 1 and 4, got {}",
                self.trends.window_periods
            )));
        }
        if self.trends.stable_epsilon < Decimal::ZERO {
            return Err(InsightError::Configuration(
                "trends.stable_epsilon must not be negative".to_string(),
            ));
        }
        if self.imbalance.lower_bound_pct < Decimal::ZERO
            || self.imbalance.upper_bound_pct > hundred
            || self.imbalance.lower_bound_pct >= self.imbalance.upper_bound_pct
        {
            return Err(InsightError::Configuration(format!(
                "imbalance bounds must satisfy 0 <= lower < upper <= 100, got {}..{}",
                self.imbalance.lower_bound_pct, self.imbalance.upper_bound_pct
            )));
        }
        if self.focus.needs_work_rate > 100 {
            return Err(InsightError::Configuration(format!(
                "focus.needs_work_rate must be a percentage, got {}",
                self.focus.needs_work_rate
            )));
        }
        if self.rules.fight_week_days >= self.rules.taper_days {
            return Err(InsightError::Configuration(
                "rules.fight_week_days must be smaller than rules.taper_days".to_string(),
            ));
        }
        if self.recent_session_limit < self.rules.class_streak {
            return Err(InsightError::Configuration(
                "recent_session_limit must cover rules.class_streak".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            engine: EngineConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config
            .engine
            .validate()
            .with_context(|| format!("Invalid engine settings in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".bjjlog")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    ///
    /// A missing file silently yields defaults; a broken one is reported.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!(
                    "Ignoring config {} ({:#}), using defaults",
                    config_path.display(),
                    err
                );
                Self::default()
            }
        }
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::goal::GoalTargets;
use crate::errors::AppError;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Calendar period a goal is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Weekly,
    Monthly,
}

impl GoalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPeriod::Weekly => "weekly",
            GoalPeriod::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for GoalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" => Ok(GoalPeriod::Weekly),
            "monthly" | "month" => Ok(GoalPeriod::Monthly),
            _ => Err(AppError::UnknownPeriod(s.to_string())),
        }
    }
}

/// User preferences stored as `config.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Account used when none is given. `None` means all accounts.
    #[serde(default)]
    pub default_account: Option<String>,
    #[serde(default = "default_period")]
    pub default_period: GoalPeriod,
    /// Targets applied when an account has no stored goal for the period.
    #[serde(default)]
    pub default_goal_targets: GoalTargets,
}

fn default_period() -> GoalPeriod {
    GoalPeriod::Monthly
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            default_account: None,
            default_period: default_period(),
            default_goal_targets: GoalTargets::default(),
        }
    }
}

impl JournalConfig {
    /// Load `config.json` from `data_dir`, falling back to defaults when it is absent.
    pub fn load_or_default(data_dir: &Path) -> Result<Self, AppError> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: JournalConfig = serde_json::from_str(&raw)
            .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), AppError> {
        self.validate()?;
        let path = data_dir.join(CONFIG_FILE_NAME);
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, raw).map_err(|e| AppError::FileWrite(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Err(e) = self.default_goal_targets.validate() {
            warn!("Rejecting config: {}", e);
            return Err(AppError::InvalidConfig(e.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_round_trips_through_str() {
        for p in [GoalPeriod::Weekly, GoalPeriod::Monthly] {
            assert_eq!(p.to_string().parse::<GoalPeriod>().unwrap(), p);
        }
        assert!(matches!(
            "yearly".parse::<GoalPeriod>(),
            Err(AppError::UnknownPeriod(_))
        ));
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, JournalConfig::default());
        assert_eq!(config.default_period, GoalPeriod::Monthly);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            default_account: Some("acc-1".into()),
            default_period: GoalPeriod::Weekly,
            default_goal_targets: GoalTargets {
                profit: 500.0,
                win_rate: 55.0,
                max_drawdown: 10.0,
                max_trades: 20,
            },
        };
        config.save(dir.path()).unwrap();
        let loaded = JournalConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"default_period":"weekly"}"#)
            .unwrap();
        let config = JournalConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.default_period, GoalPeriod::Weekly);
        assert_eq!(config.default_account, None);
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        assert!(matches!(
            JournalConfig::load_or_default(dir.path()),
            Err(AppError::InvalidConfig(_))
        ));
    }
}

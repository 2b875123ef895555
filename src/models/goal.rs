use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::config::GoalPeriod;
use crate::errors::AppError;

/// Wildcard account id matching every account.
pub const ALL_ACCOUNTS: &str = "all";

/// Which trades a goal or report looks at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountFilter {
    All,
    Id(String),
}

impl AccountFilter {
    pub fn as_str(&self) -> &str {
        match self {
            AccountFilter::All => ALL_ACCOUNTS,
            AccountFilter::Id(id) => id,
        }
    }

    pub fn matches(&self, accounts: &[String]) -> bool {
        match self {
            AccountFilter::All => true,
            AccountFilter::Id(id) => accounts.iter().any(|a| a == id),
        }
    }
}

impl From<String> for AccountFilter {
    fn from(s: String) -> Self {
        if s.is_empty() || s.eq_ignore_ascii_case(ALL_ACCOUNTS) {
            AccountFilter::All
        } else {
            AccountFilter::Id(s)
        }
    }
}

impl From<&str> for AccountFilter {
    fn from(s: &str) -> Self {
        AccountFilter::from(s.to_string())
    }
}

impl From<AccountFilter> for String {
    fn from(filter: AccountFilter) -> Self {
        match filter {
            AccountFilter::All => ALL_ACCOUNTS.to_string(),
            AccountFilter::Id(id) => id,
        }
    }
}

impl std::fmt::Display for AccountFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four targets of a period goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalTargets {
    /// Net pnl to reach.
    pub profit: f64,
    /// Win rate to reach, in percent.
    pub win_rate: f64,
    /// Drawdown not to exceed, in percent of peak.
    pub max_drawdown: f64,
    /// Trade count not to exceed.
    pub max_trades: u32,
}

impl GoalTargets {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.profit.is_finite() {
            return Err(AppError::InvalidGoal("profit target must be finite".into()));
        }
        if !(0.0..=100.0).contains(&self.win_rate) {
            return Err(AppError::InvalidGoal(format!(
                "win rate target {} outside 0..=100",
                self.win_rate
            )));
        }
        if !self.max_drawdown.is_finite() || self.max_drawdown < 0.0 {
            return Err(AppError::InvalidGoal(format!(
                "drawdown target {} must be a non-negative percentage",
                self.max_drawdown
            )));
        }
        Ok(())
    }
}

/// A stored goal: one per account and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub account: AccountFilter,
    pub period: GoalPeriod,
    pub targets: GoalTargets,
    pub updated_at: String,
}

/// Metric a goal entry measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    Profit,
    WinRate,
    Drawdown,
    TradeCount,
}

impl GoalMetric {
    /// Inverse goals are met by staying at or below the target.
    pub fn is_inverse(&self) -> bool {
        matches!(self, GoalMetric::Drawdown | GoalMetric::TradeCount)
    }

    pub fn label(&self) -> &'static str {
        match self {
            GoalMetric::Profit => "Profit",
            GoalMetric::WinRate => "Win Rate %",
            GoalMetric::Drawdown => "Max Drawdown %",
            GoalMetric::TradeCount => "Trades",
        }
    }
}

/// Progress toward a single target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub metric: GoalMetric,
    pub current: f64,
    pub target: f64,
    /// Percent of target reached. Capped at 100, may be negative.
    pub progress: f64,
    pub achieved: bool,
}

/// Progress on all four targets for one account over one period window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgressReport {
    pub account: AccountFilter,
    pub period: GoalPeriod,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub profit: GoalProgress,
    pub win_rate: GoalProgress,
    pub drawdown: GoalProgress,
    pub trade_count: GoalProgress,
}

impl GoalProgressReport {
    pub fn entries(&self) -> [&GoalProgress; 4] {
        [&self.profit, &self.win_rate, &self.drawdown, &self.trade_count]
    }
}

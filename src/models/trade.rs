use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Side of a trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeDirection {
    Long,
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }
}

impl std::str::FromStr for TradeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" | "buy" => Ok(TradeDirection::Long),
            "short" | "sell" => Ok(TradeDirection::Short),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

/// Lifecycle state of a journal entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
        }
    }
}

impl std::str::FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TradeStatus::Open),
            "closed" => Ok(TradeStatus::Closed),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// A logged trade with all its details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_price: Option<f64>,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub position_size: f64,
    pub entry_date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_date: Option<NaiveDateTime>,
    pub status: TradeStatus,
    /// Realized profit-and-loss. Only trades carrying one count toward statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_reward_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mistakes: Vec<String>,
    /// Ids of the accounts this trade was taken on.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Ids of the trading rules broken on this trade.
    #[serde(default)]
    pub broken_rules: Vec<String>,
}

impl Trade {
    /// Exit date if the trade has one, otherwise the entry date.
    pub fn effective_date(&self) -> NaiveDateTime {
        self.exit_date.unwrap_or(self.entry_date)
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Reward distance over risk distance, from the planned take-profit and stop-loss.
    pub fn planned_risk_reward(&self) -> Option<f64> {
        planned_risk_reward(self.entry_price, self.stop_loss, self.take_profit)
    }

    /// Profit-and-loss the position would realize if closed at `exit_price`.
    pub fn realized_pnl(&self, exit_price: f64) -> f64 {
        let delta = match self.direction {
            TradeDirection::Long => exit_price - self.entry_price,
            TradeDirection::Short => self.entry_price - exit_price,
        };
        delta * self.position_size
    }
}

pub fn planned_risk_reward(entry_price: f64, stop_loss: f64, take_profit: f64) -> Option<f64> {
    let risk = (entry_price - stop_loss).abs();
    if risk == 0.0 || !risk.is_finite() {
        return None;
    }
    let reward = (take_profit - entry_price).abs();
    Some(reward / risk)
}

/// User input for a new journal entry. The id and derived fields are filled in by the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    #[serde(default)]
    pub exit_price: Option<f64>,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub position_size: f64,
    pub entry_date: NaiveDateTime,
    #[serde(default)]
    pub exit_date: Option<NaiveDateTime>,
    /// Overrides the pnl computed from the exit price (fees, partial fills).
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub risk_reward_ratio: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mistakes: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub broken_rules: Vec<String>,
}

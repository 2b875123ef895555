use serde::{Deserialize, Serialize};

/// A trading account trades can be associated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker: Option<String>,
    pub initial_balance: f64,
    pub currency: String,
    pub created_at: String,
}

/// A personal trading rule. Trades reference rules they broke by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingRule {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

/// How often a rule was broken in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBreakCount {
    pub rule_id: String,
    /// Rule name, or the id when the rule no longer exists.
    pub name: String,
    pub count: usize,
}

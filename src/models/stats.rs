use serde::{Deserialize, Serialize};

/// Summary statistics over a trade collection. Recomputed on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    // Trades
    /// Trades carrying a realized pnl.
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub open_trades: usize,
    pub win_rate: f64,

    // P&L
    pub net_pnl: f64,
    pub gross_profit: f64,
    /// Absolute sum of losing pnl.
    pub gross_loss: f64,
    /// `f64::INFINITY` when there are wins and no losses.
    pub profit_factor: f64,
    pub average_win: f64,
    /// Mean of the losing pnl values (negative).
    pub average_loss: f64,
    pub expectancy: f64,
    pub pnl_std_dev: f64,
    pub best_trade: f64,
    pub worst_trade: f64,

    // Drawdown, as a percentage of the running peak of cumulative pnl
    pub max_drawdown: f64,

    // Consistency
    pub consecutive_wins: usize,
    pub consecutive_losses: usize,

    // Risk
    pub average_risk_reward: f64,
}

impl PortfolioStats {
    pub fn has_infinite_profit_factor(&self) -> bool {
        self.profit_factor.is_infinite()
    }
}

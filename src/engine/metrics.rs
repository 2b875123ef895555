use statrs::statistics::Statistics;

use crate::models::stats::PortfolioStats;
use crate::models::trade::{Trade, TradeStatus};

/// Order trades by effective date (exit date, else entry date). Ties keep input order.
pub fn sort_chronologically(trades: &[Trade]) -> Vec<&Trade> {
    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.effective_date());
    sorted
}

/// Realized pnl values of the trades that have one, in chronological order.
fn realized_pnls(trades: &[Trade]) -> Vec<f64> {
    sort_chronologically(trades)
        .into_iter()
        .filter_map(|t| t.pnl)
        .collect()
}

/// Calculate all portfolio statistics from a trade collection.
pub fn calculate_portfolio_stats(trades: &[Trade]) -> PortfolioStats {
    let open_trades = trades
        .iter()
        .filter(|t| t.status == TradeStatus::Open)
        .count();
    let average_risk_reward = average_risk_reward(trades);

    let pnls = realized_pnls(trades);
    let total_trades = pnls.len();

    if total_trades == 0 {
        return PortfolioStats {
            open_trades,
            average_risk_reward,
            ..PortfolioStats::default()
        };
    }

    // ── Trade classification ──
    let winning: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losing: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

    let winning_trades = winning.len();
    let losing_trades = losing.len();
    let win_rate = winning_trades as f64 / total_trades as f64 * 100.0;

    // ── P&L ──
    let gross_profit: f64 = winning.iter().sum();
    let gross_loss: f64 = losing.iter().map(|p| p.abs()).sum();
    let net_pnl: f64 = pnls.iter().sum();
    let profit_factor = profit_factor(gross_profit, gross_loss);

    let average_win = if winning_trades > 0 {
        gross_profit / winning_trades as f64
    } else {
        0.0
    };
    let average_loss = if losing_trades > 0 {
        -gross_loss / losing_trades as f64
    } else {
        0.0
    };
    let expectancy = net_pnl / total_trades as f64;
    let pnl_std_dev = if total_trades >= 2 {
        pnls.iter().std_dev()
    } else {
        0.0
    };

    let best_trade = pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst_trade = pnls.iter().copied().fold(f64::INFINITY, f64::min);

    // ── Drawdown ──
    let max_drawdown = max_drawdown_of(&pnls);

    // ── Consistency ──
    let (consecutive_wins, consecutive_losses) = calculate_consecutive(&pnls);

    PortfolioStats {
        total_trades,
        winning_trades,
        losing_trades,
        open_trades,
        win_rate,
        net_pnl,
        gross_profit,
        gross_loss,
        profit_factor,
        average_win,
        average_loss,
        expectancy,
        pnl_std_dev,
        best_trade,
        worst_trade,
        max_drawdown,
        consecutive_wins,
        consecutive_losses,
        average_risk_reward,
    }
}

/// Percentage of trades with a realized pnl that closed positive. 0 when none qualify.
pub fn calculate_win_rate(trades: &[Trade]) -> f64 {
    let (wins, total) = trades
        .iter()
        .filter_map(|t| t.pnl)
        .fold((0usize, 0usize), |(w, n), p| (w + usize::from(p > 0.0), n + 1));
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64 * 100.0
    }
}

/// Max drawdown in percent of the running peak of cumulative pnl, in chronological order.
pub fn calculate_max_drawdown(trades: &[Trade]) -> f64 {
    max_drawdown_of(&realized_pnls(trades))
}

fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Cumulative pnl starts at 0; drawdown is only measured once the peak is positive.
fn max_drawdown_of(pnls: &[f64]) -> f64 {
    let mut running = 0.0f64;
    let mut peak = 0.0f64;
    let mut max_dd_pct = 0.0f64;

    for pnl in pnls {
        running += pnl;
        if running > peak {
            peak = running;
        }
        if peak > 0.0 {
            let dd_pct = (peak - running) / peak * 100.0;
            if dd_pct > max_dd_pct {
                max_dd_pct = dd_pct;
            }
        }
    }
    max_dd_pct
}

/// Longest runs of winning (pnl > 0) and non-winning (pnl <= 0) trades.
fn calculate_consecutive(pnls: &[f64]) -> (usize, usize) {
    let mut max_wins = 0usize;
    let mut max_losses = 0usize;
    let mut current_wins = 0usize;
    let mut current_losses = 0usize;

    for pnl in pnls {
        if *pnl > 0.0 {
            current_wins += 1;
            current_losses = 0;
        } else {
            current_losses += 1;
            current_wins = 0;
        }
        max_wins = max_wins.max(current_wins);
        max_losses = max_losses.max(current_losses);
    }

    (max_wins, max_losses)
}

fn average_risk_reward(trades: &[Trade]) -> f64 {
    let ratios: Vec<f64> = trades.iter().filter_map(|t| t.risk_reward_ratio).collect();
    if ratios.is_empty() {
        0.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }
}

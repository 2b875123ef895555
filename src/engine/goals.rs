use chrono::{Local, NaiveDateTime};
use tracing::debug;

use super::metrics::{calculate_max_drawdown, calculate_win_rate};
use super::period::PeriodWindow;
use crate::models::config::GoalPeriod;
use crate::models::goal::{AccountFilter, GoalMetric, GoalProgress, GoalProgressReport, GoalTargets};
use crate::models::trade::Trade;

/// Goal progress for `account` over the current `period` window.
pub fn calculate_goal_progress(
    trades: &[Trade],
    account: &AccountFilter,
    period: GoalPeriod,
    targets: &GoalTargets,
) -> GoalProgressReport {
    calculate_goal_progress_at(trades, account, period, targets, Local::now().naive_local())
}

/// Goal progress for the `period` window containing `now`.
pub fn calculate_goal_progress_at(
    trades: &[Trade],
    account: &AccountFilter,
    period: GoalPeriod,
    targets: &GoalTargets,
    now: NaiveDateTime,
) -> GoalProgressReport {
    let window = PeriodWindow::containing(period, now);
    let filtered = filter_trades(trades, account, &window);
    debug!(
        "Goal progress for {} ({}): {} of {} trades in window",
        account,
        period,
        filtered.len(),
        trades.len()
    );

    let profit: f64 = filtered.iter().filter_map(|t| t.pnl).sum();
    let win_rate = calculate_win_rate(&filtered);
    let drawdown = calculate_max_drawdown(&filtered);
    let trade_count = filtered.len() as f64;

    GoalProgressReport {
        account: account.clone(),
        period,
        window_start: window.start,
        window_end: window.end,
        profit: progress_entry(GoalMetric::Profit, profit, targets.profit),
        win_rate: progress_entry(GoalMetric::WinRate, win_rate, targets.win_rate),
        drawdown: progress_entry(GoalMetric::Drawdown, drawdown, targets.max_drawdown),
        trade_count: progress_entry(
            GoalMetric::TradeCount,
            trade_count,
            targets.max_trades as f64,
        ),
    }
}

/// Trades on `account` whose effective date falls inside `window`.
pub fn filter_trades(
    trades: &[Trade],
    account: &AccountFilter,
    window: &PeriodWindow,
) -> Vec<Trade> {
    trades
        .iter()
        .filter(|t| account.matches(&t.accounts) && window.contains(t.effective_date()))
        .cloned()
        .collect()
}

/// Progress is capped at 100 but not floored. A zero target yields 0 progress.
fn progress_entry(metric: GoalMetric, current: f64, target: f64) -> GoalProgress {
    let progress = if target == 0.0 {
        0.0
    } else {
        (current / target * 100.0).min(100.0)
    };
    let achieved = if metric.is_inverse() {
        current <= target
    } else {
        current >= target
    };
    GoalProgress {
        metric,
        current,
        target,
        progress,
        achieved,
    }
}

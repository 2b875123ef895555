use std::path::Path;

use crate::data::storage::format_timestamp;
use crate::errors::AppError;
use crate::models::goal::GoalProgressReport;
use crate::models::stats::PortfolioStats;
use crate::models::trade::Trade;

fn create_writer(path: &Path) -> Result<csv::Writer<std::fs::File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV: {}", e)))
}

fn format_opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_default()
}

/// Write a list of journal trades to a CSV file.
pub fn write_trades_csv(trades: &[Trade], path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;

    wtr.write_record([
        "Id",
        "Symbol",
        "Direction",
        "Status",
        "Entry Date",
        "Entry Price",
        "Exit Date",
        "Exit Price",
        "Stop Loss",
        "Take Profit",
        "Size",
        "P&L",
        "R:R",
        "Accounts",
        "Tags",
        "Mistakes",
        "Broken Rules",
        "Notes",
    ])?;

    for t in trades {
        wtr.write_record([
            t.id.as_str(),
            t.symbol.as_str(),
            t.direction.as_str(),
            t.status.as_str(),
            &format_timestamp(&t.entry_date),
            &format!("{:.5}", t.entry_price),
            &t.exit_date.as_ref().map(format_timestamp).unwrap_or_default(),
            &format_opt(t.exit_price, 5),
            &format!("{:.5}", t.stop_loss),
            &format!("{:.5}", t.take_profit),
            &format!("{:.4}", t.position_size),
            &format_opt(t.pnl, 2),
            &format_opt(t.risk_reward_ratio, 2),
            &t.accounts.join(";"),
            &t.tags.join(";"),
            &t.mistakes.join(";"),
            &t.broken_rules.join(";"),
            t.notes.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write portfolio statistics as a key-value CSV report.
pub fn write_stats_csv(stats: &PortfolioStats, path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;

    wtr.write_record(["Metric", "Value"])?;

    let profit_factor = if stats.has_infinite_profit_factor() {
        "inf".to_string()
    } else {
        format!("{:.2}", stats.profit_factor)
    };

    let rows: Vec<(&str, String)> = vec![
        // Trades
        ("Total Trades", stats.total_trades.to_string()),
        ("Winning Trades", stats.winning_trades.to_string()),
        ("Losing Trades", stats.losing_trades.to_string()),
        ("Open Trades", stats.open_trades.to_string()),
        ("Win Rate %", format!("{:.2}", stats.win_rate)),
        // P&L
        ("Net P&L", format!("{:.2}", stats.net_pnl)),
        ("Gross Profit", format!("{:.2}", stats.gross_profit)),
        ("Gross Loss", format!("{:.2}", stats.gross_loss)),
        ("Profit Factor", profit_factor),
        ("Avg Win", format!("{:.2}", stats.average_win)),
        ("Avg Loss", format!("{:.2}", stats.average_loss)),
        ("Expectancy", format!("{:.2}", stats.expectancy)),
        ("P&L Std Dev", format!("{:.2}", stats.pnl_std_dev)),
        ("Best Trade", format!("{:.2}", stats.best_trade)),
        ("Worst Trade", format!("{:.2}", stats.worst_trade)),
        // Drawdown
        ("Max Drawdown %", format!("{:.2}", stats.max_drawdown)),
        // Consistency
        ("Max Consecutive Wins", stats.consecutive_wins.to_string()),
        ("Max Consecutive Losses", stats.consecutive_losses.to_string()),
        // Risk
        ("Avg R:R", format!("{:.2}", stats.average_risk_reward)),
    ];

    for (name, value) in &rows {
        wtr.write_record([*name, value.as_str()])?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write a goal progress report, one row per target.
pub fn write_goal_progress_csv(report: &GoalProgressReport, path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;

    wtr.write_record(["Account", "Period", "Goal", "Current", "Target", "Progress %", "Achieved"])?;

    for entry in report.entries() {
        wtr.write_record([
            report.account.as_str(),
            report.period.as_str(),
            entry.metric.label(),
            &format!("{:.2}", entry.current),
            &format!("{:.2}", entry.target),
            &format!("{:.1}", entry.progress),
            if entry.achieved { "yes" } else { "no" },
        ])?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::goals::calculate_goal_progress_at;
    use crate::engine::metrics::calculate_portfolio_stats;
    use crate::engine::test_support::{at, closed_trade, open_trade};
    use crate::models::config::GoalPeriod;
    use crate::models::goal::{AccountFilter, GoalTargets};

    #[test]
    fn test_trades_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");
        let mut closed = closed_trade("t1", 42.0, 3);
        closed.tags = vec!["a".into(), "b".into()];
        let trades = vec![closed, open_trade("t2", 4)];
        write_trades_csv(&trades, &path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "t1");
        assert_eq!(&rows[0][11], "42.00");
        assert_eq!(&rows[0][14], "a;b");
        // Open trade has empty exit and pnl columns
        assert_eq!(&rows[1][6], "");
        assert_eq!(&rows[1][11], "");
    }

    #[test]
    fn test_stats_csv_marks_infinite_profit_factor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let stats = calculate_portfolio_stats(&[closed_trade("t1", 10.0, 1)]);
        write_stats_csv(&stats, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Metric,Value"));
        assert!(content.contains("Profit Factor,inf"));
        assert!(content.contains("Win Rate %,100.00"));
    }

    #[test]
    fn test_goal_progress_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goals.csv");
        let report = calculate_goal_progress_at(
            &[closed_trade("t1", 50.0, 10)],
            &AccountFilter::All,
            GoalPeriod::Monthly,
            &GoalTargets {
                profit: 100.0,
                win_rate: 50.0,
                max_drawdown: 10.0,
                max_trades: 5,
            },
            at(2024, 1, 15, 12),
        );
        write_goal_progress_csv(&report, &path).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[0][0], "all");
        assert_eq!(&rows[0][2], "Profit");
        assert_eq!(&rows[0][5], "50.0");
        assert_eq!(&rows[0][6], "no");
        assert_eq!(&rows[3][6], "yes");
    }
}

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};

use super::period::PeriodWindow;
use crate::models::account::{RuleBreakCount, TradingRule};
use crate::models::config::GoalPeriod;
use crate::models::trade::Trade;

/// Count broken-rule references among trades entered in the current `period`.
pub fn tally_broken_rules(trades: &[Trade], period: GoalPeriod) -> HashMap<String, usize> {
    tally_broken_rules_at(trades, period, Local::now().naive_local())
}

/// Count broken-rule references among trades entered in the window containing `now`.
/// Rules that were never referenced are absent from the map.
pub fn tally_broken_rules_at(
    trades: &[Trade],
    period: GoalPeriod,
    now: NaiveDateTime,
) -> HashMap<String, usize> {
    let window = PeriodWindow::containing(period, now);
    let mut tally: HashMap<String, usize> = HashMap::new();

    for trade in trades.iter().filter(|t| window.contains(t.entry_date)) {
        for rule_id in &trade.broken_rules {
            *tally.entry(rule_id.clone()).or_insert(0) += 1;
        }
    }
    tally
}

/// Attach rule names to a tally, most broken first.
pub fn rank_broken_rules(
    tally: &HashMap<String, usize>,
    rules: &[TradingRule],
) -> Vec<RuleBreakCount> {
    let mut ranked: Vec<RuleBreakCount> = tally
        .iter()
        .map(|(rule_id, count)| RuleBreakCount {
            rule_id: rule_id.clone(),
            name: rules
                .iter()
                .find(|r| &r.id == rule_id)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| rule_id.clone()),
            count: *count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{at, trade_at};

    fn with_rules(mut trade: Trade, rules: &[&str]) -> Trade {
        trade.broken_rules = rules.iter().map(|r| r.to_string()).collect();
        trade
    }

    fn journal() -> Vec<Trade> {
        vec![
            with_rules(
                trade_at("t1", Some(10.0), at(2024, 3, 11, 9), None, &[]),
                &["no-fomo", "max-risk"],
            ),
            with_rules(
                trade_at("t2", Some(-5.0), at(2024, 3, 12, 9), None, &[]),
                &["no-fomo"],
            ),
            // Entered last week but exited this week: tallied by entry date only.
            with_rules(
                trade_at("t3", Some(-5.0), at(2024, 3, 8, 9), Some(at(2024, 3, 12, 9)), &[]),
                &["stop-moved"],
            ),
            trade_at("t4", Some(3.0), at(2024, 3, 13, 9), None, &[]),
        ]
    }

    #[test]
    fn test_weekly_tally() {
        let tally = tally_broken_rules_at(&journal(), GoalPeriod::Weekly, at(2024, 3, 13, 12));
        assert_eq!(tally.len(), 2);
        assert_eq!(tally["no-fomo"], 2);
        assert_eq!(tally["max-risk"], 1);
        assert!(!tally.contains_key("stop-moved"));
    }

    #[test]
    fn test_monthly_tally_includes_earlier_entries() {
        let tally = tally_broken_rules_at(&journal(), GoalPeriod::Monthly, at(2024, 3, 13, 12));
        assert_eq!(tally["stop-moved"], 1);
        assert_eq!(tally.len(), 3);
    }

    #[test]
    fn test_empty_tally() {
        assert!(tally_broken_rules_at(&[], GoalPeriod::Weekly, at(2024, 3, 13, 12)).is_empty());
    }

    #[test]
    fn test_rank_uses_names_and_orders_by_count() {
        let tally = tally_broken_rules_at(&journal(), GoalPeriod::Monthly, at(2024, 3, 13, 12));
        let rules = vec![TradingRule {
            id: "no-fomo".into(),
            name: "No FOMO entries".into(),
            description: None,
            created_at: "2024-01-01 00:00:00".into(),
        }];
        let ranked = rank_broken_rules(&tally, &rules);
        assert_eq!(ranked[0].name, "No FOMO entries");
        assert_eq!(ranked[0].count, 2);
        // Ties broken by name; unknown rules fall back to their id.
        assert_eq!(ranked[1].name, "max-risk");
        assert_eq!(ranked[2].name, "stop-moved");
    }
}

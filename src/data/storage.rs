use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::account::{Account, TradingRule};
use crate::models::config::GoalPeriod;
use crate::models::goal::{AccountFilter, Goal, GoalTargets};
use crate::models::trade::{Trade, TradeDirection, TradeStatus};

/// Timestamps are stored as sortable text; fractional seconds only when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    broker          TEXT,
    initial_balance REAL NOT NULL,
    currency        TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS trades (
    id                TEXT PRIMARY KEY,
    symbol            TEXT NOT NULL,
    direction         TEXT NOT NULL,
    entry_price       REAL NOT NULL,
    exit_price        REAL,
    stop_loss         REAL NOT NULL,
    take_profit       REAL NOT NULL,
    position_size     REAL NOT NULL,
    entry_date        TEXT NOT NULL,
    exit_date         TEXT,
    status            TEXT NOT NULL,
    pnl               REAL,
    risk_reward_ratio REAL,
    notes             TEXT,
    tags              TEXT NOT NULL DEFAULT '[]',
    mistakes          TEXT NOT NULL DEFAULT '[]',
    accounts          TEXT NOT NULL DEFAULT '[]',
    broken_rules      TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_trades_entry_date ON trades(entry_date);

CREATE TABLE IF NOT EXISTS rules (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS goals (
    account    TEXT NOT NULL,
    period     TEXT NOT NULL,
    targets    TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (account, period)
);
";

const TRADE_COLUMNS: &str = "id, symbol, direction, entry_price, exit_price, stop_loss, \
     take_profit, position_size, entry_date, exit_date, status, pnl, risk_reward_ratio, notes, \
     tags, mistakes, accounts, broken_rules";

/// Open (or create) the journal database at `path` and ensure the schema exists.
pub fn initialize_database(path: &str) -> Result<Connection, AppError> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    info!("Journal database initialized at {}", path);
    Ok(conn)
}

pub fn create_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        AppError::InvalidTimestamp {
            value: value.to_string(),
            message: e.to_string(),
        }
    })
}

fn to_json_list(values: &[String]) -> Result<String, AppError> {
    Ok(serde_json::to_string(values)?)
}

fn from_json_list(raw: &str) -> Result<Vec<String>, AppError> {
    Ok(serde_json::from_str(raw)?)
}

// ── Trades ──

/// Raw trade row as stored; converted to a `Trade` outside the row callback.
struct TradeRow {
    id: String,
    symbol: String,
    direction: String,
    entry_price: f64,
    exit_price: Option<f64>,
    stop_loss: f64,
    take_profit: f64,
    position_size: f64,
    entry_date: String,
    exit_date: Option<String>,
    status: String,
    pnl: Option<f64>,
    risk_reward_ratio: Option<f64>,
    notes: Option<String>,
    tags: String,
    mistakes: String,
    accounts: String,
    broken_rules: String,
}

impl TradeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TradeRow {
            id: row.get(0)?,
            symbol: row.get(1)?,
            direction: row.get(2)?,
            entry_price: row.get(3)?,
            exit_price: row.get(4)?,
            stop_loss: row.get(5)?,
            take_profit: row.get(6)?,
            position_size: row.get(7)?,
            entry_date: row.get(8)?,
            exit_date: row.get(9)?,
            status: row.get(10)?,
            pnl: row.get(11)?,
            risk_reward_ratio: row.get(12)?,
            notes: row.get(13)?,
            tags: row.get(14)?,
            mistakes: row.get(15)?,
            accounts: row.get(16)?,
            broken_rules: row.get(17)?,
        })
    }

    fn into_trade(self) -> Result<Trade, AppError> {
        let corrupt =
            |e: String| AppError::Database(format!("Corrupt trade row {}: {}", self.id, e));
        let direction = self.direction.parse::<TradeDirection>().map_err(corrupt)?;
        let status = self.status.parse::<TradeStatus>().map_err(corrupt)?;
        let exit_date = self.exit_date.as_deref().map(parse_timestamp).transpose()?;

        Ok(Trade {
            direction,
            status,
            entry_date: parse_timestamp(&self.entry_date)?,
            exit_date,
            tags: from_json_list(&self.tags)?,
            mistakes: from_json_list(&self.mistakes)?,
            accounts: from_json_list(&self.accounts)?,
            broken_rules: from_json_list(&self.broken_rules)?,
            id: self.id,
            symbol: self.symbol,
            entry_price: self.entry_price,
            exit_price: self.exit_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            position_size: self.position_size,
            pnl: self.pnl,
            risk_reward_ratio: self.risk_reward_ratio,
            notes: self.notes,
        })
    }
}

pub fn insert_trade(conn: &Connection, trade: &Trade) -> Result<String, AppError> {
    conn.execute(
        &format!(
            "INSERT INTO trades ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            TRADE_COLUMNS
        ),
        params![
            trade.id,
            trade.symbol,
            trade.direction.as_str(),
            trade.entry_price,
            trade.exit_price,
            trade.stop_loss,
            trade.take_profit,
            trade.position_size,
            format_timestamp(&trade.entry_date),
            trade.exit_date.as_ref().map(format_timestamp),
            trade.status.as_str(),
            trade.pnl,
            trade.risk_reward_ratio,
            trade.notes,
            to_json_list(&trade.tags)?,
            to_json_list(&trade.mistakes)?,
            to_json_list(&trade.accounts)?,
            to_json_list(&trade.broken_rules)?,
        ],
    )?;
    debug!("Inserted trade {} ({})", trade.id, trade.symbol);
    Ok(trade.id.clone())
}

pub fn update_trade(conn: &Connection, trade: &Trade) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE trades SET symbol = ?2, direction = ?3, entry_price = ?4, exit_price = ?5,
             stop_loss = ?6, take_profit = ?7, position_size = ?8, entry_date = ?9, exit_date = ?10,
             status = ?11, pnl = ?12, risk_reward_ratio = ?13, notes = ?14, tags = ?15,
             mistakes = ?16, accounts = ?17, broken_rules = ?18
         WHERE id = ?1",
        params![
            trade.id,
            trade.symbol,
            trade.direction.as_str(),
            trade.entry_price,
            trade.exit_price,
            trade.stop_loss,
            trade.take_profit,
            trade.position_size,
            format_timestamp(&trade.entry_date),
            trade.exit_date.as_ref().map(format_timestamp),
            trade.status.as_str(),
            trade.pnl,
            trade.risk_reward_ratio,
            trade.notes,
            to_json_list(&trade.tags)?,
            to_json_list(&trade.mistakes)?,
            to_json_list(&trade.accounts)?,
            to_json_list(&trade.broken_rules)?,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Trade {}", trade.id)));
    }
    Ok(())
}

pub fn get_trade_by_id(conn: &Connection, id: &str) -> Result<Trade, AppError> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM trades WHERE id = ?1", TRADE_COLUMNS),
            params![id],
            TradeRow::from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("Trade {}", id)))?;
    row.into_trade()
}

/// All trades ordered by entry date.
pub fn get_all_trades(conn: &Connection) -> Result<Vec<Trade>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM trades ORDER BY entry_date ASC, id ASC",
        TRADE_COLUMNS
    ))?;
    let rows = stmt.query_map([], TradeRow::from_row)?;

    let mut trades = Vec::new();
    for row in rows {
        trades.push(row?.into_trade()?);
    }
    Ok(trades)
}

pub fn delete_trade_by_id(conn: &Connection, id: &str) -> Result<(), AppError> {
    let changed = conn.execute("DELETE FROM trades WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Trade {}", id)));
    }
    Ok(())
}

// ── Accounts ──

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        broker: row.get(2)?,
        initial_balance: row.get(3)?,
        currency: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_account(conn: &Connection, account: &Account) -> Result<String, AppError> {
    conn.execute(
        "INSERT INTO accounts (id, name, broker, initial_balance, currency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.id,
            account.name,
            account.broker,
            account.initial_balance,
            account.currency,
            account.created_at,
        ],
    )?;
    Ok(account.id.clone())
}

pub fn get_account_by_id(conn: &Connection, id: &str) -> Result<Account, AppError> {
    conn.query_row(
        "SELECT id, name, broker, initial_balance, currency, created_at \
         FROM accounts WHERE id = ?1",
        params![id],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("Account {}", id)))
}

pub fn get_all_accounts(conn: &Connection) -> Result<Vec<Account>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, broker, initial_balance, currency, created_at \
         FROM accounts ORDER BY name",
    )?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

/// Delete an account with its goals and remove its id from every trade, in one transaction.
pub fn delete_account_by_id(conn: &mut Connection, id: &str) -> Result<(), AppError> {
    let tx = conn.transaction()?;
    let changed = tx.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Account {}", id)));
    }
    tx.execute("DELETE FROM goals WHERE account = ?1", params![id])?;

    let mut detached = 0;
    for mut trade in get_all_trades(&tx)? {
        if !trade.accounts.iter().any(|a| a == id) {
            continue;
        }
        trade.accounts.retain(|a| a != id);
        update_trade(&tx, &trade)?;
        detached += 1;
    }
    tx.commit()?;

    debug!("Account {} deleted, detached from {} trades", id, detached);
    Ok(())
}

// ── Rules ──

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<TradingRule> {
    Ok(TradingRule {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn insert_rule(conn: &Connection, rule: &TradingRule) -> Result<String, AppError> {
    conn.execute(
        "INSERT INTO rules (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![rule.id, rule.name, rule.description, rule.created_at],
    )?;
    Ok(rule.id.clone())
}

pub fn get_all_rules(conn: &Connection) -> Result<Vec<TradingRule>, AppError> {
    let mut stmt =
        conn.prepare("SELECT id, name, description, created_at FROM rules ORDER BY name")?;
    let rules = stmt
        .query_map([], rule_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rules)
}

pub fn delete_rule_by_id(conn: &Connection, id: &str) -> Result<(), AppError> {
    let changed = conn.execute("DELETE FROM rules WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(AppError::NotFound(format!("Rule {}", id)));
    }
    Ok(())
}

// ── Goals ──

/// Insert or replace the goal for an account and period.
pub fn upsert_goal(conn: &Connection, goal: &Goal) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO goals (account, period, targets, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account, period) DO UPDATE SET targets = excluded.targets,
             updated_at = excluded.updated_at",
        params![
            goal.account.as_str(),
            goal.period.as_str(),
            serde_json::to_string(&goal.targets)?,
            goal.updated_at,
        ],
    )?;
    Ok(())
}

struct GoalRow {
    account: String,
    period: String,
    targets: String,
    updated_at: String,
}

impl GoalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(GoalRow {
            account: row.get(0)?,
            period: row.get(1)?,
            targets: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    fn into_goal(self) -> Result<Goal, AppError> {
        let targets: GoalTargets = serde_json::from_str(&self.targets)?;
        Ok(Goal {
            account: AccountFilter::from(self.account),
            period: self.period.parse::<GoalPeriod>()?,
            targets,
            updated_at: self.updated_at,
        })
    }
}

pub fn get_goal(
    conn: &Connection,
    account: &AccountFilter,
    period: GoalPeriod,
) -> Result<Option<Goal>, AppError> {
    conn.query_row(
        "SELECT account, period, targets, updated_at FROM goals \
         WHERE account = ?1 AND period = ?2",
        params![account.as_str(), period.as_str()],
        GoalRow::from_row,
    )
    .optional()?
    .map(GoalRow::into_goal)
    .transpose()
}

pub fn get_all_goals(conn: &Connection) -> Result<Vec<Goal>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT account, period, targets, updated_at FROM goals ORDER BY account, period",
    )?;
    let rows = stmt.query_map([], GoalRow::from_row)?;

    let mut goals = Vec::new();
    for row in rows {
        goals.push(row?.into_goal()?);
    }
    Ok(goals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{at, trade_at};

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    fn sample_trade() -> Trade {
        let mut t = trade_at(
            "t-1",
            Some(125.5),
            at(2024, 3, 11, 9),
            Some(at(2024, 3, 11, 14)),
            &["acc-1", "acc-2"],
        );
        t.tags = vec!["breakout".into()];
        t.mistakes = vec!["late entry".into()];
        t.broken_rules = vec!["no-fomo".into()];
        t.notes = Some("clean setup".into());
        t.risk_reward_ratio = Some(2.0);
        t
    }

    #[test]
    fn test_trade_insert_and_read_back() {
        let conn = memory_db();
        let trade = sample_trade();
        insert_trade(&conn, &trade).unwrap();
        let loaded = get_trade_by_id(&conn, "t-1").unwrap();
        assert_eq!(loaded, trade);
    }

    #[test]
    fn test_fractional_seconds_survive_storage() {
        let conn = memory_db();
        let mut trade = sample_trade();
        trade.entry_date = at(2024, 3, 11, 9) + chrono::Duration::milliseconds(250);
        insert_trade(&conn, &trade).unwrap();
        assert_eq!(get_trade_by_id(&conn, "t-1").unwrap().entry_date, trade.entry_date);
    }

    #[test]
    fn test_trade_update_and_delete() {
        let conn = memory_db();
        let mut trade = sample_trade();
        insert_trade(&conn, &trade).unwrap();

        trade.pnl = Some(-10.0);
        trade.status = TradeStatus::Closed;
        update_trade(&conn, &trade).unwrap();
        assert_eq!(get_trade_by_id(&conn, "t-1").unwrap().pnl, Some(-10.0));

        delete_trade_by_id(&conn, "t-1").unwrap();
        assert!(matches!(
            get_trade_by_id(&conn, "t-1"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_trade_by_id(&conn, "t-1"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_missing_trade() {
        let conn = memory_db();
        assert!(matches!(
            update_trade(&conn, &sample_trade()),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_trades_ordered_by_entry_date() {
        let conn = memory_db();
        let late = trade_at("late", Some(1.0), at(2024, 3, 20, 9), None, &[]);
        let early = trade_at("early", None, at(2024, 3, 1, 9), None, &[]);
        insert_trade(&conn, &late).unwrap();
        insert_trade(&conn, &early).unwrap();
        let ids: Vec<String> = get_all_trades(&conn).unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_accounts_and_goals() {
        let mut conn = memory_db();
        let account = Account {
            id: "acc-1".into(),
            name: "Prop firm".into(),
            broker: Some("Tradovate".into()),
            initial_balance: 50_000.0,
            currency: "USD".into(),
            created_at: "2024-01-01 00:00:00".into(),
        };
        insert_account(&conn, &account).unwrap();
        assert_eq!(get_account_by_id(&conn, "acc-1").unwrap(), account);
        assert_eq!(get_all_accounts(&conn).unwrap().len(), 1);

        let mut goal = Goal {
            account: AccountFilter::from("acc-1"),
            period: GoalPeriod::Weekly,
            targets: GoalTargets {
                profit: 1_000.0,
                win_rate: 55.0,
                max_drawdown: 5.0,
                max_trades: 15,
            },
            updated_at: "2024-03-01 00:00:00".into(),
        };
        upsert_goal(&conn, &goal).unwrap();
        goal.targets.profit = 1_500.0;
        upsert_goal(&conn, &goal).unwrap();

        let stored = get_goal(&conn, &goal.account, GoalPeriod::Weekly).unwrap().unwrap();
        assert_eq!(stored.targets.profit, 1_500.0);
        assert!(get_goal(&conn, &goal.account, GoalPeriod::Monthly).unwrap().is_none());
        assert_eq!(get_all_goals(&conn).unwrap().len(), 1);

        delete_account_by_id(&mut conn, "acc-1").unwrap();
        assert!(get_all_goals(&conn).unwrap().is_empty());
        assert!(matches!(
            delete_account_by_id(&mut conn, "acc-1"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_deleted_account_detached_from_trades() {
        let mut conn = memory_db();
        for id in ["acc-1", "acc-2"] {
            let account = Account {
                id: id.into(),
                name: id.into(),
                broker: None,
                initial_balance: 10_000.0,
                currency: "USD".into(),
                created_at: "2024-01-01 00:00:00".into(),
            };
            insert_account(&conn, &account).unwrap();
        }
        insert_trade(&conn, &sample_trade()).unwrap();
        let other = trade_at("t-2", None, at(2024, 3, 12, 9), None, &["acc-2"]);
        insert_trade(&conn, &other).unwrap();

        delete_account_by_id(&mut conn, "acc-1").unwrap();
        assert_eq!(get_trade_by_id(&conn, "t-1").unwrap().accounts, vec!["acc-2"]);
        assert_eq!(get_trade_by_id(&conn, "t-2").unwrap(), other);
        assert!(get_account_by_id(&conn, "acc-2").is_ok());
    }

    #[test]
    fn test_rules() {
        let conn = memory_db();
        let rule = TradingRule {
            id: "no-fomo".into(),
            name: "No FOMO".into(),
            description: None,
            created_at: "2024-01-01 00:00:00".into(),
        };
        insert_rule(&conn, &rule).unwrap();
        assert_eq!(get_all_rules(&conn).unwrap(), vec![rule]);
        delete_rule_by_id(&conn, "no-fomo").unwrap();
        assert!(get_all_rules(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_bad_timestamp() {
        assert!(matches!(
            parse_timestamp("11/03/2024"),
            Err(AppError::InvalidTimestamp { .. })
        ));
        let ts = at(2024, 3, 11, 9);
        assert_eq!(format_timestamp(&ts), "2024-03-11 09:00:00");
        assert_eq!(parse_timestamp("2024-03-11 09:00:00").unwrap(), ts);
    }
}

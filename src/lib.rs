pub mod data;
pub mod engine;
pub mod errors;
pub mod models;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::data::storage;
use crate::engine::{goals, metrics, rules};
use crate::errors::AppError;
use crate::models::account::{Account, RuleBreakCount, TradingRule};
use crate::models::config::{GoalPeriod, JournalConfig};
use crate::models::goal::{AccountFilter, Goal, GoalProgressReport, GoalTargets};
use crate::models::stats::PortfolioStats;
use crate::models::trade::{planned_risk_reward, NewTrade, Trade, TradeStatus};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TRADE_JOURNAL_DATA_DIR";

const DB_FILE_NAME: &str = "journal.db";

/// Install the global tracing subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Resolve the journal data directory and ensure it exists.
pub fn get_data_dir() -> PathBuf {
    let dir = std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .or_else(resolve_data_path)
        .unwrap_or_else(|| PathBuf::from("./data"));
    if let Err(e) = fs::create_dir_all(&dir) {
        warn!("Cannot create data directory {}: {}", dir.display(), e);
    }
    dir
}

/// Platform-aware data directory next to the executable.
fn resolve_data_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let base = exe.parent()?;

    if cfg!(debug_assertions) {
        // In dev: walk up from target/debug to the project root
        let mut dir = base.to_path_buf();
        for _ in 0..2 {
            dir = dir.parent()?.to_path_buf();
        }
        Some(dir.join("data"))
    } else {
        Some(base.join("data"))
    }
}

fn now_string() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The trading journal: persisted trades, accounts, rules and goals, plus the
/// statistics computed over them.
pub struct Journal {
    pub db: Connection,
    pub data_dir: Option<PathBuf>,
    pub config: JournalConfig,
}

impl Journal {
    /// Open the journal stored in `data_dir`, creating it if needed.
    pub fn open(data_dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(data_dir).map_err(|e| AppError::FileWrite(e.to_string()))?;
        let config = JournalConfig::load_or_default(data_dir)?;

        let db_path = data_dir.join(DB_FILE_NAME);
        let db = storage::initialize_database(&db_path.to_string_lossy())?;
        info!("Journal ready at {}", data_dir.display());

        Ok(Journal {
            db,
            data_dir: Some(data_dir.to_path_buf()),
            config,
        })
    }

    /// Open the journal in the resolved default data directory.
    pub fn open_default() -> Result<Self, AppError> {
        Self::open(&get_data_dir())
    }

    /// A throwaway journal with default configuration.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let db = Connection::open_in_memory()?;
        storage::create_schema(&db)?;
        Ok(Journal {
            db,
            data_dir: None,
            config: JournalConfig::default(),
        })
    }

    /// Persist the current configuration to the data directory.
    pub fn save_config(&self) -> Result<(), AppError> {
        match &self.data_dir {
            Some(dir) => self.config.save(dir),
            None => Err(AppError::InvalidConfig(
                "in-memory journal has no data directory".into(),
            )),
        }
    }

    // ── Accounts ──

    pub fn add_account(
        &self,
        name: &str,
        broker: Option<&str>,
        initial_balance: f64,
        currency: &str,
    ) -> Result<Account, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidAccount("name is required".into()));
        }
        if !initial_balance.is_finite() || initial_balance < 0.0 {
            return Err(AppError::InvalidAccount(format!(
                "initial balance {} must be a non-negative amount",
                initial_balance
            )));
        }
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            broker: broker.map(str::to_string),
            initial_balance,
            currency: currency.to_uppercase(),
            created_at: now_string(),
        };
        storage::insert_account(&self.db, &account)?;
        info!("Account added: {} ({})", account.name, account.id);
        Ok(account)
    }

    pub fn accounts(&self) -> Result<Vec<Account>, AppError> {
        storage::get_all_accounts(&self.db)
    }

    /// Delete an account, its goals and its id from every trade.
    pub fn delete_account(&mut self, id: &str) -> Result<(), AppError> {
        storage::delete_account_by_id(&mut self.db, id)
    }

    // ── Rules ──

    pub fn add_rule(&self, name: &str, description: Option<&str>) -> Result<TradingRule, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRule("rule name is required".into()));
        }
        let rule = TradingRule {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now_string(),
        };
        storage::insert_rule(&self.db, &rule)?;
        Ok(rule)
    }

    pub fn rules(&self) -> Result<Vec<TradingRule>, AppError> {
        storage::get_all_rules(&self.db)
    }

    pub fn delete_rule(&self, id: &str) -> Result<(), AppError> {
        storage::delete_rule_by_id(&self.db, id)
    }

    // ── Trades ──

    /// Validate and store a new trade. A trade with an exit price or a pnl is stored closed.
    pub fn log_trade(&self, input: NewTrade) -> Result<Trade, AppError> {
        let risk_reward_ratio = input.risk_reward_ratio.or_else(|| {
            planned_risk_reward(input.entry_price, input.stop_loss, input.take_profit)
        });

        let mut trade = Trade {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: input.symbol.trim().to_uppercase(),
            direction: input.direction,
            entry_price: input.entry_price,
            exit_price: input.exit_price,
            stop_loss: input.stop_loss,
            take_profit: input.take_profit,
            position_size: input.position_size,
            entry_date: input.entry_date,
            exit_date: input.exit_date,
            status: TradeStatus::Open,
            pnl: input.pnl,
            risk_reward_ratio,
            notes: input.notes,
            tags: input.tags,
            mistakes: input.mistakes,
            accounts: input.accounts,
            broken_rules: input.broken_rules,
        };

        if let Some(exit_price) = trade.exit_price {
            trade.pnl = trade.pnl.or(Some(trade.realized_pnl(exit_price)));
            trade.exit_date = trade.exit_date.or(Some(trade.entry_date));
        }
        if trade.pnl.is_some() {
            trade.status = TradeStatus::Closed;
        }

        self.validate_trade(&trade)?;
        storage::insert_trade(&self.db, &trade)?;
        info!(
            "Trade logged: {} {} {} ({:?})",
            trade.id,
            trade.symbol,
            trade.direction.as_str(),
            trade.status
        );
        Ok(trade)
    }

    /// Checks every stored trade must pass. SQLite reads NaN back as NULL, so
    /// non-finite numbers are rejected before they reach storage.
    fn validate_trade(&self, trade: &Trade) -> Result<(), AppError> {
        if trade.symbol.trim().is_empty() {
            return Err(AppError::InvalidTrade("symbol is required".into()));
        }
        if !trade.position_size.is_finite() || trade.position_size <= 0.0 {
            return Err(AppError::InvalidTrade(format!(
                "position size {} must be positive",
                trade.position_size
            )));
        }
        let prices = [trade.entry_price, trade.stop_loss, trade.take_profit];
        if prices.iter().any(|p| !p.is_finite())
            || trade.exit_price.is_some_and(|p| !p.is_finite())
        {
            return Err(AppError::InvalidTrade("prices must be finite numbers".into()));
        }
        if trade.pnl.is_some_and(|p| !p.is_finite()) {
            return Err(AppError::InvalidTrade("pnl must be a finite number".into()));
        }
        if trade.risk_reward_ratio.is_some_and(|r| !r.is_finite() || r < 0.0) {
            return Err(AppError::InvalidTrade(
                "risk-reward ratio must be a non-negative number".into(),
            ));
        }
        match (trade.status, trade.pnl) {
            (TradeStatus::Closed, None) => {
                return Err(AppError::InvalidTrade("closed trade needs a pnl".into()));
            }
            (TradeStatus::Open, Some(_)) => {
                return Err(AppError::InvalidTrade("open trade cannot carry a pnl".into()));
            }
            _ => {}
        }
        if let Some(exit_date) = trade.exit_date {
            if exit_date < trade.entry_date {
                return Err(AppError::InvalidTrade("exit date is before entry date".into()));
            }
        }
        for account_id in &trade.accounts {
            match storage::get_account_by_id(&self.db, account_id) {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::InvalidTrade(format!(
                        "unknown account {}",
                        account_id
                    )));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Close an open trade at `exit_price`, realizing its pnl.
    pub fn close_trade(
        &self,
        id: &str,
        exit_price: f64,
        exit_date: NaiveDateTime,
    ) -> Result<Trade, AppError> {
        let mut trade = storage::get_trade_by_id(&self.db, id)?;
        if trade.is_closed() {
            return Err(AppError::TradeAlreadyClosed(id.to_string()));
        }

        trade.exit_price = Some(exit_price);
        trade.exit_date = Some(exit_date);
        trade.pnl = Some(trade.realized_pnl(exit_price));
        trade.status = TradeStatus::Closed;
        self.validate_trade(&trade)?;
        storage::update_trade(&self.db, &trade)?;

        info!("Trade closed: {} pnl={:.2}", trade.id, trade.pnl.unwrap_or_default());
        Ok(trade)
    }

    /// Replace a stored trade after the same checks `log_trade` applies.
    pub fn update_trade(&self, trade: &Trade) -> Result<(), AppError> {
        self.validate_trade(trade)?;
        storage::update_trade(&self.db, trade)
    }

    pub fn delete_trade(&self, id: &str) -> Result<(), AppError> {
        storage::delete_trade_by_id(&self.db, id)
    }

    pub fn trade(&self, id: &str) -> Result<Trade, AppError> {
        storage::get_trade_by_id(&self.db, id)
    }

    /// Trades on `account`, ordered by entry date.
    pub fn trades(&self, account: &AccountFilter) -> Result<Vec<Trade>, AppError> {
        let mut trades = storage::get_all_trades(&self.db)?;
        trades.retain(|t| account.matches(&t.accounts));
        Ok(trades)
    }

    // ── Goals ──

    pub fn set_goal(
        &self,
        account: AccountFilter,
        period: GoalPeriod,
        targets: GoalTargets,
    ) -> Result<Goal, AppError> {
        targets.validate()?;
        let goal = Goal {
            account,
            period,
            targets,
            updated_at: now_string(),
        };
        storage::upsert_goal(&self.db, &goal)?;
        info!("Goal set for {} ({})", goal.account, goal.period);
        Ok(goal)
    }

    /// Stored targets for the account and period, else the configured defaults.
    pub fn goal_targets(
        &self,
        account: &AccountFilter,
        period: GoalPeriod,
    ) -> Result<GoalTargets, AppError> {
        Ok(storage::get_goal(&self.db, account, period)?
            .map(|g| g.targets)
            .unwrap_or_else(|| self.config.default_goal_targets.clone()))
    }

    pub fn goals(&self) -> Result<Vec<Goal>, AppError> {
        storage::get_all_goals(&self.db)
    }

    // ── Analytics ──

    pub fn portfolio_stats(&self, account: &AccountFilter) -> Result<PortfolioStats, AppError> {
        let trades = self.trades(account)?;
        Ok(metrics::calculate_portfolio_stats(&trades))
    }

    pub fn goal_progress(
        &self,
        account: &AccountFilter,
        period: GoalPeriod,
    ) -> Result<GoalProgressReport, AppError> {
        self.goal_progress_at(account, period, Local::now().naive_local())
    }

    pub fn goal_progress_at(
        &self,
        account: &AccountFilter,
        period: GoalPeriod,
        now: NaiveDateTime,
    ) -> Result<GoalProgressReport, AppError> {
        let targets = self.goal_targets(account, period)?;
        let trades = storage::get_all_trades(&self.db)?;
        Ok(goals::calculate_goal_progress_at(
            &trades, account, period, &targets, now,
        ))
    }

    /// Goal progress for the configured default account and period.
    pub fn default_goal_progress(&self) -> Result<GoalProgressReport, AppError> {
        self.default_goal_progress_at(Local::now().naive_local())
    }

    /// Progress for the configured default account (all accounts when unset) and period.
    pub fn default_goal_progress_at(
        &self,
        now: NaiveDateTime,
    ) -> Result<GoalProgressReport, AppError> {
        let account = self
            .config
            .default_account
            .clone()
            .map(AccountFilter::from)
            .unwrap_or(AccountFilter::All);
        self.goal_progress_at(&account, self.config.default_period, now)
    }

    pub fn broken_rule_report(&self, period: GoalPeriod) -> Result<Vec<RuleBreakCount>, AppError> {
        self.broken_rule_report_at(period, Local::now().naive_local())
    }

    pub fn broken_rule_report_at(
        &self,
        period: GoalPeriod,
        now: NaiveDateTime,
    ) -> Result<Vec<RuleBreakCount>, AppError> {
        let trades = storage::get_all_trades(&self.db)?;
        let tally = rules::tally_broken_rules_at(&trades, period, now);
        Ok(rules::rank_broken_rules(&tally, &self.rules()?))
    }
}

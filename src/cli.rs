//! CLI definition and dispatch.

use chrono::{NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::aggregate::MetricKind;
use crate::domain::error::TradelogError;
use crate::domain::event::TradeRecord;
use crate::domain::goal::{Goal, GoalPeriod};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "tradelog", about = "Trade journal and analytics engine")]
pub struct Cli {
    /// INI config file ([sqlite] path, [cache] capacity, [position] dust_threshold)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Reference time override (YYYY-MM-DDTHH:MM:SS), defaults to now
    #[arg(long)]
    pub at: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init,
    /// Append a trade from a JSON file (or stdin)
    Append {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List events in a period
    Query {
        #[arg(long)]
        account: String,
        #[arg(long, default_value = "today")]
        period: String,
        #[arg(long)]
        event_type: Option<String>,
    },
    /// Compute a metric over a period
    Metric {
        #[arg(long)]
        account: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        field: String,
        #[arg(long, default_value = "today")]
        period: String,
        #[arg(long)]
        group_by: Option<String>,
    },
    /// Compare a metric across two periods
    Compare {
        #[arg(long)]
        account: String,
        #[arg(long)]
        period1: String,
        #[arg(long)]
        period2: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        field: String,
    },
    /// Manage the per-account profit goal
    Goal {
        #[command(subcommand)]
        command: GoalCommand,
    },
    /// Win/loss streaks over trade outcomes
    Streaks {
        #[arg(long)]
        account: String,
        #[arg(long, default_value = "is_win")]
        field: String,
    },
    /// Net position for one instrument
    Position {
        #[arg(long)]
        account: String,
        #[arg(long)]
        symbol: String,
    },
    /// Last N trades, newest first
    Recent {
        #[arg(long)]
        account: String,
        #[arg(short, long, default_value_t = 5)]
        n: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    /// Set or replace the account's goal
    Set {
        #[arg(long)]
        account: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "daily")]
        period: String,
        #[arg(long, default_value = "")]
        statement: String,
        #[arg(long)]
        confirmed: bool,
    },
    /// Progress against the stored goal
    Progress {
        #[arg(long)]
        account: String,
    },
}

/// Trade submission shape accepted by `append`.
#[derive(Debug, Deserialize)]
struct TradeSubmission {
    account_id: String,
    occurred_at: Option<NaiveDateTime>,
    #[serde(flatten)]
    trade: TradeRecord,
}

pub fn run(cli: Cli) -> ExitCode {
    let reference = match resolve_reference(cli.at.as_deref()) {
        Ok(t) => t,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::from(1);
        }
    };

    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };

    dispatch(cli.command, &config, reference)
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TradelogError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn resolve_reference(at: Option<&str>) -> Result<NaiveDateTime, String> {
    match at {
        None => Ok(Utc::now().naive_utc()),
        Some(raw) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
            .map_err(|_| format!("invalid reference time (expected YYYY-MM-DDTHH:MM:SS): {raw}")),
    }
}

#[cfg(feature = "sqlite")]
fn dispatch(command: Command, config: &FileConfigAdapter, reference: NaiveDateTime) -> ExitCode {
    use crate::adapters::sqlite_store::SqliteStore;
    use crate::domain::position::DEFAULT_DUST_THRESHOLD;
    use crate::service::analytics::Analytics;
    use crate::service::cache::RECENT_CACHE_CAPACITY;

    let store = match SqliteStore::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if let Command::Init = command {
        return match store.initialize_schema() {
            Ok(()) => {
                eprintln!("Schema initialized");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                (&e).into()
            }
        };
    }

    let capacity = config.get_int("cache", "capacity", RECENT_CACHE_CAPACITY as i64) as usize;
    let dust = config.get_double("position", "dust_threshold", DEFAULT_DUST_THRESHOLD);
    let analytics = Analytics::new(store)
        .with_cache_capacity(capacity)
        .with_dust_threshold(dust);

    let result = match command {
        Command::Init => unreachable!(),
        Command::Append { file } => run_append(&analytics, file.as_ref(), reference),
        Command::Query {
            account,
            period,
            event_type,
        } => analytics
            .query_period(&account, &period, reference, event_type.as_deref())
            .and_then(print_json),
        Command::Metric {
            account,
            kind,
            field,
            period,
            group_by,
        } => parse_kind(&kind).and_then(|kind| {
            analytics
                .compute_metric(&account, kind, &field, &period, reference, group_by.as_deref())
                .and_then(print_json)
        }),
        Command::Compare {
            account,
            period1,
            period2,
            kind,
            field,
        } => parse_kind(&kind).and_then(|kind| {
            analytics
                .compare_periods(&account, &period1, &period2, kind, &field, reference)
                .and_then(print_json)
        }),
        Command::Goal { command } => match command {
            GoalCommand::Set {
                account,
                amount,
                period,
                statement,
                confirmed,
            } => run_goal_set(&analytics, &account, amount, &period, &statement, confirmed),
            GoalCommand::Progress { account } => analytics
                .goal_progress(&account, reference)
                .and_then(print_json),
        },
        Command::Streaks { account, field } => analytics
            .win_streaks(&account, &field)
            .and_then(print_json),
        Command::Position { account, symbol } => analytics
            .token_position(&account, &symbol)
            .and_then(print_json),
        Command::Recent { account, n } => analytics
            .recent_trades(&account, n)
            .and_then(print_json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn dispatch(_command: Command, _config: &FileConfigAdapter, _reference: NaiveDateTime) -> ExitCode {
    eprintln!("error: sqlite feature is required");
    ExitCode::from(1)
}

#[cfg(feature = "sqlite")]
fn run_append(
    analytics: &crate::service::analytics::Analytics<crate::adapters::sqlite_store::SqliteStore>,
    file: Option<&PathBuf>,
    reference: NaiveDateTime,
) -> Result<(), TradelogError> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let submission: TradeSubmission =
        serde_json::from_str(&raw).map_err(|e| TradelogError::InvalidTrade {
            reason: format!("malformed trade JSON: {e}"),
        })?;

    let occurred_at = submission.occurred_at.unwrap_or(reference);
    let event = analytics.record_trade(&submission.account_id, submission.trade, occurred_at)?;
    print_json(event)
}

#[cfg(feature = "sqlite")]
fn run_goal_set(
    analytics: &crate::service::analytics::Analytics<crate::adapters::sqlite_store::SqliteStore>,
    account: &str,
    amount: f64,
    period: &str,
    statement: &str,
    confirmed: bool,
) -> Result<(), TradelogError> {
    let period: GoalPeriod = period.parse().map_err(|reason| TradelogError::ConfigInvalid {
        section: "goal".into(),
        key: "period".into(),
        reason,
    })?;

    let goal = Goal {
        account_id: account.to_string(),
        amount,
        period,
        raw_statement: statement.to_string(),
        confirmed,
    };
    analytics.set_goal(&goal)?;
    print_json(goal)
}

fn parse_kind(raw: &str) -> Result<MetricKind, TradelogError> {
    raw.parse().map_err(|reason| TradelogError::ConfigInvalid {
        section: "metric".into(),
        key: "kind".into(),
        reason,
    })
}

fn print_json<T: Serialize>(value: T) -> Result<(), TradelogError> {
    let rendered =
        serde_json::to_string_pretty(&value).map_err(|e| TradelogError::Database {
            reason: format!("result encode: {e}"),
        })?;
    println!("{rendered}");
    Ok(())
}

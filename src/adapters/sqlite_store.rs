//! SQLite event and goal store.
//!
//! One append-only `events` table keyed for (account, time) and
//! (type, time) range scans, plus a one-row-per-account `goals` table.
//! Timestamps are stored as fixed-width text so lexicographic order is
//! chronological order.

use crate::domain::error::TradelogError;
use crate::domain::event::{Event, EventPayload};
use crate::domain::goal::{Goal, GoalPeriod};
use crate::ports::config_port::ConfigPort;
use crate::ports::event_store_port::{EventFilter, EventStorePort};
use crate::ports::goal_store_port::GoalStorePort;
use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ToSql;
use rusqlite::params;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TradelogError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TradelogError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| TradelogError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TradelogError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TradelogError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), TradelogError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                event_id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_account_time
                ON events(account_id, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_events_type_time
                ON events(event_type, occurred_at);
            CREATE TABLE IF NOT EXISTS goals (
                account_id TEXT PRIMARY KEY,
                amount REAL NOT NULL,
                period TEXT NOT NULL,
                raw_statement TEXT NOT NULL,
                confirmed INTEGER NOT NULL
            );",
        )
        .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, TradelogError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| TradelogError::Database {
                reason: e.to_string(),
            })
    }

    fn encode_timestamp(t: NaiveDateTime) -> String {
        t.format(TIMESTAMP_FORMAT).to_string()
    }

    fn decode_timestamp(raw: &str) -> Result<NaiveDateTime, rusqlite::Error> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                raw.len(),
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }

    fn decode_payload(raw: &str) -> Result<EventPayload, rusqlite::Error> {
        serde_json::from_str(raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                raw.len(),
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }
}

impl EventStorePort for SqliteStore {
    fn append(&self, event: &Event) -> Result<(), TradelogError> {
        let payload =
            serde_json::to_string(&event.payload).map_err(|e| TradelogError::Database {
                reason: format!("payload encode: {e}"),
            })?;

        let conn = self.conn()?;

        // A single INSERT is atomic under sqlite: a concurrent reader sees
        // the whole event or none of it.
        conn.execute(
            "INSERT INTO events (event_id, account_id, event_type, occurred_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.event_id,
                event.account_id,
                event.event_type,
                Self::encode_timestamp(event.occurred_at),
                payload
            ],
        )
        .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        log::debug!(
            "appended event {} type={} account={}",
            event.event_id,
            event.event_type,
            event.account_id
        );

        Ok(())
    }

    fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, TradelogError> {
        let mut sql = String::from(
            "SELECT event_id, account_id, event_type, occurred_at, payload FROM events",
        );
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(account_id) = &filter.account_id {
            clauses.push("account_id = ?".into());
            args.push(Box::new(account_id.clone()));
        }
        if let Some(event_types) = &filter.event_types {
            if !event_types.is_empty() {
                let placeholders = vec!["?"; event_types.len()].join(", ");
                clauses.push(format!("event_type IN ({placeholders})"));
                for event_type in event_types {
                    args.push(Box::new(event_type.clone()));
                }
            }
        }
        if let Some(start) = filter.start {
            clauses.push("occurred_at >= ?".into());
            args.push(Box::new(Self::encode_timestamp(start)));
        }
        if let Some(end) = filter.end {
            clauses.push("occurred_at <= ?".into());
            args.push(Box::new(Self::encode_timestamp(end)));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY occurred_at DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;

        let mut stmt =
            conn.prepare(&sql)
                .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
                |row| {
                    let occurred_raw: String = row.get(3)?;
                    let payload_raw: String = row.get(4)?;
                    Ok(Event {
                        event_id: row.get(0)?,
                        account_id: row.get(1)?,
                        event_type: row.get(2)?,
                        occurred_at: Self::decode_timestamp(&occurred_raw)?,
                        payload: Self::decode_payload(&payload_raw)?,
                    })
                },
            )
            .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(
                row.map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(events)
    }

    fn count(
        &self,
        account_id: Option<&str>,
        event_type: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<i64, TradelogError> {
        let mut sql = String::from("SELECT COUNT(*) FROM events");
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(account_id) = account_id {
            clauses.push("account_id = ?".into());
            args.push(Box::new(account_id.to_string()));
        }
        if let Some(event_type) = event_type {
            clauses.push("event_type = ?".into());
            args.push(Box::new(event_type.to_string()));
        }
        if let Some(start) = start {
            clauses.push("occurred_at >= ?".into());
            args.push(Box::new(Self::encode_timestamp(start)));
        }
        if let Some(end) = end {
            clauses.push("occurred_at <= ?".into());
            args.push(Box::new(Self::encode_timestamp(end)));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let conn = self.conn()?;

        conn.query_row(
            &sql,
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row.get(0),
        )
        .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
            reason: e.to_string(),
        })
    }
}

impl GoalStorePort for SqliteStore {
    fn upsert_goal(&self, goal: &Goal) -> Result<(), TradelogError> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR REPLACE INTO goals (account_id, amount, period, raw_statement, confirmed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                goal.account_id,
                goal.amount,
                goal.period.as_str(),
                goal.raw_statement,
                goal.confirmed as i64
            ],
        )
        .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn get_goal(&self, account_id: &str) -> Result<Option<Goal>, TradelogError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT account_id, amount, period, raw_statement, confirmed
                 FROM goals WHERE account_id = ?1",
            )
            .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut rows = stmt
            .query_map(params![account_id], |row| {
                let period_raw: String = row.get(2)?;
                let period = period_raw.parse::<GoalPeriod>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        period_raw.len(),
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?;
                let confirmed: i64 = row.get(4)?;
                Ok(Goal {
                    account_id: row.get(0)?,
                    amount: row.get(1)?,
                    period,
                    raw_statement: row.get(3)?,
                    confirmed: confirmed != 0,
                })
            })
            .map_err(|e: rusqlite::Error| TradelogError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e: rusqlite::Error| {
                TradelogError::DatabaseQuery {
                    reason: e.to_string(),
                }
            })?)),
            None => Ok(None),
        }
    }
}

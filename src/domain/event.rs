//! Immutable event records and the trade payload convention.
//!
//! The log stores an open envelope: a typed payload variant per known event
//! kind, with a fallback bag of loose fields for anything else. The store
//! never interprets payload semantics; only the aggregation layer does,
//! through [`EventPayload::scalar`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Event type tag for trade events.
pub const EVENT_TYPE_TRADE: &str = "trade";
/// Event type tag for goal statements.
pub const EVENT_TYPE_GOAL: &str = "goal";
/// Event type tag for free-form remembered facts.
pub const EVENT_TYPE_FACT: &str = "fact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            other => Err(format!("unknown trade action: {other}")),
        }
    }
}

/// One executed trade as delivered by the upstream ledger.
///
/// `signature` is the upstream dedup key: identical signature means identical
/// real-world trade, and replayed deliveries must collapse to one logical
/// trade. `extra` carries per-trade analytics fields (`profit_sol`,
/// `is_win`, ...) that the journal does not enumerate up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub action: TradeAction,
    pub symbol: String,
    pub address: String,
    pub quote_amount: f64,
    pub base_amount: f64,
    pub signature: String,
    pub bankroll_before: f64,
    pub bankroll_after: f64,
    pub pct_of_bankroll: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// A goal statement captured from conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalNote {
    pub statement: String,
}

/// A free-form fact the user asked to remember.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactNote {
    pub label: String,
    pub detail: String,
}

/// Typed payload behind the common event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Trade(TradeRecord),
    Goal(GoalNote),
    Fact(FactNote),
    Other {
        #[serde(default)]
        fields: BTreeMap<String, Value>,
    },
}

impl EventPayload {
    /// Look up a named scalar field.
    ///
    /// Known payload kinds expose their struct fields by name; the `extra`
    /// map (trades) and the `Other` bag cover everything else. Returns `None`
    /// for unknown names, which aggregation treats as a skip, not an error.
    pub fn scalar(&self, field: &str) -> Option<Value> {
        match self {
            EventPayload::Trade(t) => match field {
                "action" => Some(Value::from(t.action.as_str())),
                "symbol" => Some(Value::from(t.symbol.as_str())),
                "address" => Some(Value::from(t.address.as_str())),
                "quote_amount" => Some(Value::from(t.quote_amount)),
                "base_amount" => Some(Value::from(t.base_amount)),
                "signature" => Some(Value::from(t.signature.as_str())),
                "bankroll_before" => Some(Value::from(t.bankroll_before)),
                "bankroll_after" => Some(Value::from(t.bankroll_after)),
                "pct_of_bankroll" => Some(Value::from(t.pct_of_bankroll)),
                other => t.extra.get(other).cloned(),
            },
            EventPayload::Goal(g) => match field {
                "statement" => Some(Value::from(g.statement.as_str())),
                _ => None,
            },
            EventPayload::Fact(f) => match field {
                "label" => Some(Value::from(f.label.as_str())),
                "detail" => Some(Value::from(f.detail.as_str())),
                _ => None,
            },
            EventPayload::Other { fields } => fields.get(field).cloned(),
        }
    }
}

/// Immutable append-only record of a user action.
///
/// Created once via append; never mutated or deleted. Corrections are new
/// events. `occurred_at` is caller-supplied wall-clock time so backfill of
/// historical trades is possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub account_id: String,
    pub event_type: String,
    pub occurred_at: NaiveDateTime,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(
        account_id: impl Into<String>,
        event_type: impl Into<String>,
        occurred_at: NaiveDateTime,
        payload: EventPayload,
    ) -> Self {
        Event {
            event_id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    pub fn trade(
        account_id: impl Into<String>,
        occurred_at: NaiveDateTime,
        record: TradeRecord,
    ) -> Self {
        Event::new(
            account_id,
            EVENT_TYPE_TRADE,
            occurred_at,
            EventPayload::Trade(record),
        )
    }

    pub fn trade_record(&self) -> Option<&TradeRecord> {
        match &self.payload {
            EventPayload::Trade(t) => Some(t),
            _ => None,
        }
    }

    pub fn scalar(&self, field: &str) -> Option<Value> {
        self.payload.scalar(field)
    }
}

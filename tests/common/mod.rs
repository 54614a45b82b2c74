#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use tradelog::domain::error::TradelogError;
use tradelog::domain::event::{Event, TradeAction, TradeRecord};
use tradelog::domain::goal::Goal;
use tradelog::ports::event_store_port::{EventFilter, EventStorePort};
use tradelog::ports::goal_store_port::GoalStorePort;

/// In-memory store double with failure injection and a query counter for
/// asserting cache behavior.
pub struct MockStore {
    pub events: RefCell<Vec<Event>>,
    pub goal: RefCell<Option<Goal>>,
    pub fail: Cell<bool>,
    pub queries_served: Cell<usize>,
}

impl MockStore {
    pub fn new() -> Self {
        MockStore {
            events: RefCell::new(Vec::new()),
            goal: RefCell::new(None),
            fail: Cell::new(false),
            queries_served: Cell::new(0),
        }
    }

    pub fn with_goal(self, goal: Goal) -> Self {
        *self.goal.borrow_mut() = Some(goal);
        self
    }

    fn check(&self) -> Result<(), TradelogError> {
        if self.fail.get() {
            Err(TradelogError::Database {
                reason: "injected failure".into(),
            })
        } else {
            Ok(())
        }
    }
}

impl EventStorePort for MockStore {
    fn append(&self, event: &Event) -> Result<(), TradelogError> {
        self.check()?;
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }

    fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, TradelogError> {
        self.check()?;
        self.queries_served.set(self.queries_served.get() + 1);

        let mut matched: Vec<Event> = self
            .events
            .borrow()
            .iter()
            .filter(|e| {
                filter
                    .account_id
                    .as_ref()
                    .is_none_or(|a| &e.account_id == a)
                    && filter
                        .event_types
                        .as_ref()
                        .is_none_or(|ts| ts.contains(&e.event_type))
                    && filter.start.is_none_or(|s| e.occurred_at >= s)
                    && filter.end.is_none_or(|s| e.occurred_at <= s)
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn count(
        &self,
        account_id: Option<&str>,
        event_type: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<i64, TradelogError> {
        let filter = EventFilter {
            account_id: account_id.map(str::to_string),
            event_types: event_type.map(|t| vec![t.to_string()]),
            start,
            end,
            limit: None,
        };
        Ok(self.query(&filter)?.len() as i64)
    }
}

impl GoalStorePort for MockStore {
    fn upsert_goal(&self, goal: &Goal) -> Result<(), TradelogError> {
        self.check()?;
        *self.goal.borrow_mut() = Some(goal.clone());
        Ok(())
    }

    fn get_goal(&self, account_id: &str) -> Result<Option<Goal>, TradelogError> {
        self.check()?;
        Ok(self
            .goal
            .borrow()
            .clone()
            .filter(|g| g.account_id == account_id))
    }
}

pub fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Monday 2024-01-15 14:00, the reference instant used across tests.
pub fn monday_reference() -> NaiveDateTime {
    dt(2024, 1, 15, 14, 0)
}

pub fn make_trade(
    action: TradeAction,
    symbol: &str,
    signature: &str,
    quote_amount: f64,
    base_amount: f64,
) -> TradeRecord {
    TradeRecord {
        action,
        symbol: symbol.into(),
        address: format!("{symbol}-mint"),
        quote_amount,
        base_amount,
        signature: signature.into(),
        bankroll_before: 10.0,
        bankroll_after: 10.0,
        pct_of_bankroll: 10.0,
        extra: BTreeMap::new(),
    }
}

pub fn make_sell_with_profit(signature: &str, profit_sol: f64) -> TradeRecord {
    let mut trade = make_trade(TradeAction::Sell, "WIF", signature, 1.0, 100.0);
    trade
        .extra
        .insert("profit_sol".to_string(), Value::from(profit_sol));
    trade
        .extra
        .insert("is_win".to_string(), Value::from(profit_sol > 0.0));
    trade
}

//! Analytics verbs for the conversational tool-calling layer.
//!
//! Every verb returns plain serializable data (numbers, strings, nested
//! maps) because results are surfaced verbatim as tool-call text. Period
//! expressions are resolved leniently here: an unrecognized period reads
//! as "today" rather than failing the whole tool call.

use crate::domain::aggregate::{
    self, MetricKind, PeriodComparison, RateResult, RateUnit, ReduceValue, StreakSummary,
};
use crate::domain::error::TradelogError;
use crate::domain::event::{Event, TradeRecord, EVENT_TYPE_TRADE};
use crate::domain::goal::{self, Goal, GoalProgress};
use crate::domain::period::{self, PeriodBounds};
use crate::domain::position::{self, TokenPosition, DEFAULT_DUST_THRESHOLD};
use crate::ports::event_store_port::{EventFilter, EventStorePort};
use crate::ports::goal_store_port::GoalStorePort;
use crate::service::cache::RecentTradeCache;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// The payload field a goal's `current` is summed over.
pub const GOAL_METRIC_FIELD: &str = "profit_sol";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodQuery {
    pub resolved_bounds: PeriodBounds,
    pub trades: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Single(ReduceValue),
    Grouped(BTreeMap<String, ReduceValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub value: MetricValue,
}

/// The aggregation engine's front door: owns the store handle and the
/// recent-trade cache, fetches snapshot slices, and reduces them with the
/// pure functions in [`crate::domain::aggregate`].
pub struct Analytics<S> {
    store: S,
    cache: RecentTradeCache,
    dust_threshold: f64,
}

impl<S: EventStorePort + GoalStorePort> Analytics<S> {
    pub fn new(store: S) -> Self {
        Analytics {
            store,
            cache: RecentTradeCache::default(),
            dust_threshold: DEFAULT_DUST_THRESHOLD,
        }
    }

    pub fn with_dust_threshold(mut self, dust_threshold: f64) -> Self {
        self.dust_threshold = dust_threshold;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = RecentTradeCache::new(capacity);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append a trade after minimum validation: a known action is enforced
    /// by the type, so what remains is a positive quote amount and a
    /// non-empty dedup signature. The account's cache buffer is evicted
    /// before returning, so a subsequent read repopulates from the store.
    pub fn record_trade(
        &self,
        account_id: &str,
        trade: TradeRecord,
        occurred_at: NaiveDateTime,
    ) -> Result<Event, TradelogError> {
        if !(trade.quote_amount.is_finite() && trade.quote_amount > 0.0) {
            return Err(TradelogError::InvalidTrade {
                reason: format!("quote_amount must be positive, got {}", trade.quote_amount),
            });
        }
        if trade.signature.trim().is_empty() {
            return Err(TradelogError::InvalidTrade {
                reason: "missing dedup signature".into(),
            });
        }

        let event = Event::trade(account_id, occurred_at, trade);
        self.store.append(&event)?;
        self.cache.invalidate(account_id);
        Ok(event)
    }

    /// Append any event. The cache is evicted for the account regardless of
    /// event type: correctness over cleverness.
    pub fn append_event(&self, event: &Event) -> Result<(), TradelogError> {
        self.store.append(event)?;
        self.cache.invalidate(&event.account_id);
        Ok(())
    }

    pub fn query_period(
        &self,
        account_id: &str,
        period_expr: &str,
        reference: NaiveDateTime,
        event_type_filter: Option<&str>,
    ) -> Result<PeriodQuery, TradelogError> {
        let bounds = period::resolve_or_today(period_expr, reference);
        let mut filter = EventFilter::for_account(account_id).between(bounds.start, bounds.end);
        if let Some(event_type) = event_type_filter {
            filter = filter.with_types(vec![event_type.to_string()]);
        }
        let trades = self.store.query(&filter)?;
        Ok(PeriodQuery {
            resolved_bounds: bounds,
            trades,
        })
    }

    pub fn compute_metric(
        &self,
        account_id: &str,
        kind: MetricKind,
        field: &str,
        period_expr: &str,
        reference: NaiveDateTime,
        group_by: Option<&str>,
    ) -> Result<MetricResult, TradelogError> {
        let bounds = period::resolve_or_today(period_expr, reference);
        let events = self.trades_in(account_id, bounds)?;

        let value = match group_by {
            Some(group_field) => {
                MetricValue::Grouped(aggregate::grouped_reduce(&events, kind, field, group_field))
            }
            None => MetricValue::Single(aggregate::reduce(&events, kind, field)),
        };

        Ok(MetricResult { value })
    }

    pub fn compare_periods(
        &self,
        account_id: &str,
        period_expr1: &str,
        period_expr2: &str,
        kind: MetricKind,
        field: &str,
        reference: NaiveDateTime,
    ) -> Result<PeriodComparison, TradelogError> {
        let bounds1 = period::resolve_or_today(period_expr1, reference);
        let bounds2 = period::resolve_or_today(period_expr2, reference);

        let value1 = aggregate::reduce(&self.trades_in(account_id, bounds1)?, kind, field);
        let value2 = aggregate::reduce(&self.trades_in(account_id, bounds2)?, kind, field);

        Ok(aggregate::compare_values(
            bounds1,
            value1.as_number(),
            bounds2,
            value2.as_number(),
        ))
    }

    pub fn rate_of_change(
        &self,
        account_id: &str,
        field: &str,
        unit: RateUnit,
        period_expr: &str,
        reference: NaiveDateTime,
    ) -> Result<RateResult, TradelogError> {
        let bounds = period::resolve_or_today(period_expr, reference);
        let events = self.trades_in(account_id, bounds)?;
        Ok(aggregate::rate(&events, field, unit))
    }

    pub fn win_streaks(
        &self,
        account_id: &str,
        bool_field: &str,
    ) -> Result<StreakSummary, TradelogError> {
        let events = self
            .store
            .query(&EventFilter::for_account(account_id).with_types(vec![EVENT_TYPE_TRADE.into()]))?;
        Ok(aggregate::streaks(&events, bool_field))
    }

    pub fn set_goal(&self, goal: &Goal) -> Result<(), TradelogError> {
        self.store.upsert_goal(goal)
    }

    pub fn goal_progress(
        &self,
        account_id: &str,
        reference: NaiveDateTime,
    ) -> Result<GoalProgress, TradelogError> {
        let goal = self
            .store
            .get_goal(account_id)?
            .ok_or_else(|| TradelogError::NoGoal {
                account_id: account_id.to_string(),
            })?;

        let bounds = goal::measurement_bounds(goal.period, reference);
        let events = self.trades_in(account_id, bounds)?;
        let current =
            aggregate::reduce(&events, MetricKind::Sum, GOAL_METRIC_FIELD).as_number();
        let elapsed = goal::elapsed_days(&bounds, reference);

        Ok(goal::progress(goal.amount, goal.period, current, elapsed))
    }

    pub fn token_position(
        &self,
        account_id: &str,
        symbol: &str,
    ) -> Result<TokenPosition, TradelogError> {
        let events = self
            .store
            .query(&EventFilter::for_account(account_id).with_types(vec![EVENT_TYPE_TRADE.into()]))?;
        Ok(position::compute(&events, symbol, self.dust_threshold))
    }

    /// Last `n` trades, newest first. Reads within the cache capacity are
    /// served from the per-account buffer, lazily filled from the store on
    /// a miss; larger reads bypass the cache entirely.
    pub fn recent_trades(&self, account_id: &str, n: usize) -> Result<Vec<Event>, TradelogError> {
        if n > self.cache.capacity() {
            return self.store.query(
                &EventFilter::for_account(account_id)
                    .with_types(vec![EVENT_TYPE_TRADE.into()])
                    .with_limit(n),
            );
        }

        if let Some(hit) = self.cache.get(account_id, n) {
            return Ok(hit);
        }

        let events = self.store.query(
            &EventFilter::for_account(account_id)
                .with_types(vec![EVENT_TYPE_TRADE.into()])
                .with_limit(self.cache.capacity()),
        )?;
        self.cache.populate(account_id, events.clone());
        Ok(events.into_iter().take(n).collect())
    }

    fn trades_in(
        &self,
        account_id: &str,
        bounds: PeriodBounds,
    ) -> Result<Vec<Event>, TradelogError> {
        self.store.query(
            &EventFilter::for_account(account_id)
                .with_types(vec![EVENT_TYPE_TRADE.into()])
                .between(bounds.start, bounds.end),
        )
    }
}

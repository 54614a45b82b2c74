//! Event store access port.

use crate::domain::error::TradelogError;
use crate::domain::event::Event;
use chrono::NaiveDateTime;

/// Conjunctive filter for range queries; an absent field is unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub account_id: Option<String>,
    pub event_types: Option<Vec<String>>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn for_account(account_id: impl Into<String>) -> Self {
        EventFilter {
            account_id: Some(account_id.into()),
            ..EventFilter::default()
        }
    }

    pub fn with_types(mut self, event_types: Vec<String>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Append-only event log. No update or delete exists; corrections are new
/// events. Implementations must surface storage errors, never swallow them
/// into an empty result.
pub trait EventStorePort {
    /// Append one event. Fails only on storage I/O, never on semantic
    /// grounds. Must be atomic from a concurrent reader's perspective.
    fn append(&self, event: &Event) -> Result<(), TradelogError>;

    /// Filtered range query, newest first. `limit` truncates after ordering.
    fn query(&self, filter: &EventFilter) -> Result<Vec<Event>, TradelogError>;

    /// Count with the same filter semantics as [`EventStorePort::query`].
    fn count(
        &self,
        account_id: Option<&str>,
        event_type: Option<&str>,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<i64, TradelogError>;
}

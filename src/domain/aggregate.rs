//! Pure reductions over event slices.
//!
//! Every function here is a stateless computation over an already-fetched
//! snapshot slice: no storage access, no clock access. Values that cannot
//! be coerced are excluded, never raised, and an empty or fully-excluded
//! input always reduces to a well-typed zero so a "no trades this period"
//! answer never needs a null.

use crate::domain::event::Event;
use crate::domain::numeric::{coerce_bool, coerce_number};
use crate::domain::period::PeriodBounds;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    List,
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(MetricKind::Sum),
            "count" => Ok(MetricKind::Count),
            "avg" | "average" | "mean" => Ok(MetricKind::Avg),
            "min" => Ok(MetricKind::Min),
            "max" => Ok(MetricKind::Max),
            "list" => Ok(MetricKind::List),
            other => Err(format!("unknown metric kind: {other}")),
        }
    }
}

/// Result of a reduction: scalar for sum/count/avg/min/max, list for list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReduceValue {
    Number(f64),
    List(Vec<f64>),
}

impl ReduceValue {
    /// Scalar view; a list collapses to 0 (comparisons over lists are
    /// meaningless and must not produce a fake number).
    pub fn as_number(&self) -> f64 {
        match self {
            ReduceValue::Number(n) => *n,
            ReduceValue::List(_) => 0.0,
        }
    }
}

/// Reduce `field` across the slice. `Count` ignores the field entirely and
/// counts events; the other kinds operate on the coercible values only.
pub fn reduce(events: &[Event], kind: MetricKind, field: &str) -> ReduceValue {
    if kind == MetricKind::Count {
        return ReduceValue::Number(events.len() as f64);
    }

    let values: Vec<f64> = events
        .iter()
        .filter_map(|e| e.scalar(field))
        .filter_map(|v| coerce_number(&v))
        .collect();

    match kind {
        MetricKind::Count => unreachable!(),
        MetricKind::List => ReduceValue::List(values),
        MetricKind::Sum => ReduceValue::Number(values.iter().sum()),
        MetricKind::Avg => {
            if values.is_empty() {
                ReduceValue::Number(0.0)
            } else {
                ReduceValue::Number(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        MetricKind::Min => ReduceValue::Number(values.iter().copied().fold(None, fold_min).unwrap_or(0.0)),
        MetricKind::Max => ReduceValue::Number(values.iter().copied().fold(None, fold_max).unwrap_or(0.0)),
    }
}

fn fold_min(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

fn fold_max(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

/// Bucket label for events missing the group field. Such events are never
/// dropped: the output groups partition the input exactly.
pub const UNKNOWN_GROUP: &str = "unknown";

pub fn grouped_reduce(
    events: &[Event],
    kind: MetricKind,
    field: &str,
    group_by: &str,
) -> BTreeMap<String, ReduceValue> {
    let mut groups: BTreeMap<String, Vec<Event>> = BTreeMap::new();
    for event in events {
        let key = event
            .scalar(group_by)
            .map(group_key)
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        groups.entry(key).or_default().push(event.clone());
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let value = reduce(&members, kind, field);
            (key, value)
        })
        .collect()
}

fn group_key(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => UNKNOWN_GROUP.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateUnit {
    Hour,
    Day,
    Week,
    Other,
}

impl FromStr for RateUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "hour" | "hours" => RateUnit::Hour,
            "day" | "days" => RateUnit::Day,
            "week" | "weeks" => RateUnit::Week,
            _ => RateUnit::Other,
        })
    }
}

impl RateUnit {
    fn seconds(&self) -> f64 {
        match self {
            RateUnit::Hour => 3_600.0,
            RateUnit::Day => 86_400.0,
            RateUnit::Week => 604_800.0,
            // Unrecognized units are measured in days.
            RateUnit::Other => 86_400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateResult {
    pub rate: f64,
    pub total: f64,
    pub duration_in_unit: f64,
    pub bounds: Option<PeriodBounds>,
}

/// Rate of change of `field` per `unit`. The duration derives from the
/// min/max event timestamps in the slice itself, not from any externally
/// supplied bounds, and is floored to one unit so the division is safe.
pub fn rate(events: &[Event], field: &str, unit: RateUnit) -> RateResult {
    let Some(first) = events.iter().map(|e| e.occurred_at).min() else {
        return RateResult {
            rate: 0.0,
            total: 0.0,
            duration_in_unit: 0.0,
            bounds: None,
        };
    };
    let last = events
        .iter()
        .map(|e| e.occurred_at)
        .max()
        .unwrap_or(first);

    let total = reduce(events, MetricKind::Sum, field).as_number();
    let elapsed_secs = (last - first).num_seconds() as f64;
    let duration_in_unit = (elapsed_secs / unit.seconds()).max(1.0);

    RateResult {
        rate: total / duration_in_unit,
        total,
        duration_in_unit,
        bounds: Some(PeriodBounds::new(first, last)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    Win,
    Loss,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakSummary {
    pub current_streak_length: usize,
    pub current_streak_type: StreakType,
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
}

/// Win/loss streaks over `bool_field`, walking events in ascending time
/// order (stable sort keeps equal-timestamp ties deterministic). A streak
/// breaks exactly when the coerced boolean flips between consecutive
/// events; events where the field is absent or uncoercible are skipped.
pub fn streaks(events: &[Event], bool_field: &str) -> StreakSummary {
    let mut outcomes: Vec<(chrono::NaiveDateTime, bool)> = events
        .iter()
        .filter_map(|e| {
            let value = e.scalar(bool_field)?;
            coerce_bool(&value).map(|b| (e.occurred_at, b))
        })
        .collect();
    outcomes.sort_by_key(|(at, _)| *at);

    let mut longest_win = 0usize;
    let mut longest_loss = 0usize;
    let mut run_length = 0usize;
    let mut run_value: Option<bool> = None;

    for (_, won) in &outcomes {
        if run_value == Some(*won) {
            run_length += 1;
        } else {
            run_value = Some(*won);
            run_length = 1;
        }
        if *won {
            longest_win = longest_win.max(run_length);
        } else {
            longest_loss = longest_loss.max(run_length);
        }
    }

    let (current_streak_length, current_streak_type) = match run_value {
        Some(true) => (run_length, StreakType::Win),
        Some(false) => (run_length, StreakType::Loss),
        None => (0, StreakType::None),
    };

    StreakSummary {
        current_streak_length,
        current_streak_type,
        longest_win_streak: longest_win,
        longest_loss_streak: longest_loss,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodValue {
    pub bounds: PeriodBounds,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub period1: PeriodValue,
    pub period2: PeriodValue,
    pub change: f64,
    pub change_pct: f64,
}

/// Combine two already-reduced period values. When `value1 == 0` the
/// percentage is a directional convention (+100 up, -100 down, 0 flat),
/// not a literal percentage.
pub fn compare_values(
    bounds1: PeriodBounds,
    value1: f64,
    bounds2: PeriodBounds,
    value2: f64,
) -> PeriodComparison {
    let change = value2 - value1;
    let change_pct = if value1 == 0.0 {
        if value2 > 0.0 {
            100.0
        } else if value2 < 0.0 {
            -100.0
        } else {
            0.0
        }
    } else {
        change / value1 * 100.0
    };

    PeriodComparison {
        period1: PeriodValue {
            bounds: bounds1,
            value: value1,
        },
        period2: PeriodValue {
            bounds: bounds2,
            value: value2,
        },
        change,
        change_pct,
    }
}

//! Natural-language period resolution.
//!
//! Turns a closed vocabulary of period expressions into concrete time
//! bounds, always relative to a caller-supplied reference instant so that
//! resolution is deterministic and replayable. Point expressions ("today")
//! resolve to the period so far; completed periods ("yesterday",
//! "last week") cover the full calendar period, ending one tick before the
//! next period starts.

use crate::domain::error::TradelogError;
use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Inclusive time bounds, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodBounds {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        PeriodBounds { start, end }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Resolve a period expression against a reference instant.
///
/// Returns [`TradelogError::PeriodNotRecognized`] for anything outside the
/// vocabulary; "valid but empty" is not an error and cannot occur here.
pub fn resolve(expression: &str, reference: NaiveDateTime) -> Result<PeriodBounds, TradelogError> {
    let expr = expression.trim().to_lowercase();
    let today = reference.date();

    let bounds = match expr.as_str() {
        "now" => PeriodBounds::new(reference, reference),
        "today" => PeriodBounds::new(day_start(today), reference),
        "yesterday" => full_day(prev_day(today)),
        "tomorrow" => full_day(next_day(today)),
        "this week" => PeriodBounds::new(day_start(week_start(today)), reference),
        "last week" => {
            let this_monday = week_start(today);
            let last_monday = this_monday
                .checked_sub_days(Days::new(7))
                .unwrap_or(this_monday);
            PeriodBounds::new(day_start(last_monday), one_tick_before(day_start(this_monday)))
        }
        "this month" => PeriodBounds::new(day_start(month_start(today)), reference),
        "last month" => {
            let this_first = month_start(today);
            let last_first = month_start(prev_day(this_first));
            PeriodBounds::new(day_start(last_first), one_tick_before(day_start(this_first)))
        }
        "this year" => PeriodBounds::new(day_start(year_start(today.year())), reference),
        "last year" => PeriodBounds::new(
            day_start(year_start(today.year() - 1)),
            one_tick_before(day_start(year_start(today.year()))),
        ),
        _ => {
            if let Some(bounds) = resolve_relative(&expr, reference) {
                bounds
            } else if let Some(date) = parse_absolute_date(expression.trim(), today) {
                full_day(date)
            } else {
                return Err(TradelogError::PeriodNotRecognized {
                    expression: expression.to_string(),
                });
            }
        }
    };

    Ok(bounds)
}

/// Lenient convenience wrapper: unrecognized input defaults to "today".
///
/// The strict/lenient split is intentional; callers that need to tell the
/// user "I did not understand that period" use [`resolve`] directly.
pub fn resolve_or_today(expression: &str, reference: NaiveDateTime) -> PeriodBounds {
    resolve(expression, reference).unwrap_or_else(|_| {
        log::debug!("period expression not recognized, defaulting to today: '{expression}'");
        PeriodBounds::new(day_start(reference.date()), reference)
    })
}

/// `"<n> <unit> ago"` and `"last <n> <unit>"`: trailing windows ending at
/// the reference instant.
fn resolve_relative(expr: &str, reference: NaiveDateTime) -> Option<PeriodBounds> {
    let tokens: Vec<&str> = expr.split_whitespace().collect();

    let (n, unit) = match tokens.as_slice() {
        [n, unit, "ago"] => (n, unit),
        ["last", n, unit] => (n, unit),
        _ => return None,
    };

    let n: i64 = n.parse().ok()?;
    if n <= 0 {
        return None;
    }

    let span = unit_duration(unit, n)?;
    let start = reference.checked_sub_signed(span).unwrap_or(reference);
    Some(PeriodBounds::new(start, reference))
}

fn unit_duration(unit: &str, n: i64) -> Option<Duration> {
    match unit {
        "second" | "seconds" => Duration::try_seconds(n),
        "minute" | "minutes" => Duration::try_minutes(n),
        "hour" | "hours" => Duration::try_hours(n),
        "day" | "days" => Duration::try_days(n),
        "week" | "weeks" => Duration::try_weeks(n),
        // Months approximated as 30 days; calendar-exact month arithmetic is
        // not worth the ambiguity for a trailing window.
        "month" | "months" => Duration::try_days(n.checked_mul(30)?),
        _ => None,
    }
}

/// Absolute dates. US forms are tried before EU forms, so an ambiguous
/// `03/04/2024` reads as March 4th; a day > 12 falls through to the EU
/// parse. A missing year defaults to the reference year.
fn parse_absolute_date(expr: &str, today: NaiveDate) -> Option<NaiveDate> {
    const FORMATS: [&str; 11] = [
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%B %d, %Y",
        "%B %d %Y",
        "%b %d, %Y",
        "%b %d %Y",
        "%d %B %Y",
        "%d %b %Y",
    ];

    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(expr, format) {
            return Some(date);
        }
    }

    // Month-name forms without a year ("January 15", "15 Jan").
    let with_year = format!("{} {}", expr, today.year());
    for format in ["%B %d, %Y", "%B %d %Y", "%b %d, %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            return Some(date);
        }
    }

    None
}

fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn full_day(date: NaiveDate) -> PeriodBounds {
    PeriodBounds::new(day_start(date), one_tick_before(day_start(next_day(date))))
}

/// One tick = 1 microsecond: the end of a completed period is the last
/// representable instant before the next period starts.
fn one_tick_before(t: NaiveDateTime) -> NaiveDateTime {
    t.checked_sub_signed(Duration::microseconds(1)).unwrap_or(t)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

fn year_start(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

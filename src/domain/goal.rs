//! Profit goals and progress math.

use crate::domain::period::{self, PeriodBounds};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl GoalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPeriod::Daily => "daily",
            GoalPeriod::Weekly => "weekly",
            GoalPeriod::Monthly => "monthly",
            GoalPeriod::Custom => "custom",
        }
    }
}

impl FromStr for GoalPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(GoalPeriod::Daily),
            "weekly" => Ok(GoalPeriod::Weekly),
            "monthly" => Ok(GoalPeriod::Monthly),
            "custom" => Ok(GoalPeriod::Custom),
            other => Err(format!("unknown goal period: {other}")),
        }
    }
}

/// One active goal per account; replacing overwrites, never versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub account_id: String,
    pub amount: f64,
    pub period: GoalPeriod,
    pub raw_statement: String,
    pub confirmed: bool,
}

/// The window a goal's `current` is measured over, relative to `reference`:
/// daily is today so far, weekly Monday-to-now, monthly 1st-to-now, and
/// custom a trailing 30 days.
pub fn measurement_bounds(period: GoalPeriod, reference: NaiveDateTime) -> PeriodBounds {
    let expr = match period {
        GoalPeriod::Daily => "today",
        GoalPeriod::Weekly => "this week",
        GoalPeriod::Monthly => "this month",
        GoalPeriod::Custom => "last 30 days",
    };
    period::resolve_or_today(expr, reference)
}

/// On-track floor for weekly goals: one seventh of the way.
pub const WEEKLY_ON_TRACK_FLOOR_PCT: f64 = 100.0 / 7.0;
/// On-track floor for every other period kind.
pub const DEFAULT_ON_TRACK_FLOOR_PCT: f64 = 50.0;

/// Days-to-completion projection. `Unbounded` is an explicit sentinel,
/// distinct from any numeric infinity, because the value is surfaced
/// verbatim in tool-call JSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DaysToComplete {
    Days(f64),
    Unbounded,
}

impl Serialize for DaysToComplete {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DaysToComplete::Days(d) => serializer.serialize_f64(*d),
            DaysToComplete::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal: f64,
    pub current: f64,
    pub remaining: f64,
    pub progress_pct: f64,
    pub daily_rate: f64,
    pub on_track: bool,
    pub days_to_complete: DaysToComplete,
}

/// Pure progress computation given the already-summed `current` and the
/// number of elapsed days in the measurement window (floored to 1).
///
/// The on-track floors are deliberately simplistic and not proportional to
/// elapsed time: weekly goals use the ~14.3% floor, everything else a flat
/// 50% floor.
pub fn progress(
    goal_amount: f64,
    period: GoalPeriod,
    current: f64,
    elapsed_days: f64,
) -> GoalProgress {
    let remaining = (goal_amount - current).max(0.0);
    let progress_pct = if goal_amount > 0.0 {
        current / goal_amount * 100.0
    } else {
        0.0
    };
    let daily_rate = current / elapsed_days.max(1.0);

    let floor = match period {
        GoalPeriod::Weekly => WEEKLY_ON_TRACK_FLOOR_PCT,
        _ => DEFAULT_ON_TRACK_FLOOR_PCT,
    };
    let on_track = progress_pct >= floor;

    let days_to_complete = if current >= goal_amount {
        DaysToComplete::Days(0.0)
    } else if daily_rate > 0.0 {
        DaysToComplete::Days(remaining / daily_rate)
    } else {
        DaysToComplete::Unbounded
    };

    GoalProgress {
        goal: goal_amount,
        current,
        remaining,
        progress_pct,
        daily_rate,
        on_track,
        days_to_complete,
    }
}

/// Whole elapsed days in a window, inclusive of the start day, floored to 1.
pub fn elapsed_days(bounds: &PeriodBounds, reference: NaiveDateTime) -> f64 {
    let span = reference.date() - bounds.start.date() + Duration::days(1);
    span.num_days().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_goal_above_floor() {
        let p = progress(50.0, GoalPeriod::Daily, 30.0, 1.0);
        assert_eq!(p.remaining, 20.0);
        assert!((p.progress_pct - 60.0).abs() < 1e-9);
        assert!(p.on_track);
        assert_eq!(p.daily_rate, 30.0);
    }

    #[test]
    fn daily_goal_below_floor() {
        let p = progress(50.0, GoalPeriod::Daily, 20.0, 1.0);
        assert!((p.progress_pct - 40.0).abs() < 1e-9);
        assert!(!p.on_track);
    }

    #[test]
    fn weekly_floor_is_one_seventh() {
        // 15% of a weekly goal clears the ~14.3% floor but not 50%.
        let p = progress(100.0, GoalPeriod::Weekly, 15.0, 2.0);
        assert!(p.on_track);

        let p = progress(100.0, GoalPeriod::Monthly, 15.0, 2.0);
        assert!(!p.on_track);
    }

    #[test]
    fn days_to_complete_projection() {
        // 20 remaining at 10/day → 2 days.
        let p = progress(50.0, GoalPeriod::Daily, 30.0, 3.0);
        match p.days_to_complete {
            DaysToComplete::Days(d) => assert!((d - 2.0).abs() < 1e-9),
            DaysToComplete::Unbounded => panic!("expected bounded projection"),
        }
    }

    #[test]
    fn zero_rate_is_unbounded_not_infinite() {
        let p = progress(50.0, GoalPeriod::Daily, 0.0, 1.0);
        assert_eq!(p.days_to_complete, DaysToComplete::Unbounded);
        assert_eq!(p.daily_rate, 0.0);
    }

    #[test]
    fn met_goal_completes_in_zero_days() {
        let p = progress(50.0, GoalPeriod::Daily, 55.0, 2.0);
        assert_eq!(p.days_to_complete, DaysToComplete::Days(0.0));
        assert_eq!(p.remaining, 0.0);
        assert!((p.progress_pct - 110.0).abs() < 1e-9);
    }

    #[test]
    fn negative_current_projects_unbounded() {
        // A losing week: negative rate never reaches the goal.
        let p = progress(50.0, GoalPeriod::Weekly, -10.0, 2.0);
        assert_eq!(p.days_to_complete, DaysToComplete::Unbounded);
        assert!(!p.on_track);
    }

    #[test]
    fn unbounded_serializes_as_string_sentinel() {
        let p = progress(50.0, GoalPeriod::Daily, 0.0, 1.0);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["days_to_complete"], serde_json::json!("unbounded"));

        let p = progress(50.0, GoalPeriod::Daily, 25.0, 1.0);
        let json = serde_json::to_value(&p).unwrap();
        assert!(json["days_to_complete"].is_number());
    }

    #[test]
    fn measurement_bounds_per_period() {
        // Thursday 2024-01-18 10:00.
        let reference = dt(2024, 1, 18, 10);

        let daily = measurement_bounds(GoalPeriod::Daily, reference);
        assert_eq!(daily.start, dt(2024, 1, 18, 0));
        assert_eq!(daily.end, reference);

        let weekly = measurement_bounds(GoalPeriod::Weekly, reference);
        assert_eq!(weekly.start, dt(2024, 1, 15, 0));

        let monthly = measurement_bounds(GoalPeriod::Monthly, reference);
        assert_eq!(monthly.start, dt(2024, 1, 1, 0));

        let custom = measurement_bounds(GoalPeriod::Custom, reference);
        assert_eq!(custom.start, dt(2023, 12, 19, 10));
        assert_eq!(custom.end, reference);
    }

    #[test]
    fn elapsed_days_inclusive() {
        let reference = dt(2024, 1, 18, 10);
        let weekly = measurement_bounds(GoalPeriod::Weekly, reference);
        // Monday through Thursday inclusive.
        assert_eq!(elapsed_days(&weekly, reference), 4.0);

        let daily = measurement_bounds(GoalPeriod::Daily, reference);
        assert_eq!(elapsed_days(&daily, reference), 1.0);
    }

    #[test]
    fn goal_period_parses() {
        assert_eq!("daily".parse::<GoalPeriod>().unwrap(), GoalPeriod::Daily);
        assert_eq!("WEEKLY".parse::<GoalPeriod>().unwrap(), GoalPeriod::Weekly);
        assert!("fortnightly".parse::<GoalPeriod>().is_err());
    }
}

//! Resolves which of a day's activities is in progress and which comes next.
//!
//! Resolution is stateless: callers recompute it whenever the reference time
//! or the activity list changes. Clients re-poll every [`REFRESH_INTERVAL`].

use crate::core::itinerary::{Activity, Itinerary};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Activities without an end time are assumed to last this many hours.
pub const ASSUMED_DURATION_HOURS: i64 = 2;

/// How often clients should re-resolve the schedule.
pub const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

static TIME_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?:\s*[-~]\s*(\d{1,2}):(\d{2}))?")
        .expect("time spec pattern is valid")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveTime>,
    /// Minutes after the day's midnight. Hours past 23 run into the next
    /// day, so `"24:30"` is 1470.
    pub end_minutes: Option<u32>,
}

impl TimeRange {
    /// Parses `"HH:MM"`, `"HH:MM-HH:MM"` or `"HH:MM~HH:MM"` from the start of
    /// `spec`. Anything else yields an empty range; this never fails.
    pub fn parse(spec: &str) -> Self {
        let Some(caps) = TIME_SPEC.captures(spec) else {
            return TimeRange::default();
        };
        let hour_minute = |h: usize, m: usize| -> Option<(u32, u32)> {
            let hour = caps.get(h)?.as_str().parse().ok()?;
            let minute = caps.get(m)?.as_str().parse().ok()?;
            (minute < 60).then_some((hour, minute))
        };
        let start = hour_minute(1, 2).and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0));
        match start {
            Some(start) => TimeRange {
                start: Some(start),
                end_minutes: hour_minute(3, 4).map(|(h, m)| h * 60 + m),
            },
            None => TimeRange::default(),
        }
    }

    /// Wall-clock end time; `"24:30"` reads as 00:30.
    pub fn end_time(&self) -> Option<NaiveTime> {
        self.end_minutes
            .and_then(|m| NaiveTime::from_hms_opt((m / 60) % 24, m % 60, 0))
    }
}

/// Shorthand for [`TimeRange::parse`].
pub fn parse_time_spec(spec: &str) -> TimeRange {
    TimeRange::parse(spec)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Current,
    Next,
    None,
}

fn is_current(range: TimeRange, day: NaiveDate, now: NaiveDateTime) -> bool {
    let Some(start) = range.start.map(|t| day.and_time(t)) else {
        return false;
    };
    let end = match range.end_minutes {
        Some(minutes) => day.and_time(NaiveTime::MIN) + Duration::minutes(i64::from(minutes)),
        None => start + Duration::hours(ASSUMED_DURATION_HOURS),
    };
    start <= now && now <= end
}

fn starts_after(range: TimeRange, day: NaiveDate, now: NaiveDateTime) -> bool {
    range.start.is_some_and(|t| day.and_time(t) > now)
}

/// Classifies every activity relative to `now`, in input order.
///
/// "Current" is decided per activity. "Next" goes to the first activity in
/// list order that is not current and starts after `now`; the order of
/// `activities` therefore decides ties.
pub fn resolve_status(
    activities: &[Activity],
    day: NaiveDate,
    now: NaiveDateTime,
) -> Vec<ActivityStatus> {
    let mut found_next = false;
    activities
        .iter()
        .map(|activity| {
            let range = activity.time_range();
            if is_current(range, day, now) {
                ActivityStatus::Current
            } else if !found_next && starts_after(range, day, now) {
                found_next = true;
                ActivityStatus::Next
            } else {
                ActivityStatus::None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledActivity {
    #[serde(flatten)]
    pub activity: Activity,
    pub status: ActivityStatus,
}

/// A day's activities annotated with their status at `now`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: Itinerary,
    pub now: NaiveDateTime,
    pub activities: Vec<ScheduledActivity>,
    /// First current activity in list order; the auto-scroll target.
    pub current_activity_id: Option<String>,
    pub next_activity_id: Option<String>,
    pub refresh_seconds: u64,
}

impl DaySchedule {
    /// A day without a date has nothing to resolve against; every activity
    /// is then reported as `None`.
    pub fn resolve(day: Itinerary, activities: Vec<Activity>, now: NaiveDateTime) -> Self {
        let statuses = match day.date {
            Some(date) => resolve_status(&activities, date, now),
            None => vec![ActivityStatus::None; activities.len()],
        };
        let first_with = |wanted: ActivityStatus| {
            activities
                .iter()
                .zip(&statuses)
                .find(|(_, status)| **status == wanted)
                .map(|(activity, _)| activity.id.clone())
        };
        let current_activity_id = first_with(ActivityStatus::Current);
        let next_activity_id = first_with(ActivityStatus::Next);

        DaySchedule {
            day,
            now,
            activities: activities
                .into_iter()
                .zip(statuses)
                .map(|(activity, status)| ScheduledActivity { activity, status })
                .collect(),
            current_activity_id,
            next_activity_id,
            refresh_seconds: REFRESH_INTERVAL.as_secs(),
        }
    }
}

/// The day dated `today`, otherwise the first day of the trip.
pub fn select_default_day(days: &[Itinerary], today: NaiveDate) -> Option<&Itinerary> {
    days.iter()
        .find(|d| d.date == Some(today))
        .or_else(|| days.first())
}

/// Serde helpers for `"HH:MM"` wall times.
pub mod hhmm {
    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        const FORMAT: &str = "%H:%M";

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| {
                NaiveTime::parse_from_str(&s, FORMAT)
                    .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

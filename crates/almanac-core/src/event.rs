use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::datetime::clock_serde;

/// Minutes in a day; the denominator for all percent-of-day geometry.
pub const DAY_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Planned,
    InProgress,
    Completed,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Planned => "planned",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// A scheduled event. Field names serialize in the camelCase shape the
/// JSON export/import format uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    #[serde(default, with = "clock_serde::option")]
    pub start_time: Option<NaiveTime>,

    #[serde(default, with = "clock_serde::option")]
    pub end_time: Option<NaiveTime>,

    pub status: Status,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub assigned_to: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default)]
    pub recurrence_type: String,

    #[serde(default)]
    pub alarm: bool,

    #[serde(default)]
    pub alarm_time: Option<i64>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Event {
    pub fn new(id: u64, title: String, date: NaiveDate) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            start_date: date,
            end_date: date,
            start_time: None,
            end_time: None,
            status: Status::Planned,
            category: String::new(),
            priority: Priority::Medium,
            assigned_to: String::new(),
            location: String::new(),
            tags: vec![],
            is_recurring: false,
            recurrence_type: String::new(),
            alarm: false,
            alarm_time: None,
            extra: BTreeMap::new(),
        }
    }

    /// Inclusive date-range containment: the event occupies every day of
    /// `start_date..=end_date`, time-of-day ignored.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Range intersection against an inclusive date window.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }

    /// Minutes since midnight of the start, defaulting to 00:00 when
    /// no start time is set.
    pub fn start_minutes(&self) -> i64 {
        minutes_of(self.start_time.unwrap_or(NaiveTime::MIN))
    }

    /// Minutes since midnight of the end, defaulting to 23:59 when no
    /// end time is set.
    pub fn end_minutes(&self) -> i64 {
        match self.end_time {
            Some(t) => minutes_of(t),
            None => DAY_MINUTES - 1,
        }
    }

    /// When the reminder fires: start instant minus the configured
    /// offset. `None` when the alarm flag is off.
    pub fn alarm_instant(&self) -> Option<NaiveDateTime> {
        if !self.alarm {
            return None;
        }
        let start = self.start_date.and_time(self.start_time.unwrap_or(NaiveTime::MIN));
        let offset = chrono::Duration::minutes(self.alarm_time.unwrap_or(0));
        start.checked_sub_signed(offset)
    }
}

fn minutes_of(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Event, Status};

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    fn spanning(id: u64, start: &str, end: &str) -> Event {
        let mut event = Event::new(id, format!("event {id}"), date(start));
        event.end_date = date(end);
        event
    }

    #[test]
    fn occurs_on_is_inclusive_at_both_ends() {
        let event = spanning(1, "2025-03-01", "2025-03-03");
        assert!(!event.occurs_on(date("2025-02-28")));
        assert!(event.occurs_on(date("2025-03-01")));
        assert!(event.occurs_on(date("2025-03-02")));
        assert!(event.occurs_on(date("2025-03-03")));
        assert!(!event.occurs_on(date("2025-03-04")));
    }

    #[test]
    fn all_day_defaults_span_the_whole_day() {
        let event = spanning(1, "2025-03-01", "2025-03-01");
        assert!(event.is_all_day());
        assert_eq!(event.start_minutes(), 0);
        assert_eq!(event.end_minutes(), 24 * 60 - 1);
    }

    #[test]
    fn alarm_instant_subtracts_the_offset() {
        let mut event = spanning(1, "2025-03-01", "2025-03-01");
        event.start_time =
            Some(chrono::NaiveTime::parse_from_str("09:00", "%H:%M").expect("valid time"));
        event.alarm = true;
        event.alarm_time = Some(15);
        let instant = event.alarm_instant().expect("alarm set");
        assert_eq!(instant.to_string(), "2025-03-01 08:45:00");
    }

    #[test]
    fn alarm_instant_requires_the_flag() {
        let mut event = spanning(1, "2025-03-01", "2025-03-01");
        event.alarm_time = Some(15);
        assert!(event.alarm_instant().is_none());
    }

    #[test]
    fn json_shape_round_trips_with_unknown_fields() {
        let raw = r##"{
            "id": 7,
            "title": "Team Meeting",
            "description": "Weekly team sync meeting",
            "startDate": "2025-01-20",
            "endDate": "2025-01-20",
            "startTime": "09:00",
            "endTime": "10:00",
            "status": "in-progress",
            "category": "meeting",
            "priority": "high",
            "assignedTo": "John Doe",
            "location": "Conference Room A",
            "tags": ["work", "team"],
            "isRecurring": false,
            "recurrenceType": "",
            "alarm": true,
            "alarmTime": 15,
            "color": "#e3f2fd"
        }"##;

        let event: Event = serde_json::from_str(raw).expect("parse event");
        assert_eq!(event.status, Status::InProgress);
        assert_eq!(event.start_minutes(), 9 * 60);
        assert_eq!(event.extra["color"], "#e3f2fd");

        let out = serde_json::to_string(&event).expect("serialize event");
        let back: Event = serde_json::from_str(&out).expect("reparse event");
        assert_eq!(back.id, event.id);
        assert_eq!(back.start_time, event.start_time);
        assert_eq!(back.extra, event.extra);
    }
}

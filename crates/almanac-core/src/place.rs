use chrono::NaiveDate;

use crate::event::{DAY_MINUTES, Event};

/// How many events a day cell shows inline before collapsing into the
/// "+N more" affordance.
pub const DEFAULT_MAX_VISIBLE: usize = 3;

/// Floor for rendered extents, in percent of the axis. Keeps
/// zero-duration (and inverted, caller-invalid) events visible.
pub const MIN_EXTENT_PCT: f64 = 2.0;

/// Events occupying calendar day `date`: inclusive date-range
/// containment, input order preserved.
pub fn events_for_day<'a>(events: &'a [Event], date: NaiveDate) -> Vec<&'a Event> {
    events.iter().filter(|event| event.occurs_on(date)).collect()
}

/// Events whose span starts exactly on `date`; the timed week/day
/// overlay anchors an event to its start day only.
pub fn events_starting_on<'a>(events: &'a [Event], date: NaiveDate) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|event| event.start_date == date)
        .collect()
}

/// One day cell's event assignment with overflow bucketing.
#[derive(Debug)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    events: Vec<&'a Event>,
    max_visible: usize,
}

impl<'a> DayCell<'a> {
    pub fn build(events: &'a [Event], date: NaiveDate, max_visible: usize) -> Self {
        Self {
            date,
            events: events_for_day(events, date),
            max_visible,
        }
    }

    /// The inline events: the first `max_visible` in input order.
    pub fn visible(&self) -> &[&'a Event] {
        let cut = self.events.len().min(self.max_visible);
        &self.events[..cut]
    }

    /// Count behind the overflow affordance.
    pub fn hidden(&self) -> usize {
        self.events.len().saturating_sub(self.max_visible)
    }

    /// The full list stays reachable through the overflow surface.
    pub fn all(&self) -> &[&'a Event] {
        &self.events
    }

    pub fn more_label(&self) -> Option<String> {
        match self.hidden() {
            0 => None,
            n => Some(format!("+{n} more")),
        }
    }
}

/// Vertical placement of a timed event on a day column, in percent of
/// the 24-hour axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPosition {
    pub top_pct: f64,
    pub height_pct: f64,
}

/// Map an event's times (all-day defaults 00:00/23:59) onto the day
/// axis. Height is floored at [`MIN_EXTENT_PCT`] so zero- or
/// negative-duration input stays visible instead of producing negative
/// geometry.
pub fn timed_position(event: &Event) -> TimedPosition {
    let start = event.start_minutes();
    let end = event.end_minutes();

    let top_pct = start as f64 / DAY_MINUTES as f64 * 100.0;
    let height_pct = ((end - start) as f64 / DAY_MINUTES as f64 * 100.0).max(MIN_EXTENT_PCT);

    TimedPosition { top_pct, height_pct }
}

use chrono::{Datelike, Duration, NaiveDate};

use crate::event::Event;
use crate::grid::week_start;
use crate::place::MIN_EXTENT_PCT;

/// The visible date window of a timeline, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimelineSpan {
    pub fn day(reference: NaiveDate) -> Self {
        Self { start: reference, end: reference }
    }

    /// The Sunday-started week containing `reference`.
    pub fn week(reference: NaiveDate) -> Self {
        let start = week_start(reference);
        Self { start, end: start + Duration::days(6) }
    }

    pub fn month(reference: NaiveDate) -> Self {
        let start = reference.with_day(1).unwrap_or(reference);
        let end = start + Duration::days(i64::from(crate::grid::days_in_month(reference)) - 1);
        Self { start, end }
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        (0..self.len_days())
            .map(|offset| self.start + Duration::days(offset))
            .collect()
    }
}

/// Events intersecting the span at all.
pub fn events_in_span<'a>(events: &'a [Event], span: TimelineSpan) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|event| event.overlaps(span.start, span.end))
        .collect()
}

/// First-fit row packing: sort ascending by start date (stable), then
/// drop each event into the first row whose last-placed event ends
/// strictly before the candidate starts, else open a new row. No two
/// events sharing a row overlap; the row count is not guaranteed
/// minimal, and the placement order is kept as-is because it is
/// user-visible.
pub fn pack_rows<'a>(events: Vec<&'a Event>) -> Vec<Vec<&'a Event>> {
    let mut sorted = events;
    sorted.sort_by_key(|event| event.start_date);

    let mut rows: Vec<Vec<&Event>> = Vec::new();
    'events: for event in sorted {
        for row in &mut rows {
            if let Some(last) = row.last()
                && last.end_date < event.start_date
            {
                row.push(event);
                continue 'events;
            }
        }
        rows.push(vec![event]);
    }

    rows
}

/// Horizontal placement of an event bar within the span, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanPosition {
    pub left_pct: f64,
    pub width_pct: f64,
}

/// Offset is clamped at the span's left edge and the duration at its
/// right edge, so a bar never extends past the visible window. Width is
/// floored at [`MIN_EXTENT_PCT`].
pub fn span_position(event: &Event, span: TimelineSpan) -> SpanPosition {
    let total = span.len_days() as f64;
    let start_offset = (event.start_date - span.start).num_days().max(0) as f64;
    let event_len = ((event.end_date - event.start_date).num_days() + 1) as f64;
    let duration = event_len.min(total - start_offset);

    SpanPosition {
        left_pct: start_offset / total * 100.0,
        width_pct: (duration / total * 100.0).max(MIN_EXTENT_PCT),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{TimelineSpan, events_in_span, pack_rows, span_position};
    use crate::event::Event;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    fn event_on(id: u64, start: &str, end: &str) -> Event {
        let mut event = Event::new(id, format!("event {id}"), date(start));
        event.end_date = date(end);
        event
    }

    #[test]
    fn spans_cover_day_week_and_month() {
        // 2026-08-27 is a Thursday.
        let day = TimelineSpan::day(date("2026-08-27"));
        assert_eq!(day.len_days(), 1);

        let week = TimelineSpan::week(date("2026-08-27"));
        assert_eq!(week.start, date("2026-08-23"));
        assert_eq!(week.end, date("2026-08-29"));
        assert_eq!(week.days().len(), 7);

        let month = TimelineSpan::month(date("2024-02-10"));
        assert_eq!(month.start, date("2024-02-01"));
        assert_eq!(month.end, date("2024-02-29"));
    }

    #[test]
    fn overlapping_events_land_in_different_rows() {
        // [Mon..Wed] and [Tue..Thu] overlap.
        let events = vec![
            event_on(1, "2026-08-24", "2026-08-26"),
            event_on(2, "2026-08-25", "2026-08-27"),
        ];
        let rows = pack_rows(events.iter().collect());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].id, 1);
        assert_eq!(rows[1][0].id, 2);
    }

    #[test]
    fn disjoint_events_share_a_row() {
        // [Mon..Tue] then [Wed..Thu].
        let events = vec![
            event_on(1, "2026-08-24", "2026-08-25"),
            event_on(2, "2026-08-26", "2026-08-27"),
        ];
        let rows = pack_rows(events.iter().collect());
        assert_eq!(rows.len(), 1);
        let ids: Vec<u64> = rows[0].iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn touching_end_dates_still_overlap() {
        // Same-day handoff: row reuse requires the previous event to end
        // strictly before the next starts.
        let events = vec![
            event_on(1, "2026-08-24", "2026-08-25"),
            event_on(2, "2026-08-25", "2026-08-26"),
        ];
        let rows = pack_rows(events.iter().collect());
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn packing_sorts_by_start_date_first() {
        let events = vec![
            event_on(1, "2026-08-26", "2026-08-27"),
            event_on(2, "2026-08-24", "2026-08-25"),
        ];
        let rows = pack_rows(events.iter().collect());
        assert_eq!(rows.len(), 1);
        let ids: Vec<u64> = rows[0].iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn empty_input_yields_zero_rows() {
        assert!(pack_rows(Vec::new()).is_empty());
    }

    #[test]
    fn span_filter_uses_range_overlap() {
        let span = TimelineSpan::week(date("2026-08-27"));
        let events = vec![
            event_on(1, "2026-08-20", "2026-08-23"), // tail overlaps
            event_on(2, "2026-08-30", "2026-09-01"), // after
            event_on(3, "2026-08-25", "2026-08-25"), // inside
        ];
        let kept: Vec<u64> = events_in_span(&events, span).iter().map(|e| e.id).collect();
        assert_eq!(kept, vec![1, 3]);
    }

    #[test]
    fn bar_geometry_is_proportional_and_clamped() {
        let span = TimelineSpan::week(date("2026-08-27")); // Aug 23..29

        let inside = event_on(1, "2026-08-24", "2026-08-25");
        let pos = span_position(&inside, span);
        assert!((pos.left_pct - 100.0 / 7.0).abs() < 1e-9);
        assert!((pos.width_pct - 200.0 / 7.0).abs() < 1e-9);

        // Runs past the right edge: width stops at the window.
        let overhang = event_on(2, "2026-08-28", "2026-09-03");
        let pos = span_position(&overhang, span);
        assert!((pos.left_pct - 500.0 / 7.0).abs() < 1e-9);
        assert!((pos.width_pct - 200.0 / 7.0).abs() < 1e-9);

        // Starts before the left edge: offset clamps to zero.
        let early = event_on(3, "2026-08-20", "2026-08-24");
        let pos = span_position(&early, span);
        assert_eq!(pos.left_pct, 0.0);

        // A 1-day bar in a long window keeps the minimum width.
        let long = TimelineSpan {
            start: date("2026-01-01"),
            end: date("2026-04-10"),
        };
        let sliver = event_on(4, "2026-02-10", "2026-02-10");
        let pos = span_position(&sliver, long);
        assert_eq!(pos.width_pct, crate::place::MIN_EXTENT_PCT);
    }
}

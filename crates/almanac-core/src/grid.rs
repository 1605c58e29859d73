use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};

use crate::event::DAY_MINUTES;

/// One cell of a month grid. Padding cells from the adjacent months get
/// `in_current_period = false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub in_current_period: bool,
    pub is_today: bool,
}

/// One row of a week/day time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: NaiveTime,
    pub is_working_hour: bool,
}

/// The configured working-hours window. Classification is
/// hour-granularity only; minutes on the boundary hours are ignored.
#[derive(Debug, Clone, Copy)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Which weekdays count as working days, indexed Sunday-first.
#[derive(Debug, Clone, Copy)]
pub struct WorkingDays(pub [bool; 7]);

impl Default for WorkingDays {
    fn default() -> Self {
        // Monday through Friday.
        Self([false, true, true, true, true, true, false])
    }
}

impl WorkingDays {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.0[date.weekday().num_days_from_sunday() as usize]
    }
}

/// The Sunday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
}

/// The 7-day Sunday-started window around `reference`. With
/// `work_week_only` the weekend cells are filtered out after generation,
/// so the result is always Monday through Friday.
pub fn week_days(reference: NaiveDate, work_week_only: bool) -> Vec<NaiveDate> {
    let start = week_start(reference);
    (0..7)
        .map(|offset| start + Duration::days(offset))
        .filter(|day| {
            !work_week_only
                || !matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
        })
        .collect()
}

/// Month grid for the month containing `reference`: leading cells from
/// the previous month back to Sunday, one cell per day of the month,
/// trailing cells padding the total to the next multiple of 7. Returned
/// as weeks of 7.
pub fn month_grid(reference: NaiveDate, today: NaiveDate) -> Vec<Vec<CalendarCell>> {
    let first = first_of_month(reference);
    let lead = i64::from(first.weekday().num_days_from_sunday());
    let month_len = i64::from(days_in_month(reference));
    let total = ((lead + month_len) as u64).div_ceil(7) as i64 * 7;
    build_weeks(first - Duration::days(lead), total, reference, today)
}

/// Fixed 6-week (42-cell) variant of [`month_grid`], used when every
/// month must paint the same number of rows.
pub fn month_grid_fixed(reference: NaiveDate, today: NaiveDate) -> Vec<Vec<CalendarCell>> {
    let first = first_of_month(reference);
    let lead = i64::from(first.weekday().num_days_from_sunday());
    build_weeks(first - Duration::days(lead), 42, reference, today)
}

fn build_weeks(
    start: NaiveDate,
    total: i64,
    reference: NaiveDate,
    today: NaiveDate,
) -> Vec<Vec<CalendarCell>> {
    let cells: Vec<CalendarCell> = (0..total)
        .map(|offset| {
            let date = start + Duration::days(offset);
            CalendarCell {
                date,
                in_current_period: date.year() == reference.year()
                    && date.month() == reference.month(),
                is_today: date == today,
            }
        })
        .collect();

    cells.chunks(7).map(|week| week.to_vec()).collect()
}

fn first_of_month(reference: NaiveDate) -> NaiveDate {
    reference.with_day(1).unwrap_or(reference)
}

pub(crate) fn days_in_month(reference: NaiveDate) -> u32 {
    let first = first_of_month(reference);
    let next = if first.month() == 12 {
        first.with_year(first.year() + 1).and_then(|d| d.with_month(1))
    } else {
        first.with_month(first.month() + 1)
    };
    match next {
        Some(next_first) => (next_first - first).num_days() as u32,
        None => 31,
    }
}

/// Fixed-interval time slots from `start_hour` to `end_hour`.
///
/// Boundary convention: the terminal `end_hour:00` slot is included when
/// `end_hour <= 23`; an `end_hour` of 24 wraps to midnight and is
/// excluded, so `time_slots(0, 24, 30)` yields exactly 48 slots,
/// `00:00` through `23:30`. No slot past the boundary is ever emitted.
pub fn time_slots(start_hour: u32, end_hour: u32, interval_minutes: u32) -> Vec<NaiveTime> {
    if interval_minutes == 0 || start_hour > end_hour {
        return vec![];
    }

    let mut slots = Vec::new();
    for hour in start_hour..=end_hour.min(24) {
        if hour >= 24 {
            break;
        }
        let mut minute = 0;
        while minute < 60 {
            if hour == end_hour && minute > 0 {
                break;
            }
            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
                slots.push(time);
            }
            minute += interval_minutes;
        }
    }

    slots
}

/// [`time_slots`] tagged with the working-hours classification.
pub fn classified_slots(
    start_hour: u32,
    end_hour: u32,
    interval_minutes: u32,
    window: &WorkingHours,
) -> Vec<TimeSlot> {
    time_slots(start_hour, end_hour, interval_minutes)
        .into_iter()
        .map(|time| TimeSlot {
            time,
            is_working_hour: is_working_hour(time, window),
        })
        .collect()
}

/// Hour-granularity working-hours test: the slot's integer hour must
/// fall in `[window.start.hour(), window.end.hour())`.
pub fn is_working_hour(time: NaiveTime, window: &WorkingHours) -> bool {
    let hour = time.hour();
    hour >= window.start.hour() && hour < window.end.hour()
}

/// Percent of the day elapsed at `time`; drives the current-time
/// indicator on the column whose date is today.
pub fn day_fraction(time: NaiveTime) -> f64 {
    let minutes = i64::from(time.hour()) * 60 + i64::from(time.minute());
    minutes as f64 / DAY_MINUTES as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};

    use super::{
        WorkingDays, WorkingHours, day_fraction, is_working_hour, month_grid, month_grid_fixed,
        time_slots, week_days, week_start,
    };

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    fn time(s: &str) -> chrono::NaiveTime {
        chrono::NaiveTime::parse_from_str(s, "%H:%M").expect("valid time literal")
    }

    #[test]
    fn month_grid_is_weeks_of_seven_with_contiguous_month_run() {
        for reference in [
            date("2025-01-15"),
            date("2024-02-10"),
            date("2025-12-31"),
            date("2026-08-01"),
        ] {
            let weeks = month_grid(reference, reference);
            let cells: Vec<_> = weeks.iter().flatten().collect();
            assert_eq!(cells.len() % 7, 0);
            for week in &weeks {
                assert_eq!(week.len(), 7);
            }

            let in_month: Vec<_> = cells
                .iter()
                .filter(|cell| cell.in_current_period)
                .collect();
            assert_eq!(in_month.first().expect("non-empty month").date.day(), 1);
            for pair in in_month.windows(2) {
                assert_eq!(pair[1].date, pair[0].date.succ_opt().expect("next day"));
            }

            // In-month cells form one contiguous block.
            let first_idx = cells
                .iter()
                .position(|c| c.in_current_period)
                .expect("month present");
            let last_idx = cells
                .iter()
                .rposition(|c| c.in_current_period)
                .expect("month present");
            assert_eq!(last_idx - first_idx + 1, in_month.len());
        }
    }

    #[test]
    fn month_grid_pads_from_adjacent_months() {
        // September 2026 starts on a Tuesday.
        let weeks = month_grid(date("2026-09-15"), date("2026-09-15"));
        let first_week = &weeks[0];
        assert!(!first_week[0].in_current_period);
        assert_eq!(first_week[0].date, date("2026-08-30"));
        assert_eq!(first_week[2].date, date("2026-09-01"));
        assert!(first_week[2].in_current_period);
    }

    #[test]
    fn month_grid_handles_leap_february() {
        let weeks = month_grid(date("2024-02-10"), date("2024-02-10"));
        let in_month = weeks
            .iter()
            .flatten()
            .filter(|cell| cell.in_current_period)
            .count();
        assert_eq!(in_month, 29);

        let weeks = month_grid(date("2025-02-10"), date("2025-02-10"));
        let in_month = weeks
            .iter()
            .flatten()
            .filter(|cell| cell.in_current_period)
            .count();
        assert_eq!(in_month, 28);
    }

    #[test]
    fn month_grid_crosses_year_boundaries() {
        // January 2027 starts on a Friday; the leading pad is December 2026.
        let weeks = month_grid(date("2027-01-15"), date("2027-01-15"));
        assert_eq!(weeks[0][0].date, date("2026-12-27"));
        assert!(!weeks[0][0].in_current_period);

        // December tails pad into the next January.
        let weeks = month_grid(date("2026-12-15"), date("2026-12-15"));
        let last = weeks
            .last()
            .and_then(|week| week.last())
            .expect("non-empty grid");
        assert!(last.date >= date("2026-12-31"));
    }

    #[test]
    fn fixed_grid_always_paints_42_cells() {
        for reference in [date("2025-02-01"), date("2026-08-27"), date("2024-02-29")] {
            let weeks = month_grid_fixed(reference, reference);
            assert_eq!(weeks.len(), 6);
            assert_eq!(weeks.iter().flatten().count(), 42);
        }
    }

    #[test]
    fn exactly_one_cell_is_today_when_today_is_in_range() {
        let today = date("2026-08-27");
        let weeks = month_grid(today, today);
        let count = weeks.iter().flatten().filter(|c| c.is_today).count();
        assert_eq!(count, 1);

        let elsewhere = month_grid(date("2026-03-10"), today);
        let count = elsewhere.iter().flatten().filter(|c| c.is_today).count();
        assert_eq!(count, 0);
    }

    #[test]
    fn weeks_start_on_sunday() {
        // 2026-08-27 is a Thursday.
        assert_eq!(week_start(date("2026-08-27")), date("2026-08-23"));
        assert_eq!(week_start(date("2026-08-23")), date("2026-08-23"));

        let days = week_days(date("2026-08-27"), false);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], date("2026-08-23"));
        assert_eq!(days[6], date("2026-08-29"));
    }

    #[test]
    fn work_week_is_monday_through_friday() {
        let days = week_days(date("2026-08-27"), true);
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], date("2026-08-24"));
        assert_eq!(days[4], date("2026-08-28"));
        assert!(days.iter().all(|d| {
            !matches!(d.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
        }));
    }

    #[test]
    fn full_day_slots_exclude_the_midnight_wrap() {
        let slots = time_slots(0, 24, 30);
        assert_eq!(slots.len(), 48);
        assert_eq!(slots[0], time("00:00"));
        assert_eq!(slots[47], time("23:30"));
        for pair in slots.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_minutes(), 30);
        }
    }

    #[test]
    fn bounded_slots_include_the_terminal_hour() {
        let slots = time_slots(8, 17, 30);
        assert_eq!(slots.first(), Some(&time("08:00")));
        assert_eq!(slots.last(), Some(&time("17:00")));
        assert_eq!(slots.len(), 19);
    }

    #[test]
    fn degenerate_slot_ranges_are_empty() {
        assert!(time_slots(10, 8, 30).is_empty());
        assert!(time_slots(0, 24, 0).is_empty());
    }

    #[test]
    fn working_hours_classify_by_integer_hour() {
        let window = WorkingHours {
            start: time("09:00"),
            end: time("17:00"),
        };
        assert!(!is_working_hour(time("08:30"), &window));
        assert!(is_working_hour(time("09:00"), &window));
        assert!(is_working_hour(time("09:30"), &window));
        assert!(is_working_hour(time("16:30"), &window));
        assert!(!is_working_hour(time("17:00"), &window));
    }

    #[test]
    fn default_working_days_skip_weekends() {
        let days = WorkingDays::default();
        assert!(days.contains(date("2026-08-24"))); // Monday
        assert!(days.contains(date("2026-08-28"))); // Friday
        assert!(!days.contains(date("2026-08-29"))); // Saturday
        assert!(!days.contains(date("2026-08-30"))); // Sunday
    }

    #[test]
    fn day_fraction_maps_minutes_to_percent() {
        assert_eq!(day_fraction(time("00:00")), 0.0);
        assert_eq!(day_fraction(time("12:00")), 50.0);
        assert_eq!(day_fraction(time("09:00")), 37.5);
    }
}

use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate, NaiveTime};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::{format_date_range, format_time};
use crate::event::{Event, Status};
use crate::grid::{CalendarCell, TimeSlot, WorkingDays, day_fraction};
use crate::place::{DayCell, events_starting_on, timed_position};
use crate::timeline::{SpanPosition, TimelineSpan};

const MONTH_CELL_WIDTH: usize = 14;
const TIMELINE_WIDTH: usize = 63;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    format_24h: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.get_bool("color").unwrap_or(true),
            format_24h: cfg.time_format_24(),
        }
    }

    #[tracing::instrument(skip(self, events))]
    pub fn print_event_table(&mut self, events: &[&Event]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Date".to_string(),
            "Time".to_string(),
            "Status".to_string(),
            "Pri".to_string(),
            "Title".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::with_capacity(events.len());
        for event in events {
            let id = self.paint(&event.id.to_string(), "33");
            let date = format_date_range(event.start_date, event.end_date);
            let time = self.time_range(event);
            let status = self.paint_status(event.status);
            let tags = event
                .tags
                .iter()
                .map(|tag| format!("+{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                id,
                date,
                time,
                status,
                event.priority.label().to_string(),
                event.title.clone(),
                tags,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, event))]
    pub fn print_event_info(&mut self, event: &Event) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", event.id)?;
        writeln!(out, "title       {}", event.title)?;
        writeln!(out, "description {}", event.description)?;
        writeln!(out, "dates       {}", format_date_range(event.start_date, event.end_date))?;
        if !event.is_all_day() {
            writeln!(out, "time        {}", self.time_range(event))?;
        }
        writeln!(out, "status      {}", event.status.label())?;
        writeln!(out, "priority    {}", event.priority.label())?;
        writeln!(out, "category    {}", event.category)?;
        writeln!(out, "assignee    {}", event.assigned_to)?;
        writeln!(out, "location    {}", event.location)?;
        writeln!(out, "tags        {}", event.tags.join(", "))?;
        if event.is_recurring {
            writeln!(out, "recurrence  {}", event.recurrence_type)?;
        }
        if event.alarm {
            writeln!(
                out,
                "alarm       {} minutes before start",
                event.alarm_time.unwrap_or(0)
            )?;
        }

        Ok(())
    }

    /// Month grid: weekday header, then per week a day-number line and up
    /// to `max_visible` event title lines plus the "+N more" affordance.
    #[tracing::instrument(skip(self, weeks, events))]
    pub fn print_month(
        &mut self,
        weeks: &[Vec<CalendarCell>],
        events: &[Event],
        max_visible: usize,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let header: Vec<String> = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]
            .iter()
            .map(|name| pad_cell(name, MONTH_CELL_WIDTH))
            .collect();
        writeln!(out, "{}", header.join(" "))?;
        writeln!(out, "{}", vec!["-".repeat(MONTH_CELL_WIDTH); 7].join(" "))?;

        for week in weeks {
            let cells: Vec<DayCell> = week
                .iter()
                .map(|cell| DayCell::build(events, cell.date, max_visible))
                .collect();

            let mut number_line = Vec::with_capacity(7);
            for cell in week {
                let label = cell.date.day().to_string();
                let painted = if cell.is_today {
                    self.paint(&label, "7;1")
                } else if !cell.in_current_period {
                    self.paint(&label, "2")
                } else {
                    label
                };
                number_line.push(pad_painted(&painted, MONTH_CELL_WIDTH));
            }
            writeln!(out, "{}", number_line.join(" "))?;

            let depth = cells
                .iter()
                .map(|cell| cell.visible().len() + usize::from(cell.hidden() > 0))
                .max()
                .unwrap_or(0);

            for line_idx in 0..depth {
                let mut line = Vec::with_capacity(7);
                for cell in &cells {
                    let visible = cell.visible();
                    let text = if line_idx < visible.len() {
                        truncate_to_width(&visible[line_idx].title, MONTH_CELL_WIDTH)
                    } else if line_idx == visible.len() {
                        cell.more_label().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    line.push(pad_cell(&text, MONTH_CELL_WIDTH));
                }
                writeln!(out, "{}", line.join(" "))?;
            }

            writeln!(out)?;
        }

        Ok(())
    }

    /// Week (or work-week, or single-day) time grid: one row per slot,
    /// events anchored at their start slot, an all-day row up top, and a
    /// current-time marker on today's column. Non-working day headers
    /// are dimmed.
    #[tracing::instrument(skip(self, days, slots, events, working_days))]
    #[allow(clippy::too_many_arguments)]
    pub fn print_time_grid(
        &mut self,
        days: &[NaiveDate],
        slots: &[TimeSlot],
        events: &[Event],
        working_days: &WorkingDays,
        today: NaiveDate,
        now: NaiveTime,
        interval_minutes: u32,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let col_width = MONTH_CELL_WIDTH + 4;

        let mut header = vec![pad_cell("", 5)];
        for day in days {
            let label = format!("{} {}", day.format("%a"), day.format("%b %-d"));
            let painted = if *day == today {
                self.paint(&pad_cell(&label, col_width), "7;1")
            } else if !working_days.contains(*day) {
                self.paint(&pad_cell(&label, col_width), "2")
            } else {
                pad_cell(&label, col_width)
            };
            header.push(painted);
        }
        writeln!(out, "{}", header.join(" "))?;

        // All-day events occupy every day of their span, above the axis.
        let mut all_day_line = vec![pad_cell("all-d", 5)];
        let mut any_all_day = false;
        for day in days {
            let titles: Vec<&str> = events
                .iter()
                .filter(|e| e.is_all_day() && e.occurs_on(*day))
                .map(|e| e.title.as_str())
                .collect();
            if !titles.is_empty() {
                any_all_day = true;
            }
            all_day_line.push(pad_cell(&truncate_to_width(&titles.join(", "), col_width), col_width));
        }
        if any_all_day {
            writeln!(out, "{}", all_day_line.join(" "))?;
        }

        // Timed events anchor to their start day only; spillover across
        // midnight is not drawn.
        let by_day: Vec<Vec<&Event>> = days
            .iter()
            .map(|day| events_starting_on(events, *day))
            .collect();

        for slot in slots {
            let window = slot_window(slot.time, interval_minutes);
            let time_label = slot.time.format("%H:%M").to_string();
            let now_pct = day_fraction(now);
            let in_now_slot = now_pct >= window.0 && now_pct < window.1;

            let label = if !slot.is_working_hour {
                self.paint(&time_label, "2")
            } else {
                time_label.clone()
            };
            let label = if in_now_slot && days.contains(&today) {
                self.paint(&time_label, "31")
            } else {
                label
            };

            let mut line = vec![pad_painted(&label, 5)];
            for (day, day_events) in days.iter().zip(&by_day) {
                let titles: Vec<String> = day_events
                    .iter()
                    .filter(|e| starts_in_slot(e, window))
                    .map(|e| e.title.clone())
                    .collect();

                let marker = if in_now_slot && *day == today {
                    self.paint("<", "31")
                } else {
                    String::new()
                };
                let text = truncate_to_width(&titles.join(", "), col_width);
                let cell = if marker.is_empty() {
                    pad_cell(&text, col_width)
                } else {
                    pad_painted(&format!("{text}{marker}"), col_width)
                };
                line.push(cell);
            }
            writeln!(out, "{}", line.join(" "))?;
        }

        Ok(())
    }

    /// Agenda: events grouped per day, ordered, with times and details.
    #[tracing::instrument(skip(self, groups))]
    pub fn print_agenda(&mut self, groups: &[(NaiveDate, Vec<&Event>)]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if groups.is_empty() {
            writeln!(out, "No events in the selected period.")?;
            return Ok(());
        }

        for (day, day_events) in groups {
            writeln!(out, "{}", self.paint(&day.format("%A, %b %-d, %Y").to_string(), "1"))?;
            for event in day_events {
                let time = if event.is_all_day() {
                    "all day".to_string()
                } else {
                    self.time_range(event)
                };
                let status = pad_painted(&self.paint_status(event.status), 12);
                let mut line =
                    format!("  {:>4}  {:<15} {status} {}", event.id, time, event.title);
                if !event.location.is_empty() {
                    line.push_str(&format!(" ({})", event.location));
                }
                writeln!(out, "{line}")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    /// Timeline: a date scale plus one line per packed row, bars placed
    /// by their percent geometry scaled to a fixed character width.
    #[tracing::instrument(skip(self, span, rows))]
    pub fn print_timeline(
        &mut self,
        span: TimelineSpan,
        rows: &[Vec<(&Event, SpanPosition)>],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(
            out,
            "Timeline: {}",
            format_date_range(span.start, span.end)
        )?;

        let days = span.days();
        let day_width = TIMELINE_WIDTH / days.len().max(1);
        let mut scale = String::new();
        for day in &days {
            scale.push_str(&pad_cell(&day.format("%-d").to_string(), day_width));
        }
        writeln!(out, "{scale}")?;
        writeln!(out, "{}", "-".repeat(day_width * days.len()))?;

        if rows.is_empty() {
            writeln!(out, "No events in the selected timeline.")?;
            return Ok(());
        }

        let width = day_width * days.len();
        for row in rows {
            let mut line: Vec<char> = vec![' '; width];
            for (event, pos) in row {
                let start = ((pos.left_pct / 100.0) * width as f64).round() as usize;
                let len = (((pos.width_pct / 100.0) * width as f64).round() as usize).max(1);
                let start = start.min(width.saturating_sub(1));
                let end = (start + len).min(width);

                let label = truncate_to_width(&event.title, end - start);
                let mut chars = label.chars();
                for cell in line.iter_mut().take(end).skip(start) {
                    *cell = chars.next().unwrap_or('=');
                }
            }
            writeln!(out, "{}", line.iter().collect::<String>())?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, stats: &[(String, String)]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let width = stats
            .iter()
            .map(|(k, _)| UnicodeWidthStr::width(k.as_str()))
            .max()
            .unwrap_or(0);
        for (key, value) in stats {
            writeln!(out, "{key:width$}  {value}")?;
        }
        Ok(())
    }

    fn time_range(&self, event: &Event) -> String {
        match (event.start_time, event.end_time) {
            (None, None) => String::new(),
            (start, end) => {
                let start = start
                    .map(|t| format_time(t, self.format_24h))
                    .unwrap_or_default();
                match end {
                    Some(t) => format!("{start} - {}", format_time(t, self.format_24h)),
                    None => start,
                }
            }
        }
    }

    fn paint_status(&self, status: Status) -> String {
        let code = match status {
            Status::Planned => "34",
            Status::InProgress => "33",
            Status::Completed => "32",
        };
        self.paint(status.label(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// The percent-of-day window `[from, to)` a slot covers on the day
/// axis. Both bounds come from `day_fraction` so a boundary start time
/// compares exactly against the next slot's `from`; a slot reaching
/// midnight is capped at the end of the axis.
fn slot_window(time: NaiveTime, interval_minutes: u32) -> (f64, f64) {
    let from = day_fraction(time);
    let (end, wrapped) =
        time.overflowing_add_signed(chrono::Duration::minutes(i64::from(interval_minutes)));
    let to = if wrapped != 0 { 100.0 } else { day_fraction(end) };
    (from, to)
}

/// A timed event belongs to the slot whose window contains the top of
/// its day-axis geometry. All-day events live in the all-day row.
fn starts_in_slot(event: &Event, window: (f64, f64)) -> bool {
    if event.start_time.is_none() {
        return false;
    }
    let top = timed_position(event).top_pct;
    top >= window.0 && top < window.1
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

fn truncate_to_width(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return s.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = UnicodeWidthStr::width(ch.to_string().as_str());
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn pad_cell(s: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(s);
    format!("{s}{}", " ".repeat(width.saturating_sub(visible)))
}

fn pad_painted(s: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(strip_ansi(s).as_str());
    format!("{s}{}", " ".repeat(width.saturating_sub(visible)))
}

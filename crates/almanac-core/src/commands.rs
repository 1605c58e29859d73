use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read};

use anyhow::{Context, anyhow};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{parse_clock_time, parse_date_expr, resolve_timezone, time_in, today_in};
use crate::event::{Event, Priority, Status};
use crate::filter::{Filter, parse_priority, parse_status};
use crate::grid::{classified_slots, month_grid, week_days};
use crate::place::DEFAULT_MAX_VISIBLE;
use crate::render::Renderer;
use crate::store::EventStore;
use crate::timeline::{TimelineSpan, events_in_span, pack_rows, span_position};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "agenda",
        "alarms",
        "assignees",
        "categories",
        "day",
        "delete",
        "done",
        "export",
        "help",
        "import",
        "info",
        "list",
        "modify",
        "month",
        "plan",
        "start",
        "stats",
        "timeline",
        "version",
        "week",
        "workweek",
        "_show",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let tz = resolve_timezone(cfg.timezone().as_deref());
    let today = today_in(tz, now);
    let now_time = time_in(tz, now);
    let command = inv.command.as_str();

    debug!(
        command,
        filter = ?inv.filter_terms,
        args = ?inv.command_args,
        %today,
        "dispatching command"
    );

    let filter = Filter::parse(&inv.filter_terms, today)?;

    match command {
        "add" => cmd_add(store, &inv.command_args, today),
        "modify" => cmd_modify(store, &filter, &inv.command_args, today),
        "delete" => cmd_delete(store, &filter),
        "done" => cmd_set_status(store, &filter, Status::Completed),
        "start" => cmd_set_status(store, &filter, Status::InProgress),
        "plan" => cmd_set_status(store, &filter, Status::Planned),
        "list" => cmd_list(store, renderer, &filter),
        "info" => cmd_info(store, renderer, &filter),
        "month" => cmd_month(store, renderer, &filter, &inv.command_args, today),
        "week" => cmd_time_grid(store, cfg, renderer, &filter, &inv.command_args, today, now_time, false),
        "workweek" => cmd_time_grid(store, cfg, renderer, &filter, &inv.command_args, today, now_time, true),
        "day" => cmd_day(store, cfg, renderer, &filter, &inv.command_args, today, now_time),
        "agenda" => cmd_agenda(store, renderer, &filter, &inv.command_args, today),
        "timeline" => cmd_timeline(store, renderer, &filter, &inv.command_args, today),
        "export" => cmd_export(store, &filter),
        "import" => cmd_import(store, today),
        "stats" => cmd_stats(store, renderer, today),
        "alarms" => cmd_alarms(store, &inv.command_args, today.and_time(now_time)),
        "categories" => cmd_categories(store),
        "assignees" => cmd_assignees(store),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// Field modifications parsed from `key:value` command arguments.
#[derive(Debug, Default)]
struct Mods {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
    status: Option<Status>,
    priority: Option<Priority>,
    category: Option<String>,
    assigned_to: Option<String>,
    location: Option<String>,
    description: Option<String>,
    add_tags: Vec<String>,
    remove_tags: Vec<String>,
    alarm_minutes: Option<i64>,
    recurrence: Option<String>,
}

/// Split command args into free title words and `key:value` mods.
fn parse_title_and_mods(args: &[String], today: NaiveDate) -> anyhow::Result<(String, Mods)> {
    let mut title_words = Vec::new();
    let mut mods = Mods::default();

    for arg in args {
        if let Some(tag) = arg.strip_prefix('+') {
            mods.add_tags.push(tag.to_string());
            continue;
        }
        if let Some(tag) = arg.strip_prefix('-') {
            mods.remove_tags.push(tag.to_string());
            continue;
        }

        let Some((key, value)) = arg.split_once(':') else {
            title_words.push(arg.clone());
            continue;
        };

        match key {
            "start" => mods.start_date = Some(parse_date_expr(value, today)?),
            "end" => mods.end_date = Some(parse_date_expr(value, today)?),
            "from" => {
                mods.start_time = Some(
                    parse_clock_time(value)
                        .ok_or_else(|| anyhow!("invalid clock time: {value}"))?,
                );
            }
            "to" => {
                mods.end_time = Some(
                    parse_clock_time(value)
                        .ok_or_else(|| anyhow!("invalid clock time: {value}"))?,
                );
            }
            "status" => mods.status = Some(parse_status(value)?),
            "priority" => mods.priority = Some(parse_priority(value)?),
            "category" => mods.category = Some(value.to_string()),
            "assignee" => mods.assigned_to = Some(value.to_string()),
            "location" => mods.location = Some(value.to_string()),
            "description" => mods.description = Some(value.to_string()),
            "alarm" => {
                mods.alarm_minutes = Some(
                    value
                        .trim()
                        .parse()
                        .with_context(|| format!("invalid alarm offset: {value}"))?,
                );
            }
            "recur" => mods.recurrence = Some(value.to_string()),
            _ => title_words.push(arg.clone()),
        }
    }

    Ok((title_words.join(" "), mods))
}

/// Apply parsed mods. Inverted date ranges are rejected here, before the
/// layout core ever sees them.
fn apply_mods(event: &mut Event, mods: &Mods) -> anyhow::Result<()> {
    if let Some(date) = mods.start_date {
        event.start_date = date;
        if event.end_date < date && mods.end_date.is_none() {
            event.end_date = date;
        }
    }
    if let Some(date) = mods.end_date {
        event.end_date = date;
    }
    if event.end_date < event.start_date {
        return Err(anyhow!(
            "end date {} precedes start date {}",
            event.end_date,
            event.start_date
        ));
    }

    if let Some(time) = mods.start_time {
        event.start_time = Some(time);
    }
    if let Some(time) = mods.end_time {
        event.end_time = Some(time);
    }
    if let Some(status) = mods.status {
        event.status = status;
    }
    if let Some(priority) = mods.priority {
        event.priority = priority;
    }
    if let Some(category) = &mods.category {
        event.category = category.clone();
    }
    if let Some(assignee) = &mods.assigned_to {
        event.assigned_to = assignee.clone();
    }
    if let Some(location) = &mods.location {
        event.location = location.clone();
    }
    if let Some(description) = &mods.description {
        event.description = description.clone();
    }
    for tag in &mods.add_tags {
        if !event.tags.iter().any(|t| t == tag) {
            event.tags.push(tag.clone());
        }
    }
    event.tags.retain(|t| !mods.remove_tags.contains(t));
    if let Some(minutes) = mods.alarm_minutes {
        event.alarm = minutes >= 0;
        event.alarm_time = (minutes >= 0).then_some(minutes);
    }
    if let Some(recurrence) = &mods.recurrence {
        event.is_recurring = !recurrence.is_empty();
        event.recurrence_type = recurrence.clone();
    }

    Ok(())
}

fn cmd_add(store: &mut EventStore, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command add");

    let (title, mods) = parse_title_and_mods(args, today)?;
    if title.is_empty() {
        return Err(anyhow!("add requires a title"));
    }

    let events = store.load()?;
    let next_id = store.next_id(&events);

    let mut event = Event::new(next_id, title, mods.start_date.unwrap_or(today));
    event.end_date = event.start_date;
    apply_mods(&mut event, &mods)?;

    let events = store.add(events, event)?;
    debug!(count = events.len(), "event added");
    println!("Created event {next_id}.");
    Ok(())
}

#[instrument(skip(store, filter, args, today))]
fn cmd_modify(
    store: &mut EventStore,
    filter: &Filter,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command modify");

    if filter.is_empty() {
        return Err(anyhow!("modify requires a filter"));
    }
    if !filter.has_identity_selector() {
        warn!("modify filter names no id; this may touch many events");
    }

    let (title, mods) = parse_title_and_mods(args, today)?;
    let mut events = store.load()?;

    let mut changed = 0_u64;
    for event in &mut events {
        if filter.matches(event) {
            if !title.is_empty() {
                event.title = title.clone();
            }
            apply_mods(event, &mods)?;
            changed += 1;
        }
    }

    if changed > 0 {
        store.save(&events)?;
    }

    println!("Modified {changed} event(s).");
    Ok(())
}

#[instrument(skip(store, filter))]
fn cmd_delete(store: &mut EventStore, filter: &Filter) -> anyhow::Result<()> {
    info!("command delete");

    if filter.is_empty() {
        return Err(anyhow!("delete requires a filter"));
    }
    if !filter.has_identity_selector() {
        warn!("delete filter names no id; this may remove many events");
    }

    let mut events = store.load()?;
    let before = events.len();
    events.retain(|event| !filter.matches(event));
    let removed = before - events.len();

    if removed > 0 {
        store.save(&events)?;
    }

    println!("Deleted {removed} event(s).");
    Ok(())
}

#[instrument(skip(store, filter))]
fn cmd_set_status(store: &mut EventStore, filter: &Filter, status: Status) -> anyhow::Result<()> {
    info!(status = status.label(), "command status change");

    if filter.is_empty() {
        return Err(anyhow!("status change requires a filter"));
    }

    let mut events = store.load()?;
    let mut changed = 0_u64;
    for event in &mut events {
        if filter.matches(event) {
            event.status = status;
            changed += 1;
        }
    }

    if changed > 0 {
        store.save(&events)?;
    }

    println!("Marked {changed} event(s) {}.", status.label());
    Ok(())
}

#[instrument(skip(store, renderer, filter))]
fn cmd_list(store: &mut EventStore, renderer: &mut Renderer, filter: &Filter) -> anyhow::Result<()> {
    info!("command list");

    let mut events: Vec<Event> = store
        .load()?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();
    events.sort_by_key(|event| (event.start_date, event.id));

    let refs: Vec<&Event> = events.iter().collect();
    renderer.print_event_table(&refs)?;
    Ok(())
}

#[instrument(skip(store, renderer, filter))]
fn cmd_info(store: &mut EventStore, renderer: &mut Renderer, filter: &Filter) -> anyhow::Result<()> {
    info!("command info");

    if filter.is_empty() {
        return Err(anyhow!("info requires a filter"));
    }

    let events = store.load()?;
    let mut shown = 0;
    for event in events.iter().filter(|event| filter.matches(event)) {
        if shown > 0 {
            println!();
        }
        renderer.print_event_info(event)?;
        shown += 1;
    }

    if shown == 0 {
        return Err(anyhow!("no matching events"));
    }
    Ok(())
}

/// View argument parsing: a bare period token (`day`/`week`/`month`)
/// and/or a date expression anchoring the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Period {
    Day,
    Week,
    Month,
}

fn parse_view_args(
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<(NaiveDate, Option<Period>)> {
    let mut reference = today;
    let mut period = None;

    for arg in args {
        match arg.to_ascii_lowercase().as_str() {
            "day" => period = Some(Period::Day),
            "week" => period = Some(Period::Week),
            "month" => period = Some(Period::Month),
            other => reference = parse_date_expr(other, today)?,
        }
    }

    Ok((reference, period))
}

#[instrument(skip(store, renderer, filter, args, today))]
fn cmd_month(
    store: &mut EventStore,
    renderer: &mut Renderer,
    filter: &Filter,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command month");

    let (reference, _) = parse_view_args(args, today)?;
    let events: Vec<Event> = store
        .load()?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();

    let weeks = month_grid(reference, today);
    renderer.print_month(&weeks, &events, DEFAULT_MAX_VISIBLE)?;
    Ok(())
}

#[instrument(skip(store, cfg, renderer, filter, args, today, now_time))]
#[allow(clippy::too_many_arguments)]
fn cmd_time_grid(
    store: &mut EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    filter: &Filter,
    args: &[String],
    today: NaiveDate,
    now_time: NaiveTime,
    work_week_only: bool,
) -> anyhow::Result<()> {
    info!(work_week_only, "command week");

    let (reference, _) = parse_view_args(args, today)?;
    let days = week_days(reference, work_week_only);
    print_grid_for_days(store, cfg, renderer, filter, &days, today, now_time)
}

#[instrument(skip(store, cfg, renderer, filter, args, today, now_time))]
fn cmd_day(
    store: &mut EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    filter: &Filter,
    args: &[String],
    today: NaiveDate,
    now_time: NaiveTime,
) -> anyhow::Result<()> {
    info!("command day");

    let (reference, _) = parse_view_args(args, today)?;
    print_grid_for_days(store, cfg, renderer, filter, &[reference], today, now_time)
}

fn print_grid_for_days(
    store: &mut EventStore,
    cfg: &Config,
    renderer: &mut Renderer,
    filter: &Filter,
    days: &[NaiveDate],
    today: NaiveDate,
    now_time: NaiveTime,
) -> anyhow::Result<()> {
    let events: Vec<Event> = store
        .load()?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();

    let (start_hour, end_hour) = cfg.day_hours();
    let interval = cfg.slot_interval();
    let slots = classified_slots(start_hour, end_hour, interval, &cfg.working_hours());

    renderer.print_time_grid(
        days,
        &slots,
        &events,
        &cfg.working_days(),
        today,
        now_time,
        interval,
    )?;
    Ok(())
}

/// Group span events per day by their start date, each day's list
/// ordered by start time.
fn group_agenda<'a>(events: &'a [Event], span: TimelineSpan) -> Vec<(NaiveDate, Vec<&'a Event>)> {
    let mut groups: BTreeMap<NaiveDate, Vec<&Event>> = BTreeMap::new();
    for event in events {
        if event.start_date >= span.start && event.start_date <= span.end {
            groups.entry(event.start_date).or_default().push(event);
        }
    }

    let mut out: Vec<(NaiveDate, Vec<&Event>)> = groups.into_iter().collect();
    for (_, day_events) in &mut out {
        day_events.sort_by_key(|event| (event.start_time, event.id));
    }
    out
}

#[instrument(skip(store, renderer, filter, args, today))]
fn cmd_agenda(
    store: &mut EventStore,
    renderer: &mut Renderer,
    filter: &Filter,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command agenda");

    let (reference, period) = parse_view_args(args, today)?;
    let span = match period.unwrap_or(Period::Week) {
        Period::Day => TimelineSpan::day(reference),
        Period::Week => TimelineSpan::week(reference),
        Period::Month => TimelineSpan::month(reference),
    };

    let events: Vec<Event> = store
        .load()?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();

    let groups = group_agenda(&events, span);
    renderer.print_agenda(&groups)?;
    Ok(())
}

#[instrument(skip(store, renderer, filter, args, today))]
fn cmd_timeline(
    store: &mut EventStore,
    renderer: &mut Renderer,
    filter: &Filter,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command timeline");

    let (reference, period) = parse_view_args(args, today)?;
    let span = match period.unwrap_or(Period::Week) {
        Period::Day => TimelineSpan::day(reference),
        Period::Week => TimelineSpan::week(reference),
        Period::Month => TimelineSpan::month(reference),
    };

    let events: Vec<Event> = store
        .load()?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();

    let visible = events_in_span(&events, span);
    let rows = pack_rows(visible);
    let positioned: Vec<Vec<(&Event, crate::timeline::SpanPosition)>> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|event| (event, span_position(event, span)))
                .collect()
        })
        .collect();

    renderer.print_timeline(span, &positioned)?;
    Ok(())
}

#[instrument(skip(store, filter))]
fn cmd_export(store: &mut EventStore, filter: &Filter) -> anyhow::Result<()> {
    info!("command export");

    let events: Vec<Event> = store
        .load()?
        .into_iter()
        .filter(|event| filter.matches(event))
        .collect();

    let out = serde_json::to_string(&events)?;
    println!("{out}");
    Ok(())
}

/// Import rows tolerate missing fields; defaults are applied once here,
/// at ingestion, not re-derived per view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportEvent {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    end_date: Option<NaiveDate>,
    #[serde(default, with = "crate::datetime::clock_serde::option")]
    start_time: Option<NaiveTime>,
    #[serde(default, with = "crate::datetime::clock_serde::option")]
    end_time: Option<NaiveTime>,
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    assigned_to: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    is_recurring: bool,
    #[serde(default)]
    recurrence_type: Option<String>,
    #[serde(default)]
    alarm: bool,
    #[serde(default)]
    alarm_time: Option<i64>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

fn normalize_import_item(item: ImportEvent, id: u64, today: NaiveDate) -> Event {
    let start_date = item.start_date.unwrap_or(today);
    let end_date = item.end_date.unwrap_or(start_date).max(start_date);

    Event {
        id,
        title: item.title.unwrap_or_default(),
        description: item.description.unwrap_or_default(),
        start_date,
        end_date,
        start_time: item.start_time,
        end_time: item.end_time,
        status: item.status.unwrap_or(Status::Planned),
        category: item.category.unwrap_or_default(),
        priority: item.priority.unwrap_or_default(),
        assigned_to: item.assigned_to.unwrap_or_default(),
        location: item.location.unwrap_or_default(),
        tags: item.tags,
        is_recurring: item.is_recurring,
        recurrence_type: item.recurrence_type.unwrap_or_default(),
        alarm: item.alarm,
        alarm_time: item.alarm_time,
        extra: item.extra,
    }
}

fn parse_import_items(trimmed: &str) -> anyhow::Result<Vec<ImportEvent>> {
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("failed parsing JSON array");
    }

    if trimmed.starts_with('{')
        && let Ok(item) = serde_json::from_str::<ImportEvent>(trimmed)
    {
        return Ok(vec![item]);
    }

    let mut out = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let item: ImportEvent = serde_json::from_str(token)
            .with_context(|| format!("failed parsing import line {}", idx + 1))?;
        out.push(item);
    }

    if out.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    Ok(out)
}

#[instrument(skip(store, today))]
fn cmd_import(store: &mut EventStore, today: NaiveDate) -> anyhow::Result<()> {
    info!("command import");

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;

    let trimmed = stdin.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("import: empty input"));
    }

    let mut events = store.load()?;
    let imported = parse_import_items(trimmed)?;

    let mut adds = 0_u64;
    let mut mods = 0_u64;
    for item in imported {
        let existing_idx = item
            .id
            .and_then(|id| events.iter().position(|event| event.id == id));

        match existing_idx {
            Some(idx) => {
                let id = events[idx].id;
                events[idx] = normalize_import_item(item, id, today);
                mods += 1;
            }
            None => {
                let id = item.id.unwrap_or_else(|| store.next_id(&events));
                events.push(normalize_import_item(item, id, today));
                events.sort_by_key(|event| event.id);
                adds += 1;
            }
        }
    }

    let imported_count = adds + mods;
    if imported_count > 0 {
        store.save(&events)?;
    }

    println!("Imported {imported_count} event(s).");
    Ok(())
}

fn compute_stats(events: &[Event], today: NaiveDate) -> Vec<(String, String)> {
    let total = events.len();
    let count = |status: Status| events.iter().filter(|e| e.status == status).count();
    let planned = count(Status::Planned);
    let in_progress = count(Status::InProgress);
    let completed = count(Status::Completed);
    let overdue = events
        .iter()
        .filter(|e| e.status == Status::Planned && e.end_date < today)
        .count();
    let due_today = events.iter().filter(|e| e.end_date == today).count();
    let completion = if total == 0 {
        0
    } else {
        (completed as f64 / total as f64 * 100.0).round() as u64
    };

    vec![
        ("total".to_string(), total.to_string()),
        ("planned".to_string(), planned.to_string()),
        ("in-progress".to_string(), in_progress.to_string()),
        ("completed".to_string(), completed.to_string()),
        ("completion".to_string(), format!("{completion}%")),
        ("overdue".to_string(), overdue.to_string()),
        ("due today".to_string(), due_today.to_string()),
    ]
}

#[instrument(skip(store, renderer, today))]
fn cmd_stats(
    store: &mut EventStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command stats");

    let events = store.load()?;
    renderer.print_stats(&compute_stats(&events, today))?;
    Ok(())
}

/// Alarms firing within `[now, now + window]`, completed events
/// excluded. Listing only; nothing is delivered.
fn upcoming_alarms<'a>(
    events: &'a [Event],
    now: NaiveDateTime,
    window_minutes: i64,
) -> Vec<(&'a Event, NaiveDateTime)> {
    let horizon = now + Duration::minutes(window_minutes);
    let mut due: Vec<(&Event, NaiveDateTime)> = events
        .iter()
        .filter(|event| event.status != Status::Completed)
        .filter_map(|event| event.alarm_instant().map(|at| (event, at)))
        .filter(|(_, at)| *at >= now && *at <= horizon)
        .collect();
    due.sort_by_key(|(_, at)| *at);
    due
}

#[instrument(skip(store, args, now))]
fn cmd_alarms(store: &mut EventStore, args: &[String], now: NaiveDateTime) -> anyhow::Result<()> {
    info!("command alarms");

    let window: i64 = match args.first() {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid window (minutes): {raw}"))?,
        None => 60,
    };

    let events = store.load()?;
    let due = upcoming_alarms(&events, now, window);

    if due.is_empty() {
        println!("No reminders in the next {window} minute(s).");
        return Ok(());
    }

    for (event, at) in due {
        let lead = (at - now).num_minutes();
        println!(
            "{:>4}  {}  {} (in {} min)",
            event.id,
            at.format("%H:%M"),
            event.title,
            lead
        );
    }
    Ok(())
}

fn cmd_categories(store: &mut EventStore) -> anyhow::Result<()> {
    let events = store.load()?;
    let distinct: BTreeSet<&str> = events
        .iter()
        .map(|event| event.category.as_str())
        .filter(|c| !c.is_empty())
        .collect();
    for category in distinct {
        println!("{category}");
    }
    Ok(())
}

fn cmd_assignees(store: &mut EventStore) -> anyhow::Result<()> {
    let events = store.load()?;
    let distinct: BTreeSet<&str> = events
        .iter()
        .map(|event| event.assigned_to.as_str())
        .filter(|a| !a.is_empty())
        .collect();
    for assignee in distinct {
        println!("{assignee}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for path in &cfg.loaded_files {
        println!("# loaded {}", path.display());
    }
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: add, modify, delete, done, start, plan, list, info, \
         month, week, workweek, day, agenda, timeline, export, import, stats, alarms, \
         categories, assignees"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        compute_stats, group_agenda, normalize_import_item, parse_import_items,
        parse_title_and_mods, upcoming_alarms,
    };
    use crate::event::{Event, Priority, Status};
    use crate::timeline::TimelineSpan;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mods_split_title_from_keyed_fields() {
        let today = date("2026-08-27");
        let (title, mods) = parse_title_and_mods(
            &args(&[
                "Design",
                "Workshop",
                "start:tomorrow",
                "from:15:30",
                "to:17:00",
                "priority:high",
                "+design",
                "alarm:15",
            ]),
            today,
        )
        .expect("parse mods");

        assert_eq!(title, "Design Workshop");
        assert_eq!(mods.start_date, Some(date("2026-08-28")));
        assert_eq!(mods.priority, Some(Priority::High));
        assert_eq!(mods.add_tags, vec!["design".to_string()]);
        assert_eq!(mods.alarm_minutes, Some(15));
        assert_eq!(
            mods.start_time,
            Some(chrono::NaiveTime::parse_from_str("15:30", "%H:%M").expect("time"))
        );
    }

    #[test]
    fn apply_mods_rejects_inverted_ranges() {
        let today = date("2026-08-27");
        let (_, mods) =
            parse_title_and_mods(&args(&["end:2026-08-20", "start:2026-08-25"]), today)
                .expect("parse mods");

        let mut event = Event::new(1, "x".into(), today);
        assert!(super::apply_mods(&mut event, &mods).is_err());
    }

    #[test]
    fn moving_start_forward_drags_a_stale_end_along() {
        let today = date("2026-08-27");
        let (_, mods) =
            parse_title_and_mods(&args(&["start:2026-09-01"]), today).expect("parse mods");

        let mut event = Event::new(1, "x".into(), today);
        super::apply_mods(&mut event, &mods).expect("apply");
        assert_eq!(event.start_date, date("2026-09-01"));
        assert_eq!(event.end_date, date("2026-09-01"));
    }

    #[test]
    fn agenda_groups_by_start_date_within_span() {
        let span = TimelineSpan::week(date("2026-08-27")); // Aug 23..29
        let mut early = Event::new(1, "early".into(), date("2026-08-24"));
        early.start_time = chrono::NaiveTime::parse_from_str("09:00", "%H:%M").ok();
        let mut late = Event::new(2, "late".into(), date("2026-08-24"));
        late.start_time = chrono::NaiveTime::parse_from_str("08:00", "%H:%M").ok();
        let outside = Event::new(3, "outside".into(), date("2026-09-02"));

        let events = vec![early, late, outside];
        let groups = group_agenda(&events, span);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, date("2026-08-24"));
        let ids: Vec<u64> = groups[0].1.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn stats_count_status_buckets_and_overdue() {
        let today = date("2026-08-27");
        let mut done = Event::new(1, "done".into(), date("2026-08-20"));
        done.status = Status::Completed;
        let mut overdue = Event::new(2, "overdue".into(), date("2026-08-20"));
        overdue.end_date = date("2026-08-21");
        let mut due = Event::new(3, "due".into(), today);
        due.end_date = today;

        let stats = compute_stats(&[done, overdue, due], today);
        let get = |key: &str| {
            stats
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        assert_eq!(get("total"), "3");
        assert_eq!(get("completed"), "1");
        assert_eq!(get("completion"), "33%");
        assert_eq!(get("overdue"), "1");
        assert_eq!(get("due today"), "1");
    }

    #[test]
    fn import_accepts_arrays_objects_and_jsonl() {
        let array = r#"[{"title": "a", "startDate": "2026-08-27"}]"#;
        assert_eq!(parse_import_items(array).expect("array").len(), 1);

        let object = r#"{"title": "a", "startDate": "2026-08-27"}"#;
        assert_eq!(parse_import_items(object).expect("object").len(), 1);

        let jsonl = "{\"title\": \"a\"}\n{\"title\": \"b\"}";
        assert_eq!(parse_import_items(jsonl).expect("jsonl").len(), 2);
    }

    #[test]
    fn import_defaults_are_applied_once_at_ingestion() {
        let today = date("2026-08-27");
        let items = parse_import_items(r#"{"title": "bare"}"#).expect("parse");
        let event =
            normalize_import_item(items.into_iter().next().expect("one item"), 9, today);
        assert_eq!(event.id, 9);
        assert_eq!(event.start_date, today);
        assert_eq!(event.end_date, today);
        assert_eq!(event.status, Status::Planned);
        assert_eq!(event.priority, Priority::Medium);
    }

    #[test]
    fn alarms_respect_the_window_and_skip_completed() {
        let now = date("2026-08-27").and_hms_opt(8, 0, 0).expect("now");

        let mut soon = Event::new(1, "soon".into(), date("2026-08-27"));
        soon.start_time = chrono::NaiveTime::parse_from_str("08:30", "%H:%M").ok();
        soon.alarm = true;
        soon.alarm_time = Some(10);

        let mut done = soon.clone();
        done.id = 2;
        done.status = Status::Completed;

        let mut far = soon.clone();
        far.id = 3;
        far.start_time = chrono::NaiveTime::parse_from_str("12:00", "%H:%M").ok();

        let events = vec![soon, done, far];
        let due = upcoming_alarms(&events, now, 60);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].0.id, 1);
        assert_eq!(due[0].1.format("%H:%M").to_string(), "08:20");
    }
}

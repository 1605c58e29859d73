use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;

/// Parse a user-facing date expression into a concrete calendar date.
///
/// Supported: today/tomorrow/yesterday, weekday names (next occurrence,
/// never the current day), `YYYY-MM-DD`, and relative `+Nd`/`-Nd`.
#[tracing::instrument(fields(input = input))]
pub fn parse_date_expr(input: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }

    if let Some(target) = parse_weekday_name(&lower) {
        return Ok(next_weekday_date(today, target));
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)d?$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    if let Some(caps) = rel_re.captures(token) {
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative day count")?;
        let days = Duration::days(num);
        let sign = caps
            .name("sign")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative sign"))?;
        return Ok(if sign == "-" { today - days } else { today + days });
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Ok(date);
    }

    Err(anyhow!("unrecognized date expression: {input}")).with_context(|| {
        "supported formats: today/tomorrow/yesterday, weekday names (e.g. monday), \
         +Nd/-Nd, YYYY-MM-DD"
    })
}

fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_weekday_date(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_idx = from.weekday().num_days_from_monday() as i64;
    let target_idx = target.num_days_from_monday() as i64;
    let mut delta = (7 + target_idx - from_idx) % 7;
    if delta == 0 {
        delta = 7;
    }
    from.checked_add_signed(Duration::days(delta)).unwrap_or(from)
}

/// Parse a clock token like `15:23`, `9:00am`, or `12:30 PM`.
pub fn parse_clock_time(token: &str) -> Option<NaiveTime> {
    let clock_re = Regex::new(
        r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
    )
    .ok()?;
    let captures = clock_re.captures(token.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        if raw_hour > 23 {
            return None;
        }
        raw_hour
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Resolve the configured IANA timezone id, falling back to UTC.
pub fn resolve_timezone(raw: Option<&str>) -> Tz {
    let Some(raw) = raw else {
        return chrono_tz::UTC;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return chrono_tz::UTC;
    }
    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(timezone = %trimmed, "configured timezone");
            tz
        }
        Err(err) => {
            tracing::error!(timezone = %trimmed, error = %err, "failed to parse timezone id; using UTC");
            chrono_tz::UTC
        }
    }
}

/// Wall-clock date in the configured timezone.
pub fn today_in(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Wall-clock time-of-day in the configured timezone.
pub fn time_in(tz: Tz, now: DateTime<Utc>) -> NaiveTime {
    now.with_timezone(&tz).time()
}

/// Format a clock time for display, honoring the 12/24-hour setting.
#[must_use]
pub fn format_time(time: NaiveTime, format_24h: bool) -> String {
    if format_24h {
        return time.format("%H:%M").to_string();
    }

    let hour = time.hour();
    let ampm = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{}:{:02} {}", display_hour, time.minute(), ampm)
}

/// Format an inclusive date range; a single day collapses to one date
/// and the year is only spelled out when the range crosses a year.
#[must_use]
pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        return start.format("%b %-d, %Y").to_string();
    }
    if start.year() == end.year() {
        return format!("{} - {}", start.format("%b %-d"), end.format("%b %-d, %Y"));
    }
    format!(
        "{} - {}",
        start.format("%b %-d, %Y"),
        end.format("%b %-d, %Y")
    )
}

/// Serde helpers for `HH:MM` clock strings.
pub mod clock_serde {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(t: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match t {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let opt = Option::<String>::deserialize(deserializer)?;
            match opt {
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_date_range, format_time, parse_clock_time, parse_date_expr};

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    fn time(s: &str) -> chrono::NaiveTime {
        chrono::NaiveTime::parse_from_str(s, "%H:%M").expect("valid time literal")
    }

    #[test]
    fn parses_relative_and_named_days() {
        let today = date("2026-02-17");
        assert_eq!(parse_date_expr("today", today).expect("today"), today);
        assert_eq!(
            parse_date_expr("tomorrow", today).expect("tomorrow"),
            date("2026-02-18")
        );
        assert_eq!(
            parse_date_expr("-3d", today).expect("minus three"),
            date("2026-02-14")
        );
        // 2026-02-17 is a Tuesday; next wednesday is the 18th, next
        // tuesday wraps a full week.
        assert_eq!(
            parse_date_expr("wednesday", today).expect("weekday"),
            date("2026-02-18")
        );
        assert_eq!(
            parse_date_expr("tuesday", today).expect("weekday wrap"),
            date("2026-02-24")
        );
    }

    #[test]
    fn parses_iso_dates_and_rejects_noise() {
        let today = date("2026-02-17");
        assert_eq!(
            parse_date_expr("2025-03-01", today).expect("iso"),
            date("2025-03-01")
        );
        assert!(parse_date_expr("someday", today).is_err());
    }

    #[test]
    fn parses_clock_tokens() {
        assert_eq!(parse_clock_time("3:23pm").expect("pm"), time("15:23"));
        assert_eq!(parse_clock_time("12:05am").expect("midnight"), time("00:05"));
        assert_eq!(parse_clock_time("09:00").expect("24h"), time("09:00"));
        assert!(parse_clock_time("25:00").is_none());
        assert!(parse_clock_time("13:00pm").is_none());
    }

    #[test]
    fn formats_times_in_both_conventions() {
        assert_eq!(format_time(time("09:05"), true), "09:05");
        assert_eq!(format_time(time("09:05"), false), "9:05 AM");
        assert_eq!(format_time(time("15:30"), false), "3:30 PM");
        assert_eq!(format_time(time("00:00"), false), "12:00 AM");
    }

    #[test]
    fn formats_date_ranges() {
        assert_eq!(
            format_date_range(date("2025-03-01"), date("2025-03-01")),
            "Mar 1, 2025"
        );
        assert_eq!(
            format_date_range(date("2025-03-01"), date("2025-03-03")),
            "Mar 1 - Mar 3, 2025"
        );
        assert_eq!(
            format_date_range(date("2024-12-30"), date("2025-01-02")),
            "Dec 30, 2024 - Jan 2, 2025"
        );
    }
}

//! Period time windows: which period is running, which is about to start,
//! and when the next school day begins.

use crate::model::SchedulePeriod;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_UPCOMING_WINDOW_MINUTES: i64 = 30;
pub const DEFAULT_NEXT_DAY_SCAN_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("period {index}: name must not be empty")]
    EmptyName { index: usize },
    #[error("period {period}: invalid time {value:?} (expected HH:MM)")]
    InvalidTime { period: String, value: String },
    #[error("period {period}: end must be after start")]
    EndNotAfterStart { period: String },
    #[error("period {period}: unknown weekday {value:?}")]
    UnknownWeekday { period: String, value: String },
    #[error("period {period}: at least one weekday is required")]
    NoWeekdays { period: String },
    #[error("periods {first} and {second} overlap on {weekday}")]
    Overlap {
        first: String,
        second: String,
        weekday: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub name: String,
    /// Minute of day.
    pub start: u32,
    /// Minute of day.
    pub end: u32,
    pub weekdays: Vec<Weekday>,
}

impl Period {
    pub fn from_record(index: usize, rec: &SchedulePeriod) -> Result<Self, ScheduleError> {
        let name = rec.name.trim();
        if name.is_empty() {
            return Err(ScheduleError::EmptyName { index });
        }
        let start = parse_time(&rec.start).ok_or_else(|| ScheduleError::InvalidTime {
            period: name.to_string(),
            value: rec.start.clone(),
        })?;
        let end = parse_time(&rec.end).ok_or_else(|| ScheduleError::InvalidTime {
            period: name.to_string(),
            value: rec.end.clone(),
        })?;
        if end <= start {
            return Err(ScheduleError::EndNotAfterStart {
                period: name.to_string(),
            });
        }
        let mut weekdays = Vec::with_capacity(rec.weekdays.len());
        for raw in &rec.weekdays {
            let day = parse_weekday(raw).ok_or_else(|| ScheduleError::UnknownWeekday {
                period: name.to_string(),
                value: raw.clone(),
            })?;
            if !weekdays.contains(&day) {
                weekdays.push(day);
            }
        }
        if weekdays.is_empty() {
            return Err(ScheduleError::NoWeekdays {
                period: name.to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            start,
            end,
            weekdays,
        })
    }

    pub fn runs_on(&self, day: Weekday) -> bool {
        self.weekdays.contains(&day)
    }
}

/// `H:MM` or `HH:MM` to minute of day.
pub fn parse_time(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    if h >= 24 || m >= 60 {
        return None;
    }
    Some(h * 60 + m)
}

pub fn format_time(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

pub fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "sun" | "sunday" => Some(Weekday::Sun),
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        _ => None,
    }
}

pub fn weekday_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sun",
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
    }
}

/// Parses every record and rejects same-weekday overlaps. Touching periods
/// (one ends the minute the next starts) are allowed.
pub fn validate_schedule(records: &[SchedulePeriod]) -> Result<Vec<Period>, ScheduleError> {
    let periods = records
        .iter()
        .enumerate()
        .map(|(i, r)| Period::from_record(i, r))
        .collect::<Result<Vec<_>, _>>()?;

    for (i, a) in periods.iter().enumerate() {
        for b in &periods[i + 1..] {
            if a.start < b.end && b.start < a.end {
                if let Some(day) = a.weekdays.iter().find(|d| b.runs_on(**d)) {
                    return Err(ScheduleError::Overlap {
                        first: a.name.clone(),
                        second: b.name.clone(),
                        weekday: weekday_abbrev(*day).to_string(),
                    });
                }
            }
        }
    }
    Ok(periods)
}

/// Best-effort parse of stored periods; records that no longer parse are
/// skipped so one bad entry does not blank the whole schedule.
pub fn load_periods(records: &[SchedulePeriod]) -> Vec<Period> {
    records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| match Period::from_record(i, r) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable schedule period");
                None
            }
        })
        .collect()
}

pub fn format_time_remaining(minutes: i64) -> String {
    if minutes < 1 {
        "less than 1 min".to_string()
    } else if minutes < 60 {
        format!("{} min", minutes)
    } else {
        let hours = minutes / 60;
        let mins = minutes % 60;
        if mins > 0 {
            format!("{}h {}min", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}

pub fn format_countdown(seconds: i64) -> String {
    let s = seconds.max(0);
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

/// `Monday, September 9, 2024 • 9:05:07 AM`
pub fn format_clock(now: NaiveDateTime) -> String {
    now.format("%A, %B %-d, %Y • %-I:%M:%S %p").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodState {
    Active,
    Upcoming,
    Later,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatus {
    pub name: String,
    pub start: String,
    pub end: String,
    pub state: PeriodState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_in_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStart {
    pub date: String,
    pub weekday: String,
    pub days_ahead: i64,
    pub period: String,
    pub start: String,
    pub starts_in_seconds: i64,
    pub starts_in_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    pub weekday: String,
    pub clock: String,
    pub periods: Vec<PeriodStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_period_today: Option<NextStart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_school_day: Option<NextStart>,
}

impl ScheduleStatus {
    pub fn active(&self) -> Option<&PeriodStatus> {
        self.periods.iter().find(|p| p.state == PeriodState::Active)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub upcoming_window_minutes: i64,
    pub next_day_scan_days: i64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            upcoming_window_minutes: DEFAULT_UPCOMING_WINDOW_MINUTES,
            next_day_scan_days: DEFAULT_NEXT_DAY_SCAN_DAYS,
        }
    }
}

fn next_start(now: NaiveDateTime, date: NaiveDate, period: &Period) -> NextStart {
    let start_at =
        date.and_time(NaiveTime::default()) + Duration::minutes(i64::from(period.start));
    let seconds = (start_at - now).num_seconds();
    NextStart {
        date: date.format("%Y-%m-%d").to_string(),
        weekday: weekday_abbrev(date.weekday()).to_string(),
        days_ahead: (date - now.date()).num_days(),
        period: period.name.clone(),
        start: format_time(period.start),
        starts_in_seconds: seconds,
        starts_in_label: format_time_remaining(seconds / 60),
    }
}

/// Evaluates the schedule at `now`.
///
/// Boundaries are inclusive at minute resolution: a 09:00–10:00 period is
/// active from 09:00:00 through 10:00:59, counting down to zero at 10:00.
pub fn evaluate(periods: &[Period], now: NaiveDateTime, opts: &EvalOptions) -> ScheduleStatus {
    let today = now.weekday();
    let now_minute = now.hour() * 60 + now.minute();
    let now_second_of_day = i64::from(now.num_seconds_from_midnight());

    let mut todays: Vec<&Period> = periods.iter().filter(|p| p.runs_on(today)).collect();
    todays.sort_by_key(|p| (p.start, p.end));

    let statuses: Vec<PeriodStatus> = todays
        .iter()
        .map(|p| {
            let mut status = PeriodStatus {
                name: p.name.clone(),
                start: format_time(p.start),
                end: format_time(p.end),
                state: PeriodState::Finished,
                remaining_seconds: None,
                remaining_minutes: None,
                remaining_label: None,
                countdown: None,
                starts_in_minutes: None,
            };
            if p.start <= now_minute && now_minute <= p.end {
                let remaining = (i64::from(p.end) * 60 - now_second_of_day).max(0);
                status.state = PeriodState::Active;
                status.remaining_seconds = Some(remaining);
                status.remaining_minutes = Some(remaining / 60);
                status.remaining_label = Some(format_time_remaining(remaining / 60));
                status.countdown = Some(format_countdown(remaining));
            } else if now_minute < p.start {
                let until = i64::from(p.start - now_minute);
                status.state = if until <= opts.upcoming_window_minutes {
                    PeriodState::Upcoming
                } else {
                    PeriodState::Later
                };
                status.starts_in_minutes = Some(until);
            }
            status
        })
        .collect();

    let busy = statuses
        .iter()
        .any(|s| matches!(s.state, PeriodState::Active | PeriodState::Upcoming));
    let past_last = todays
        .iter()
        .map(|p| p.end)
        .max()
        .map(|last_end| now_minute > last_end)
        .unwrap_or(true);

    let mut next_period_today = None;
    let mut next_school_day = None;
    if !busy {
        if past_last {
            next_school_day = find_next_school_day(periods, now, opts.next_day_scan_days);
        } else if let Some(p) = todays.iter().find(|p| p.start > now_minute) {
            next_period_today = Some(next_start(now, now.date(), p));
        }
    }

    ScheduleStatus {
        weekday: weekday_abbrev(today).to_string(),
        clock: format_clock(now),
        periods: statuses,
        next_period_today,
        next_school_day,
    }
}

/// Scans forward from tomorrow for the first day with at least one period.
pub fn find_next_school_day(
    periods: &[Period],
    now: NaiveDateTime,
    scan_days: i64,
) -> Option<NextStart> {
    (1..=scan_days).find_map(|offset| {
        let date = now.date() + Duration::days(offset);
        let day = date.weekday();
        periods
            .iter()
            .filter(|p| p.runs_on(day))
            .min_by_key(|p| p.start)
            .map(|first| next_start(now, date, first))
    })
}

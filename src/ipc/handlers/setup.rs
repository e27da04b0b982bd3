use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::listing::SortMethod;
use crate::schedule::{self, EvalOptions};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Schedule,
    Assignments,
    Grades,
}

const ALL_SECTIONS: [SetupSection; 3] = [
    SetupSection::Schedule,
    SetupSection::Assignments,
    SetupSection::Grades,
];

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "schedule" => Some(Self::Schedule),
            "assignments" => Some(Self::Assignments),
            "grades" => Some(Self::Grades),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Assignments => "assignments",
            Self::Grades => "grades",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Schedule => "setup.schedule",
            Self::Assignments => "setup.assignments",
            Self::Grades => "setup.grades",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Schedule => json!({
            "upcomingWindowMinutes": schedule::DEFAULT_UPCOMING_WINDOW_MINUTES,
            "pollIntervalSeconds": 60,
            "nextDayScanDays": schedule::DEFAULT_NEXT_DAY_SCAN_DAYS
        }),
        SetupSection::Assignments => json!({
            "defaultDueTime": "23:59",
            "defaultSort": SortMethod::default().as_str()
        }),
        SetupSection::Grades => json!({
            "displayDecimals": 2
        }),
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_clock_time(v: &Value, key: &str) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let minutes = schedule::parse_time(s).ok_or_else(|| format!("{} must be HH:MM", key))?;
    Ok(schedule::format_time(minutes))
}

fn parse_sort(v: &Value, key: &str) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    SortMethod::parse(s)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| format!("{} is not a known sort method", key))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Schedule => match k.as_str() {
                "upcomingWindowMinutes" => {
                    obj.insert(k.clone(), json!(parse_i64_range(v, k, 0, 240)?));
                }
                "pollIntervalSeconds" => {
                    obj.insert(k.clone(), json!(parse_i64_range(v, k, 1, 3600)?));
                }
                "nextDayScanDays" => {
                    obj.insert(k.clone(), json!(parse_i64_range(v, k, 1, 14)?));
                }
                _ => return Err(format!("unknown schedule field: {}", k)),
            },
            SetupSection::Assignments => match k.as_str() {
                "defaultDueTime" => {
                    obj.insert(k.clone(), json!(parse_clock_time(v, k)?));
                }
                "defaultSort" => {
                    obj.insert(k.clone(), json!(parse_sort(v, k)?));
                }
                _ => return Err(format!("unknown assignments field: {}", k)),
            },
            SetupSection::Grades => match k.as_str() {
                "displayDecimals" => {
                    obj.insert(k.clone(), json!(parse_i64_range(v, k, 0, 4)?));
                }
                _ => return Err(format!("unknown grades field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Fields are applied one at a time; a bad stored value keeps its default.
            for (k, v) in saved_obj {
                let mut one = Map::new();
                one.insert(k.clone(), v.clone());
                if let Err(e) = merge_section_patch(section, &mut current, &one) {
                    tracing::warn!(section = section.name(), error = %e, "ignoring stored setting");
                }
            }
        }
    }
    Ok(current)
}

fn section_i64(section: &Value, key: &str, fallback: i64) -> i64 {
    section.get(key).and_then(|v| v.as_i64()).unwrap_or(fallback)
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleSettings {
    pub eval: EvalOptions,
    pub poll_interval_seconds: i64,
}

pub fn schedule_settings(conn: &Connection) -> Result<ScheduleSettings, HandlerErr> {
    let s = load_section(conn, SetupSection::Schedule).map_err(HandlerErr::query)?;
    Ok(ScheduleSettings {
        eval: EvalOptions {
            upcoming_window_minutes: section_i64(
                &s,
                "upcomingWindowMinutes",
                schedule::DEFAULT_UPCOMING_WINDOW_MINUTES,
            ),
            next_day_scan_days: section_i64(
                &s,
                "nextDayScanDays",
                schedule::DEFAULT_NEXT_DAY_SCAN_DAYS,
            ),
        },
        poll_interval_seconds: section_i64(&s, "pollIntervalSeconds", 60),
    })
}

#[derive(Debug, Clone)]
pub struct AssignmentSettings {
    pub default_due_time: String,
    pub default_sort: SortMethod,
}

pub fn assignment_settings(conn: &Connection) -> Result<AssignmentSettings, HandlerErr> {
    let s = load_section(conn, SetupSection::Assignments).map_err(HandlerErr::query)?;
    Ok(AssignmentSettings {
        default_due_time: s
            .get("defaultDueTime")
            .and_then(|v| v.as_str())
            .unwrap_or("23:59")
            .to_string(),
        default_sort: s
            .get("defaultSort")
            .and_then(|v| v.as_str())
            .and_then(SortMethod::parse)
            .unwrap_or_default(),
    })
}

pub fn display_decimals(conn: &Connection) -> Result<u32, HandlerErr> {
    let s = load_section(conn, SetupSection::Grades).map_err(HandlerErr::query)?;
    Ok(section_i64(&s, "displayDecimals", 2).clamp(0, 4) as u32)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let mut out = Map::new();
    for section in ALL_SECTIONS {
        let value = load_section(conn, section).map_err(HandlerErr::query)?;
        out.insert(section.name().to_string(), value);
    }
    tracing::debug!("setup.get");
    Ok(ok(&req.id, Value::Object(out)))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return Err(HandlerErr::bad_params("missing section"));
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return Err(HandlerErr::bad_params("unknown section"));
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("patch must be an object"));
    };

    let mut current = load_section(conn, section).map_err(HandlerErr::query)?;
    merge_section_patch(section, &mut current, patch_obj).map_err(HandlerErr::bad_params)?;
    db::settings_set_json(conn, section.key(), &current).map_err(HandlerErr::update)?;
    tracing::info!(section = section.name(), "setup updated");
    Ok(ok(&req.id, json!({ "section": section.name(), "value": current })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

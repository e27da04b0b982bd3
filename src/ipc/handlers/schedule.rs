use crate::ipc::error::ok;
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{parse_now, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::SchedulePeriod;
use crate::schedule;
use crate::store;
use serde_json::{json, Value};

fn handle_schedule_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let periods = store::load_schedule(conn).map_err(HandlerErr::query)?;
    Ok(ok(&req.id, json!({ "periods": periods })))
}

fn handle_schedule_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(raw) = req.params.get("periods") else {
        return Err(HandlerErr::bad_params("missing periods"));
    };
    let records: Vec<SchedulePeriod> = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid periods: {}", e)))?;
    let parsed =
        schedule::validate_schedule(&records).map_err(|e| HandlerErr::validation(e.to_string()))?;

    // Store the canonical spelling of times and weekdays.
    let normalized: Vec<SchedulePeriod> = parsed
        .iter()
        .map(|p| SchedulePeriod {
            name: p.name.clone(),
            start: schedule::format_time(p.start),
            end: schedule::format_time(p.end),
            weekdays: p
                .weekdays
                .iter()
                .map(|d| schedule::weekday_abbrev(*d).to_string())
                .collect(),
        })
        .collect();
    store::save_schedule(conn, &normalized).map_err(HandlerErr::update)?;

    tracing::info!(periods = normalized.len(), "schedule saved");
    Ok(ok(&req.id, json!({ "periods": normalized })))
}

fn handle_schedule_status(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let now = parse_now(&req.params)?;
    let settings = setup::schedule_settings(conn)?;
    let records = store::load_schedule(conn).map_err(HandlerErr::query)?;
    let periods = schedule::load_periods(&records);
    let status = schedule::evaluate(&periods, now, &settings.eval);

    tracing::debug!(
        now = %now,
        active = status.active().map(|p| p.name.as_str()).unwrap_or("-"),
        "schedule.status"
    );
    let mut result = json!(status);
    result["pollIntervalSeconds"] = json!(settings.poll_interval_seconds);
    Ok(ok(&req.id, result))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "schedule.get" => handle_schedule_get(state, req),
        "schedule.save" => handle_schedule_save(state, req),
        "schedule.status" => handle_schedule_status(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

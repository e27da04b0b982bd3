use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_number, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::GradeBand;
use crate::store;
use serde_json::{json, Value};

fn handle_grading_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let bands = store::load_grading_scheme(conn).map_err(HandlerErr::query)?;
    Ok(ok(&req.id, json!({ "bands": bands })))
}

fn handle_grading_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(raw) = req.params.get("bands") else {
        return Err(HandlerErr::bad_params("missing bands"));
    };
    let bands: Vec<GradeBand> = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid bands: {}", e)))?;
    let bands: Vec<GradeBand> = bands
        .into_iter()
        .map(|b| GradeBand {
            letter: b.letter.trim().to_string(),
            ..b
        })
        .collect();
    calc::validate_grading_scheme(&bands).map_err(|e| HandlerErr::validation(e.to_string()))?;
    store::save_grading_scheme(conn, &bands).map_err(HandlerErr::update)?;

    tracing::info!(bands = bands.len(), "grading scheme saved");
    Ok(ok(&req.id, json!({ "bands": bands })))
}

fn handle_grading_letter(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let Some(percent) = get_number(&req.params, "percent")? else {
        return Err(HandlerErr::bad_params("missing percent"));
    };
    let bands = store::load_grading_scheme(conn).map_err(HandlerErr::query)?;
    let band = calc::resolve_band(&bands, percent);
    Ok(ok(
        &req.id,
        json!({
            "percent": percent,
            "letter": calc::letter_grade(&bands, percent),
            "gpaValue": band.map(|b| b.gpa_value),
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grading.get" => handle_grading_get(state, req),
        "grading.save" => handle_grading_save(state, req),
        "grading.letter" => handle_grading_letter(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

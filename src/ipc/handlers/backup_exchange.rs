use crate::backup;
use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::handlers::weights;
use crate::ipc::helpers::{get_bool, get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::DataBundle;
use crate::schedule;
use crate::store;
use serde_json::{json, Value};
use std::path::PathBuf;

fn bundle_counts(bundle: &DataBundle) -> Value {
    json!({
        "classes": bundle.classes.len(),
        "assignments": bundle.assignments.values().map(Vec::len).sum::<usize>(),
        "weightedClasses": bundle.category_weights.len(),
        "periods": bundle.schedule.len(),
        "gradeBands": bundle.grading_scheme.as_ref().map(Vec::len),
    })
}

/// Runs an incoming bundle through the same rules the individual saves use.
fn validate_bundle(bundle: &DataBundle) -> Result<(), HandlerErr> {
    for (class_name, map) in &bundle.category_weights {
        for (category, weight) in map {
            weights::check_weight(category, *weight).map_err(|e| {
                HandlerErr::validation(format!("{}: {}", class_name, e.message))
                    .with_details(json!({ "className": class_name, "category": category }))
            })?;
        }
    }
    for (class_name, list) in &bundle.assignments {
        for a in list {
            if let Some(grade) = a.grade {
                if !(0.0..=100.0).contains(&grade) {
                    return Err(HandlerErr::validation(format!(
                        "{}: grade for {} must be between 0 and 100",
                        class_name, a.title
                    )));
                }
            }
        }
    }
    if let Some(bands) = &bundle.grading_scheme {
        calc::validate_grading_scheme(bands)
            .map_err(|e| HandlerErr::validation(format!("grading scheme: {}", e)))?;
    }
    schedule::validate_schedule(&bundle.schedule)
        .map_err(|e| HandlerErr::validation(format!("schedule: {}", e)))?;
    Ok(())
}

fn handle_data_export(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let out_path = get_required_str(&req.params, "outPath")?;

    let bundle = store::load_bundle(conn).map_err(HandlerErr::query)?;
    let data = serde_json::to_value(&bundle).map_err(HandlerErr::query)?;
    let export = backup::export_data_bundle(&data, &PathBuf::from(&out_path)).map_err(|e| {
        HandlerErr::new("io_failed", e.to_string()).with_details(json!({ "path": out_path }))
    })?;

    tracing::info!(path = %out_path, "data exported");
    Ok(ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dataSha256": export.data_sha256,
            "counts": bundle_counts(&bundle),
        }),
    ))
}

fn handle_data_import(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let in_path = get_required_str(&req.params, "inPath")?;
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::not_found("import file not found")
            .with_details(json!({ "path": in_path })));
    }

    let import = backup::read_data_bundle(&src).map_err(|e| {
        HandlerErr::validation(e.to_string()).with_details(json!({ "path": in_path }))
    })?;
    let bundle: DataBundle = serde_json::from_value(import.data)
        .map_err(|e| HandlerErr::validation(format!("invalid data format: {}", e)))?;
    validate_bundle(&bundle)?;
    let counts = bundle_counts(&bundle);

    // Import overwrites everything, so it needs an explicit go-ahead.
    if !get_bool(&req.params, "confirm") {
        return Err(HandlerErr::new(
            "confirm_required",
            "importing replaces all classes, assignments, weights, schedule and grading scheme",
        )
        .with_details(json!({
            "bundleFormatDetected": import.bundle_format_detected,
            "counts": counts,
        })));
    }

    store::replace_all(conn, &bundle).map_err(HandlerErr::update)?;

    tracing::info!(path = %in_path, format = %import.bundle_format_detected, "data imported");
    Ok(ok(
        &req.id,
        json!({
            "bundleFormatDetected": import.bundle_format_detected,
            "counts": counts,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "data.export" => handle_data_export(state, req),
        "data.import" => handle_data_import(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

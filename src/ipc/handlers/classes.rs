use crate::ipc::error::ok;
use crate::ipc::helpers::{get_opt_str, get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::ClassRecord;
use crate::store;
use serde_json::{json, Value};

fn handle_classes_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let classes = store::load_classes(conn).map_err(HandlerErr::query)?;
    let assignments = store::load_assignments(conn).map_err(HandlerErr::query)?;

    let rows: Vec<Value> = classes
        .iter()
        .map(|c| {
            let list = assignments.get(&c.name).map(Vec::as_slice).unwrap_or(&[]);
            json!({
                "id": c.id,
                "name": c.name,
                "teacher": c.teacher,
                "room": c.room,
                "period": c.period,
                "assignmentCount": list.len(),
                "openCount": list.iter().filter(|a| !a.completed).count(),
            })
        })
        .collect();
    tracing::debug!(count = rows.len(), "classes.list");
    Ok(ok(&req.id, json!({ "classes": rows })))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let name = get_required_str(&req.params, "name")?;
    let teacher = get_opt_str(&req.params, "teacher")?.unwrap_or_default();
    let room = get_opt_str(&req.params, "room")?.unwrap_or_default();
    let period = get_opt_str(&req.params, "period")?.unwrap_or_default();

    let mut classes = store::load_classes(conn).map_err(HandlerErr::query)?;
    if classes.iter().any(|c| c.name == name) {
        return Err(HandlerErr::new(
            "duplicate",
            format!("a class named {} already exists", name),
        ));
    }

    // Ids are creation timestamps; bump past the newest so two creates in
    // the same millisecond stay distinct.
    let now_ms = chrono::Utc::now().timestamp_millis();
    let newest = classes.iter().map(|c| c.id).max().unwrap_or(0);
    let record = ClassRecord {
        name,
        teacher,
        room,
        period,
        id: now_ms.max(newest + 1),
    };
    classes.push(record.clone());
    store::save_classes(conn, &classes).map_err(HandlerErr::update)?;

    tracing::info!(class = %record.name, id = record.id, "class created");
    Ok(ok(&req.id, json!({ "class": record })))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let name = get_required_str(&req.params, "name")?;
    let Some(summary) = store::delete_class_cascade(conn, &name).map_err(HandlerErr::update)?
    else {
        return Err(HandlerErr::not_found(format!("class not found: {}", name)));
    };

    tracing::info!(
        class = %name,
        assignments = summary.assignments_removed,
        weights = summary.weights_removed,
        "class deleted"
    );
    Ok(ok(
        &req.id,
        json!({
            "deleted": name,
            "assignmentsRemoved": summary.assignments_removed,
            "weightsRemoved": summary.weights_removed,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "classes.list" => handle_classes_list(state, req),
        "classes.create" => handle_classes_create(state, req),
        "classes.delete" => handle_classes_delete(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

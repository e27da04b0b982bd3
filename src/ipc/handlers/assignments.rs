use crate::ipc::error::ok;
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{
    get_grade, get_number, get_opt_str, get_required_str, parse_now, require_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::listing::{self, SortMethod};
use crate::model::{Assignment, AssignmentsByClass, StatusNote};
use crate::pastdue;
use crate::store;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

fn require_class(conn: &Connection, class_name: &str) -> Result<(), HandlerErr> {
    let classes = store::load_classes(conn).map_err(HandlerErr::query)?;
    if classes.iter().any(|c| c.name == class_name) {
        Ok(())
    } else {
        Err(HandlerErr::not_found(format!("class not found: {}", class_name)))
    }
}

fn find_mut<'a>(
    all: &'a mut AssignmentsByClass,
    class_name: &str,
    id: &str,
) -> Result<&'a mut Assignment, HandlerErr> {
    all.get_mut(class_name)
        .and_then(|list| list.iter_mut().find(|a| a.id == id))
        .ok_or_else(|| HandlerErr::not_found(format!("assignment not found: {}", id)))
}

/// Normalizes a due value to `YYYY-MM-DDTHH:MM`. A bare date takes the
/// configured default due time.
fn normalize_due(raw: &str, default_time: &str) -> Result<String, HandlerErr> {
    let raw = raw.trim();
    let candidate = if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        format!("{}T{}", raw, default_time)
    } else {
        raw.to_string()
    };
    pastdue::parse_due(&candidate)
        .map(|d| d.format("%Y-%m-%dT%H:%M").to_string())
        .ok_or_else(|| HandlerErr::validation("due must be YYYY-MM-DD or YYYY-MM-DDTHH:MM"))
}

fn assignment_row(a: &Assignment, now: chrono::NaiveDateTime) -> Value {
    let mut row = json!(a);
    row["pastDue"] = json!(!a.completed && pastdue::is_past_due(a, now));
    row["statusLabel"] = json!(a.status_note.map(StatusNote::label));
    row
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    require_class(conn, &class_name)?;
    let now = parse_now(&req.params)?;
    let search = get_opt_str(&req.params, "search")?.unwrap_or_default();
    let sort = match get_opt_str(&req.params, "sort")? {
        Some(s) => SortMethod::parse(&s)
            .ok_or_else(|| HandlerErr::bad_params(format!("unknown sort method: {}", s)))?,
        None => setup::assignment_settings(conn)?.default_sort,
    };

    let all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let list = all.get(&class_name).map(Vec::as_slice).unwrap_or(&[]);
    let rows: Vec<Value> = listing::filter_and_sort(list, &search, sort)
        .iter()
        .map(|a| assignment_row(a, now))
        .collect();

    tracing::debug!(class = %class_name, count = rows.len(), "assignments.list");
    Ok(ok(
        &req.id,
        json!({
            "className": class_name,
            "sort": sort.as_str(),
            "total": list.len(),
            "assignments": rows,
        }),
    ))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    require_class(conn, &class_name)?;
    let title = get_required_str(&req.params, "title")?;
    let category = get_required_str(&req.params, "category")?;
    let due_raw = get_required_str(&req.params, "due")?;
    let Some(points) = get_number(&req.params, "points")? else {
        return Err(HandlerErr::bad_params("missing points"));
    };
    if points <= 0.0 {
        return Err(HandlerErr::validation("points must be greater than 0"));
    }
    let link = get_opt_str(&req.params, "link")?.unwrap_or_default();

    let weights = store::load_weights(conn).map_err(HandlerErr::query)?;
    let known = weights
        .get(&class_name)
        .map(|m| m.contains_key(&category))
        .unwrap_or(false);
    if !known {
        return Err(HandlerErr::validation(format!(
            "category {} has no weight in {}",
            category, class_name
        )));
    }

    let settings = setup::assignment_settings(conn)?;
    let due = normalize_due(&due_raw, &settings.default_due_time)?;

    let assignment = Assignment {
        id: Uuid::new_v4().to_string(),
        title,
        class: class_name.clone(),
        category,
        due,
        points,
        completed: false,
        grade: None,
        link,
        status_note: None,
    };
    let mut all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    all.entry(class_name.clone())
        .or_default()
        .push(assignment.clone());
    store::save_assignments(conn, &all).map_err(HandlerErr::update)?;

    tracing::info!(class = %class_name, id = %assignment.id, "assignment created");
    Ok(ok(&req.id, json!({ "assignment": assignment })))
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    let id = get_required_str(&req.params, "id")?;

    let mut all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let Some(list) = all.get_mut(&class_name) else {
        return Err(HandlerErr::not_found(format!("assignment not found: {}", id)));
    };
    let before = list.len();
    list.retain(|a| a.id != id);
    if list.len() == before {
        return Err(HandlerErr::not_found(format!("assignment not found: {}", id)));
    }
    store::save_assignments(conn, &all).map_err(HandlerErr::update)?;

    tracing::info!(class = %class_name, id = %id, "assignment deleted");
    Ok(ok(&req.id, json!({ "deleted": id })))
}

/// Shared by complete and editGrade. `want_completed` is the state the
/// assignment must already be in.
fn set_grade(req: &Request, conn: &Connection, want_completed: bool) -> Result<Value, HandlerErr> {
    let class_name = get_required_str(&req.params, "className")?;
    let id = get_required_str(&req.params, "id")?;
    let grade = get_grade(&req.params, "grade")?;

    let mut all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let a = find_mut(&mut all, &class_name, &id)?;
    if a.completed != want_completed {
        let msg = if want_completed {
            "assignment is not completed yet"
        } else {
            "assignment is already completed"
        };
        return Err(HandlerErr::validation(msg));
    }
    let cleared = a.status_note.is_some();
    pastdue::record_grade(a, grade);
    let updated = a.clone();
    store::save_assignments(conn, &all).map_err(HandlerErr::update)?;

    tracing::info!(class = %class_name, id = %id, grade, cleared_note = cleared, "grade recorded");
    Ok(ok(&req.id, json!({ "assignment": updated })))
}

fn handle_assignments_complete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    set_grade(req, conn, false)
}

fn handle_assignments_edit_grade(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    set_grade(req, conn, true)
}

fn handle_assignments_past_due(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let now = parse_now(&req.params)?;
    let class_filter = get_opt_str(&req.params, "className")?;

    let mut all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    if let Some(name) = class_filter.as_deref() {
        all.retain(|k, _| k == name);
    }
    let pending = pastdue::pending_classification(&all, now);

    tracing::debug!(count = pending.len(), "assignments.pastDue");
    Ok(ok(&req.id, json!({ "pending": pending })))
}

fn handle_assignments_set_status_note(
    state: &mut AppState,
    req: &Request,
) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    let id = get_required_str(&req.params, "id")?;
    let note_raw = get_required_str(&req.params, "note")?;
    let Some(note) = StatusNote::parse(&note_raw) else {
        return Err(HandlerErr::bad_params("note must be missing or notGraded"));
    };
    let now = parse_now(&req.params)?;

    let mut all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let a = find_mut(&mut all, &class_name, &id)?;
    pastdue::classify(a, note, now).map_err(|e| HandlerErr::validation(e.to_string()))?;
    let updated = a.clone();
    store::save_assignments(conn, &all).map_err(HandlerErr::update)?;

    tracing::info!(class = %class_name, id = %id, note = note.label(), "status note set");
    Ok(ok(&req.id, json!({ "assignment": updated })))
}

fn handle_assignments_reconcile(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let mut all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let cleared = pastdue::reconcile(&mut all);
    if cleared > 0 {
        store::save_assignments(conn, &all).map_err(HandlerErr::update)?;
        tracing::info!(cleared, "stale status notes cleared");
    }
    Ok(ok(&req.id, json!({ "cleared": cleared })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "assignments.list" => handle_assignments_list(state, req),
        "assignments.create" => handle_assignments_create(state, req),
        "assignments.delete" => handle_assignments_delete(state, req),
        "assignments.complete" => handle_assignments_complete(state, req),
        "assignments.editGrade" => handle_assignments_edit_grade(state, req),
        "assignments.pastDue" => handle_assignments_past_due(state, req),
        "assignments.setStatusNote" => handle_assignments_set_status_note(state, req),
        "assignments.reconcileStatusNotes" => handle_assignments_reconcile(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

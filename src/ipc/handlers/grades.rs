use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::{json, Value};

fn handle_grades_class(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    let classes = store::load_classes(conn).map_err(HandlerErr::query)?;
    if !classes.iter().any(|c| c.name == class_name) {
        return Err(HandlerErr::not_found(format!("class not found: {}", class_name)));
    }
    let decimals = setup::display_decimals(conn)?;
    let all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let weights = store::load_weights(conn).map_err(HandlerErr::query)?;
    let scheme = store::load_grading_scheme(conn).map_err(HandlerErr::query)?;

    let list = all.get(&class_name).map(Vec::as_slice).unwrap_or(&[]);
    let class_weights = weights.get(&class_name).cloned().unwrap_or_default();
    let breakdown = calc::class_grade(list, &class_weights);
    let standing = calc::class_standing(&class_name, list, &class_weights, &scheme, decimals);

    // Weighted categories with nothing graded yet; they sit out of the mean.
    let excluded: Vec<&String> = class_weights
        .keys()
        .filter(|k| !breakdown.categories.iter().any(|c| &c.name == *k))
        .collect();

    tracing::debug!(class = %class_name, percent = standing.percent, "grades.class");
    Ok(ok(
        &req.id,
        json!({
            "standing": standing,
            "countedWeight": breakdown.counted_weight,
            "categories": breakdown.categories,
            "excludedCategories": excluded,
        }),
    ))
}

fn handle_grades_overview(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let decimals = setup::display_decimals(conn)?;
    let classes = store::load_classes(conn).map_err(HandlerErr::query)?;
    let all = store::load_assignments(conn).map_err(HandlerErr::query)?;
    let weights = store::load_weights(conn).map_err(HandlerErr::query)?;
    let scheme = store::load_grading_scheme(conn).map_err(HandlerErr::query)?;

    let standings: Vec<calc::ClassStanding> = classes
        .iter()
        .map(|c| {
            let list = all.get(&c.name).map(Vec::as_slice).unwrap_or(&[]);
            let class_weights = weights.get(&c.name).cloned().unwrap_or_default();
            calc::class_standing(&c.name, list, &class_weights, &scheme, decimals)
        })
        .collect();
    let gpa = calc::overall_gpa(&standings).map(|g| calc::round_to(g, 2));

    Ok(ok(&req.id, json!({ "classes": standings, "gpa": gpa })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "grades.class" => handle_grades_class(state, req),
        "grades.overview" => handle_grades_overview(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

use crate::calc;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_bool, get_required_str, require_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::WeightMap;
use crate::store;
use serde_json::{json, Value};

/// Weights are whole percentages in 0..=100.
pub fn check_weight(category: &str, weight: i64) -> Result<(), HandlerErr> {
    if (0..=100).contains(&weight) {
        return Ok(());
    }
    Err(
        HandlerErr::validation(format!("weight for {} must be between 0 and 100", category))
            .with_details(json!({ "category": category, "weight": weight })),
    )
}

fn parse_weights(v: Option<&Value>) -> Result<WeightMap, HandlerErr> {
    let Some(obj) = v.and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("weights must be an object"));
    };
    let mut out = WeightMap::new();
    for (raw_name, raw_weight) in obj {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(HandlerErr::validation("category name must not be empty"));
        }
        let weight = raw_weight
            .as_i64()
            .or_else(|| raw_weight.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
            .ok_or_else(|| {
                HandlerErr::validation(format!("weight for {} must be an integer", name))
            })?;
        check_weight(name, weight)?;
        if out.insert(name.to_string(), weight).is_some() {
            return Err(HandlerErr::validation(format!("duplicate category: {}", name)));
        }
    }
    Ok(out)
}

fn handle_weights_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    let all = store::load_weights(conn).map_err(HandlerErr::query)?;
    let weights = all.get(&class_name).cloned().unwrap_or_default();
    let total = calc::total_weight(&weights);
    Ok(ok(
        &req.id,
        json!({ "className": class_name, "weights": weights, "totalWeight": total }),
    ))
}

fn handle_weights_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let class_name = get_required_str(&req.params, "className")?;
    let classes = store::load_classes(conn).map_err(HandlerErr::query)?;
    if !classes.iter().any(|c| c.name == class_name) {
        return Err(HandlerErr::not_found(format!("class not found: {}", class_name)));
    }
    let weights = parse_weights(req.params.get("weights"))?;
    let total = calc::total_weight(&weights);
    if total != 100 && !get_bool(&req.params, "confirm") {
        return Err(HandlerErr::new(
            "confirm_required",
            format!("category weights add up to {}%, not 100%", total),
        )
        .with_details(json!({ "totalWeight": total })));
    }

    let mut all = store::load_weights(conn).map_err(HandlerErr::query)?;
    all.insert(class_name.clone(), weights.clone());
    store::save_weights(conn, &all).map_err(HandlerErr::update)?;

    tracing::info!(class = %class_name, categories = weights.len(), total, "weights saved");
    Ok(ok(
        &req.id,
        json!({ "className": class_name, "weights": weights, "totalWeight": total }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "weights.get" => handle_weights_get(state, req),
        "weights.save" => handle_weights_save(state, req),
        _ => return None,
    };
    Some(result.unwrap_or_else(|e| e.response(&req.id)))
}

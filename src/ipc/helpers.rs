use crate::ipc::error::err;
use crate::ipc::types::AppState;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde_json::Value;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_failed", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn query(e: impl std::fmt::Display) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    pub fn update(e: impl std::fmt::Display) -> Self {
        Self::new("db_update_failed", e.to_string())
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn require_db(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    let s = s.trim();
    if s.is_empty() {
        return Err(HandlerErr::validation(format!("{} must not be empty", key)));
    }
    Ok(s.to_string())
}

pub fn get_opt_str(params: &Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

/// Accepts a JSON number or a numeric string, the way form fields arrive.
pub fn get_number(params: &Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    let n = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match n {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(HandlerErr::validation(format!("{} must be a number", key))),
    }
}

pub fn get_bool(params: &Value, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Grades are percentages in 0..=100.
pub fn get_grade(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    let Some(grade) = get_number(params, key)? else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    if !(0.0..=100.0).contains(&grade) {
        return Err(
            HandlerErr::validation(format!("{} must be between 0 and 100", key))
                .with_details(serde_json::json!({ "value": grade })),
        );
    }
    Ok(grade)
}

/// `params.now` overrides the wall clock (local time, no zone).
pub fn parse_now(params: &Value) -> Result<NaiveDateTime, HandlerErr> {
    let Some(raw) = get_opt_str(params, "now")? else {
        return Ok(chrono::Local::now().naive_local());
    };
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(&raw, fmt) {
            return Ok(v);
        }
    }
    Err(HandlerErr::bad_params(
        "now must be YYYY-MM-DDTHH:MM or YYYY-MM-DDTHH:MM:SS",
    ))
}

use crate::model::{Assignment, AssignmentsByClass, StatusNote};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;

/// Due values without a time (older data) fall due at 23:59.
pub const DATE_ONLY_DUE_TIME: (u32, u32) = (23, 59);

pub fn parse_due(due: &str) -> Option<NaiveDateTime> {
    let due = due.trim();
    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(due, fmt) {
            return Some(v);
        }
    }
    let date = NaiveDate::parse_from_str(due, "%Y-%m-%d").ok()?;
    let (h, m) = DATE_ONLY_DUE_TIME;
    Some(date.and_time(NaiveTime::from_hms_opt(h, m, 0)?))
}

pub fn is_past_due(a: &Assignment, now: NaiveDateTime) -> bool {
    parse_due(&a.due).map(|d| d < now).unwrap_or(false)
}

/// Past due, still open, and never classified.
pub fn needs_classification(a: &Assignment, now: NaiveDateTime) -> bool {
    !a.completed && a.status_note.is_none() && is_past_due(a, now)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PastDueItem {
    pub class_name: String,
    pub assignment_id: String,
    pub title: String,
    pub due: String,
}

pub fn pending_classification(all: &AssignmentsByClass, now: NaiveDateTime) -> Vec<PastDueItem> {
    let mut out = Vec::new();
    for (class_name, list) in all {
        for a in list.iter().filter(|a| needs_classification(a, now)) {
            out.push(PastDueItem {
                class_name: class_name.clone(),
                assignment_id: a.id.clone(),
                title: a.title.clone(),
                due: a.due.clone(),
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusNoteError {
    #[error("assignment is already completed")]
    AlreadyCompleted,
    #[error("assignment already has a status note")]
    AlreadyClassified,
    #[error("assignment is not past due")]
    NotPastDue,
}

/// Records the user's answer for a past-due assignment. Each item is
/// classified once.
pub fn classify(
    a: &mut Assignment,
    note: StatusNote,
    now: NaiveDateTime,
) -> Result<(), StatusNoteError> {
    if a.completed {
        return Err(StatusNoteError::AlreadyCompleted);
    }
    if a.status_note.is_some() {
        return Err(StatusNoteError::AlreadyClassified);
    }
    if !is_past_due(a, now) {
        return Err(StatusNoteError::NotPastDue);
    }
    a.status_note = Some(note);
    Ok(())
}

/// Grade entry completes the assignment and clears any status note.
pub fn record_grade(a: &mut Assignment, grade: f64) {
    a.completed = true;
    a.grade = Some(grade);
    a.status_note = None;
}

/// Clears notes left on completed, graded assignments. Returns how many
/// changed.
pub fn reconcile(all: &mut AssignmentsByClass) -> usize {
    let mut cleared = 0;
    for a in all.values_mut().flat_map(|l| l.iter_mut()) {
        if a.is_graded() && a.status_note.is_some() {
            a.status_note = None;
            cleared += 1;
        }
    }
    cleared
}

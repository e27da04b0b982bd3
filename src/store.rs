use crate::db;
use crate::model::{
    AssignmentsByClass, ClassRecord, DataBundle, GradeBand, SchedulePeriod, WeightsByClass,
};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub const CLASSES_KEY: &str = "classes";
pub const ASSIGNMENTS_KEY: &str = "assignments";
pub const CATEGORY_WEIGHTS_KEY: &str = "categoryWeights";
pub const SCHEDULE_KEY: &str = "schedule";
pub const GRADING_SCHEME_KEY: &str = "gradingScheme";

fn load_or_default<T>(conn: &Connection, key: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = db::document_get_json(conn, key)? else {
        return Ok(T::default());
    };
    match serde_json::from_value(raw) {
        Ok(v) => Ok(v),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored document has unexpected shape; reading as empty");
            Ok(T::default())
        }
    }
}

fn save<T: Serialize>(conn: &Connection, key: &str, value: &T) -> anyhow::Result<()> {
    db::document_set_json(conn, key, &serde_json::to_value(value)?)
}

pub fn load_classes(conn: &Connection) -> anyhow::Result<Vec<ClassRecord>> {
    load_or_default(conn, CLASSES_KEY)
}

pub fn save_classes(conn: &Connection, classes: &[ClassRecord]) -> anyhow::Result<()> {
    save(conn, CLASSES_KEY, &classes)
}

/// Loads the assignment map, giving any id-less record (older data) a fresh id.
/// The backfill is written back at once so ids stay stable between reads.
pub fn load_assignments(conn: &Connection) -> anyhow::Result<AssignmentsByClass> {
    let mut all: AssignmentsByClass = load_or_default(conn, ASSIGNMENTS_KEY)?;
    let filled = backfill_assignment_ids(&mut all);
    if filled > 0 {
        save_assignments(conn, &all)?;
        tracing::info!(filled, "assigned ids to stored assignments");
    }
    Ok(all)
}

pub fn backfill_assignment_ids(all: &mut AssignmentsByClass) -> usize {
    let mut filled = 0;
    for (class_name, list) in all.iter_mut() {
        for a in list.iter_mut() {
            if a.id.trim().is_empty() {
                a.id = Uuid::new_v4().to_string();
                filled += 1;
            }
            if a.class.is_empty() {
                a.class = class_name.clone();
            }
        }
    }
    filled
}

pub fn save_assignments(conn: &Connection, all: &AssignmentsByClass) -> anyhow::Result<()> {
    save(conn, ASSIGNMENTS_KEY, all)
}

pub fn load_weights(conn: &Connection) -> anyhow::Result<WeightsByClass> {
    load_or_default(conn, CATEGORY_WEIGHTS_KEY)
}

pub fn save_weights(conn: &Connection, weights: &WeightsByClass) -> anyhow::Result<()> {
    save(conn, CATEGORY_WEIGHTS_KEY, weights)
}

pub fn load_schedule(conn: &Connection) -> anyhow::Result<Vec<SchedulePeriod>> {
    load_or_default(conn, SCHEDULE_KEY)
}

pub fn save_schedule(conn: &Connection, periods: &[SchedulePeriod]) -> anyhow::Result<()> {
    save(conn, SCHEDULE_KEY, &periods)
}

pub fn load_grading_scheme(conn: &Connection) -> anyhow::Result<Vec<GradeBand>> {
    load_or_default(conn, GRADING_SCHEME_KEY)
}

pub fn save_grading_scheme(conn: &Connection, bands: &[GradeBand]) -> anyhow::Result<()> {
    save(conn, GRADING_SCHEME_KEY, &bands)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeSummary {
    pub assignments_removed: usize,
    pub weights_removed: usize,
}

/// Removes a class together with its assignments and category weights.
/// Returns `None` when no class has that name. All three documents are
/// rewritten in one transaction.
pub fn delete_class_cascade(
    conn: &Connection,
    class_name: &str,
) -> anyhow::Result<Option<CascadeSummary>> {
    let mut classes = load_classes(conn)?;
    let before = classes.len();
    classes.retain(|c| c.name != class_name);
    if classes.len() == before {
        return Ok(None);
    }

    let mut assignments = load_assignments(conn)?;
    let assignments_removed = assignments
        .remove(class_name)
        .map(|list| list.len())
        .unwrap_or(0);

    let mut weights = load_weights(conn)?;
    let weights_removed = weights
        .remove(class_name)
        .map(|m| m.len())
        .unwrap_or(0);

    let tx = conn.unchecked_transaction()?;
    save_classes(&tx, &classes)?;
    save_assignments(&tx, &assignments)?;
    save_weights(&tx, &weights)?;
    tx.commit()?;

    Ok(Some(CascadeSummary {
        assignments_removed,
        weights_removed,
    }))
}

pub fn load_bundle(conn: &Connection) -> anyhow::Result<DataBundle> {
    Ok(DataBundle {
        classes: load_classes(conn)?,
        assignments: load_assignments(conn)?,
        category_weights: load_weights(conn)?,
        schedule: load_schedule(conn)?,
        grading_scheme: Some(load_grading_scheme(conn)?),
    })
}

/// Overwrites the documents with the bundle contents. The grading scheme is
/// only replaced when the bundle carries one.
pub fn replace_all(conn: &Connection, bundle: &DataBundle) -> anyhow::Result<()> {
    let mut assignments = bundle.assignments.clone();
    backfill_assignment_ids(&mut assignments);

    let tx = conn.unchecked_transaction()?;
    save_classes(&tx, &bundle.classes)?;
    save_assignments(&tx, &assignments)?;
    save_weights(&tx, &bundle.category_weights)?;
    save_schedule(&tx, &bundle.schedule)?;
    if let Some(bands) = &bundle.grading_scheme {
        save_grading_scheme(&tx, bands)?;
    }
    tx.commit()?;
    Ok(())
}

//! Stored document shapes.
//!
//! Every document is read wholesale and written wholesale. Fields that older
//! data may lack carry serde defaults so a partial record still loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub name: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub period: String,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusNote {
    #[serde(rename = "m")]
    Missing,
    #[serde(rename = "nm")]
    NotGraded,
}

impl StatusNote {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "missing" => Some(Self::Missing),
            "nm" | "notgraded" | "not_graded" | "not-graded" => Some(Self::NotGraded),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::NotGraded => "notGraded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub category: String,
    /// `YYYY-MM-DDTHH:MM`, or a bare date from older data.
    #[serde(default)]
    pub due: String,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub status_note: Option<StatusNote>,
}

impl Assignment {
    pub fn is_graded(&self) -> bool {
        self.completed && self.grade.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub letter: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub gpa_value: f64,
}

impl GradeBand {
    pub fn contains(&self, percent: f64) -> bool {
        percent >= self.min && percent <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePeriod {
    pub name: String,
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
    #[serde(default)]
    pub weekdays: Vec<String>,
}

pub type AssignmentsByClass = BTreeMap<String, Vec<Assignment>>;
pub type WeightMap = BTreeMap<String, i64>;
pub type WeightsByClass = BTreeMap<String, WeightMap>;

/// All five documents together, as exported and imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBundle {
    #[serde(default)]
    pub classes: Vec<ClassRecord>,
    #[serde(default)]
    pub assignments: AssignmentsByClass,
    #[serde(default)]
    pub category_weights: WeightsByClass,
    #[serde(default)]
    pub schedule: Vec<SchedulePeriod>,
    /// Absent in browser exports; an import without one keeps the saved scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_scheme: Option<Vec<GradeBand>>,
}

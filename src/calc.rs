use crate::model::{Assignment, GradeBand, WeightMap};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

pub const NO_LETTER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAggregate {
    pub name: String,
    pub weight: i64,
    pub earned_points: f64,
    pub total_points: f64,
    pub average_percent: f64,
    pub graded_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGrade {
    pub percent: f64,
    /// Sum of the weights of categories that have graded work.
    pub counted_weight: i64,
    pub graded_count: usize,
    pub categories: Vec<CategoryAggregate>,
}

/// Weighted category average over completed, graded assignments.
///
/// Categories with no graded work are left out of both sides of the weighted
/// mean, so an empty category never pulls the grade toward zero. A graded
/// category missing from `weights` counts with weight 0.
pub fn class_grade(assignments: &[Assignment], weights: &WeightMap) -> ClassGrade {
    // earned, total, count
    let mut per_category: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
    for a in assignments {
        if !a.completed {
            continue;
        }
        let Some(grade) = a.grade else {
            continue;
        };
        let entry = per_category
            .entry(a.category.as_str())
            .or_insert((0.0, 0.0, 0));
        entry.0 += (grade / 100.0) * a.points;
        entry.1 += a.points;
        entry.2 += 1;
    }

    let mut weighted_sum = 0.0_f64;
    let mut counted_weight = 0_i64;
    let mut graded_count = 0_usize;
    let mut categories = Vec::with_capacity(per_category.len());

    for (name, (earned, total, count)) in per_category {
        let weight = weights.get(name).copied().unwrap_or(0);
        let average = if total > 0.0 { earned / total } else { 0.0 };
        if total > 0.0 {
            weighted_sum += average * (weight as f64);
            counted_weight = counted_weight.saturating_add(weight);
        }
        graded_count += count;
        categories.push(CategoryAggregate {
            name: name.to_string(),
            weight,
            earned_points: earned,
            total_points: total,
            average_percent: average * 100.0,
            graded_count: count,
        });
    }

    let percent = if counted_weight > 0 {
        (weighted_sum / (counted_weight as f64)) * 100.0
    } else {
        0.0
    };

    ClassGrade {
        percent,
        counted_weight,
        graded_count,
        categories,
    }
}

/// Sum of a class's weights. Saturates so stored data with absurd values
/// cannot overflow.
pub fn total_weight(weights: &WeightMap) -> i64 {
    weights
        .values()
        .fold(0_i64, |acc, w| acc.saturating_add(*w))
}

fn is_contiguous(lower_max: f64, upper_min: f64) -> bool {
    let d = upper_min - lower_max;
    d > 0.0 && d <= 1.0
}

/// First band (in stored order) whose inclusive range holds `percent`.
///
/// A percentage that falls in the sub-point seam between two contiguous
/// bands (59.9 between `[0,59]` and `[60,69]`) belongs to the lower band.
pub fn resolve_band(scheme: &[GradeBand], percent: f64) -> Option<&GradeBand> {
    if let Some(b) = scheme.iter().find(|b| b.contains(percent)) {
        return Some(b);
    }
    scheme.iter().filter(|lower| lower.max < percent).find(|lower| {
        scheme
            .iter()
            .any(|upper| upper.min > percent && is_contiguous(lower.max, upper.min))
    })
}

pub fn letter_grade(scheme: &[GradeBand], percent: f64) -> String {
    resolve_band(scheme, percent)
        .map(|b| b.letter.clone())
        .unwrap_or_else(|| NO_LETTER.to_string())
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemeError {
    #[error("band {index}: letter must not be empty")]
    EmptyLetter { index: usize },
    #[error("band {letter}: min and max must be within 0..=100")]
    OutOfRange { letter: String },
    #[error("band {letter}: min {min} is greater than max {max}")]
    Inverted { letter: String, min: f64, max: f64 },
    #[error("band {letter}: gpaValue must not be negative")]
    NegativeGpa { letter: String },
    #[error("highest band must end at 100 (found {0})")]
    TopNotHundred(f64),
    #[error("lowest band must start at 0 (found {0})")]
    BottomNotZero(f64),
    #[error("gap between {lower} (max {lower_max}) and {upper} (min {upper_min})")]
    Gap {
        lower: String,
        lower_max: f64,
        upper: String,
        upper_min: f64,
    },
    #[error("{lower} (max {lower_max}) overlaps {upper} (min {upper_min})")]
    Overlap {
        lower: String,
        lower_max: f64,
        upper: String,
        upper_min: f64,
    },
}

/// Bands must tile [0,100] with no gaps or overlaps. An empty scheme is
/// accepted and resolves every percentage to `N/A`.
pub fn validate_grading_scheme(bands: &[GradeBand]) -> Result<(), SchemeError> {
    if bands.is_empty() {
        return Ok(());
    }

    for (index, b) in bands.iter().enumerate() {
        if b.letter.trim().is_empty() {
            return Err(SchemeError::EmptyLetter { index });
        }
        let in_range = |x: f64| x.is_finite() && (0.0..=100.0).contains(&x);
        if !in_range(b.min) || !in_range(b.max) {
            return Err(SchemeError::OutOfRange {
                letter: b.letter.clone(),
            });
        }
        if b.min > b.max {
            return Err(SchemeError::Inverted {
                letter: b.letter.clone(),
                min: b.min,
                max: b.max,
            });
        }
        if !b.gpa_value.is_finite() || b.gpa_value < 0.0 {
            return Err(SchemeError::NegativeGpa {
                letter: b.letter.clone(),
            });
        }
    }

    let mut sorted: Vec<&GradeBand> = bands.iter().collect();
    sorted.sort_by(|a, b| b.min.partial_cmp(&a.min).unwrap_or(Ordering::Equal));

    if let Some(top) = sorted.first() {
        if top.max != 100.0 {
            return Err(SchemeError::TopNotHundred(top.max));
        }
    }
    if let Some(bottom) = sorted.last() {
        if bottom.min != 0.0 {
            return Err(SchemeError::BottomNotZero(bottom.min));
        }
    }

    for pair in sorted.windows(2) {
        let (upper, lower) = (pair[0], pair[1]);
        let d = upper.min - lower.max;
        if d <= 0.0 {
            return Err(SchemeError::Overlap {
                lower: lower.letter.clone(),
                lower_max: lower.max,
                upper: upper.letter.clone(),
                upper_min: upper.min,
            });
        }
        if d > 1.0 {
            return Err(SchemeError::Gap {
                lower: lower.letter.clone(),
                lower_max: lower.max,
                upper: upper.letter.clone(),
                upper_min: upper.min,
            });
        }
    }

    Ok(())
}

pub fn round_to(x: f64, decimals: u32) -> f64 {
    let f = 10_f64.powi(decimals as i32);
    (x * f).round() / f
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStanding {
    pub class_name: String,
    pub percent: f64,
    pub rounded_percent: i64,
    pub exact: String,
    pub letter: String,
    pub gpa_value: Option<f64>,
    pub graded_count: usize,
}

pub fn class_standing(
    class_name: &str,
    assignments: &[Assignment],
    weights: &WeightMap,
    scheme: &[GradeBand],
    decimals: u32,
) -> ClassStanding {
    let grade = class_grade(assignments, weights);
    let band = resolve_band(scheme, grade.percent);
    ClassStanding {
        class_name: class_name.to_string(),
        percent: round_to(grade.percent, decimals),
        rounded_percent: grade.percent.round() as i64,
        exact: format!("{:.*}", decimals as usize, grade.percent),
        letter: band
            .map(|b| b.letter.clone())
            .unwrap_or_else(|| NO_LETTER.to_string()),
        gpa_value: band.map(|b| b.gpa_value),
        graded_count: grade.graded_count,
    }
}

/// Mean grade-point value over classes that have graded work and a letter.
pub fn overall_gpa(standings: &[ClassStanding]) -> Option<f64> {
    let values: Vec<f64> = standings
        .iter()
        .filter(|s| s.graded_count > 0)
        .filter_map(|s| s.gpa_value)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / (values.len() as f64))
}

use crate::model::Assignment;
use crate::pastdue::parse_due;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMethod {
    TitleAsc,
    TitleDesc,
    #[default]
    DueAsc,
    DueDesc,
    PointsAsc,
    PointsDesc,
    /// Open work first, then by due.
    Status,
}

impl SortMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title-asc" => Some(Self::TitleAsc),
            "title-desc" => Some(Self::TitleDesc),
            "due-asc" => Some(Self::DueAsc),
            "due-desc" => Some(Self::DueDesc),
            "points-asc" => Some(Self::PointsAsc),
            "points-desc" => Some(Self::PointsDesc),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::DueAsc => "due-asc",
            Self::DueDesc => "due-desc",
            Self::PointsAsc => "points-asc",
            Self::PointsDesc => "points-desc",
            Self::Status => "status",
        }
    }
}

fn points_text(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{}", points as i64)
    } else {
        points.to_string()
    }
}

/// Title and category match case-insensitively; due and points match as
/// plain substrings of their stored text.
pub fn matches_search(a: &Assignment, term: &str) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return true;
    }
    let lowered = term.to_lowercase();
    a.title.to_lowercase().contains(&lowered)
        || a.category.to_lowercase().contains(&lowered)
        || a.due.contains(term)
        || points_text(a.points).contains(term)
}

// Unparseable due values sort last.
fn cmp_due(a: &Assignment, b: &Assignment) -> Ordering {
    match (parse_due(&a.due), parse_due(&b.due)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_points(a: &Assignment, b: &Assignment) -> Ordering {
    a.points.partial_cmp(&b.points).unwrap_or(Ordering::Equal)
}

pub fn sort_assignments(list: &mut [Assignment], method: SortMethod) {
    match method {
        SortMethod::TitleAsc => list.sort_by_key(|a| a.title.to_lowercase()),
        SortMethod::TitleDesc => {
            list.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
        SortMethod::DueAsc => list.sort_by(cmp_due),
        SortMethod::DueDesc => list.sort_by(|a, b| cmp_due(b, a)),
        SortMethod::PointsAsc => list.sort_by(cmp_points),
        SortMethod::PointsDesc => list.sort_by(|a, b| cmp_points(b, a)),
        SortMethod::Status => list.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then_with(|| cmp_due(a, b))
        }),
    }
}

pub fn filter_and_sort(
    list: &[Assignment],
    search: &str,
    method: SortMethod,
) -> Vec<Assignment> {
    let mut out: Vec<Assignment> = list
        .iter()
        .filter(|a| matches_search(a, search))
        .cloned()
        .collect();
    sort_assignments(&mut out, method);
    out
}

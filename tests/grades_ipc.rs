mod common;

use common::{add_assignment, seed_class, standard_scheme, temp_dir, Sidecar};
use serde_json::json;

#[test]
fn ungraded_category_sits_out_of_the_weighted_mean() {
    let workspace = temp_dir("classtrack-grades");
    let mut s = Sidecar::open(&workspace);
    seed_class(&mut s, "Biology", json!({ "Homework": 50, "Test": 50 }));

    let hw1 = add_assignment(&mut s, "Biology", "HW 1", "Homework", "2024-09-01", 10.0);
    let hw2 = add_assignment(&mut s, "Biology", "HW 2", "Homework", "2024-09-03", 30.0);
    let _test = add_assignment(&mut s, "Biology", "Unit test", "Test", "2024-09-20", 100.0);
    s.request_ok(
        "assignments.complete",
        json!({ "className": "Biology", "id": hw1, "grade": 80 }),
    );
    s.request_ok(
        "assignments.complete",
        json!({ "className": "Biology", "id": hw2, "grade": "90" }),
    );

    let res = s.request_ok("grades.class", json!({ "className": "Biology" }));
    // (8 + 27) / 40
    assert_eq!(
        res.pointer("/standing/percent").and_then(|v| v.as_f64()),
        Some(87.5)
    );
    assert_eq!(
        res.pointer("/standing/exact").and_then(|v| v.as_str()),
        Some("87.50")
    );
    assert_eq!(
        res.pointer("/standing/roundedPercent").and_then(|v| v.as_i64()),
        Some(88)
    );
    assert_eq!(res.get("countedWeight").and_then(|v| v.as_i64()), Some(50));
    assert_eq!(res.get("excludedCategories"), Some(&json!(["Test"])));
    assert_eq!(
        res.pointer("/standing/letter").and_then(|v| v.as_str()),
        Some("N/A")
    );

    s.request_ok("grading.save", json!({ "bands": standard_scheme() }));
    let res = s.request_ok("grades.class", json!({ "className": "Biology" }));
    assert_eq!(
        res.pointer("/standing/letter").and_then(|v| v.as_str()),
        Some("B")
    );

    let overview = s.request_ok("grades.overview", json!({}));
    assert_eq!(overview.get("gpa").and_then(|v| v.as_f64()), Some(3.0));
    assert_eq!(
        overview
            .get("classes")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn class_with_nothing_graded_is_zero() {
    let workspace = temp_dir("classtrack-grades-empty");
    let mut s = Sidecar::open(&workspace);
    seed_class(&mut s, "Art", json!({ "Projects": 100 }));
    add_assignment(&mut s, "Art", "Collage", "Projects", "2024-09-01T15:00", 20.0);

    let res = s.request_ok("grades.class", json!({ "className": "Art" }));
    assert_eq!(
        res.pointer("/standing/percent").and_then(|v| v.as_f64()),
        Some(0.0)
    );
    assert_eq!(
        res.pointer("/standing/gradedCount").and_then(|v| v.as_u64()),
        Some(0)
    );
    let overview = s.request_ok("grades.overview", json!({}));
    assert!(overview.get("gpa").map(|v| v.is_null()).unwrap_or(false));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn letter_lookup_handles_band_seams() {
    let workspace = temp_dir("classtrack-letters");
    let mut s = Sidecar::open(&workspace);
    s.request_ok("grading.save", json!({ "bands": standard_scheme() }));

    let letter = |s: &mut Sidecar, percent: f64| -> String {
        s.request_ok("grading.letter", json!({ "percent": percent }))
            .get("letter")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    assert_eq!(letter(&mut s, 59.9), "F");
    assert_eq!(letter(&mut s, 60.0), "D");
    assert_eq!(letter(&mut s, 89.5), "B");
    assert_eq!(letter(&mut s, 100.0), "A");
    assert_eq!(letter(&mut s, 0.0), "F");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn gapped_or_overlapping_scheme_is_rejected() {
    let workspace = temp_dir("classtrack-scheme");
    let mut s = Sidecar::open(&workspace);
    s.request_ok("grading.save", json!({ "bands": standard_scheme() }));

    let gap = json!([
        { "letter": "A", "min": 91, "max": 100, "gpaValue": 4.0 },
        { "letter": "B", "min": 0, "max": 89, "gpaValue": 3.0 }
    ]);
    s.request_err("grading.save", json!({ "bands": gap }), "validation_failed");

    let overlap = json!([
        { "letter": "P", "min": 60, "max": 100, "gpaValue": 1.0 },
        { "letter": "F", "min": 0, "max": 60, "gpaValue": 0.0 }
    ]);
    s.request_err("grading.save", json!({ "bands": overlap }), "validation_failed");

    let short = json!([
        { "letter": "P", "min": 50, "max": 99, "gpaValue": 1.0 },
        { "letter": "F", "min": 0, "max": 49, "gpaValue": 0.0 }
    ]);
    s.request_err("grading.save", json!({ "bands": short }), "validation_failed");

    // Rejected saves leave the stored scheme alone.
    let stored = s.request_ok("grading.get", json!({}));
    assert_eq!(
        stored
            .get("bands")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(5)
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn grade_entry_is_validated() {
    let workspace = temp_dir("classtrack-grade-entry");
    let mut s = Sidecar::open(&workspace);
    seed_class(&mut s, "Chem", json!({ "Labs": 100 }));
    let id = add_assignment(&mut s, "Chem", "Lab 1", "Labs", "2024-09-01", 20.0);

    s.request_err(
        "assignments.complete",
        json!({ "className": "Chem", "id": id, "grade": 101 }),
        "validation_failed",
    );
    s.request_err(
        "assignments.complete",
        json!({ "className": "Chem", "id": id, "grade": "abc" }),
        "validation_failed",
    );
    s.request_err(
        "assignments.editGrade",
        json!({ "className": "Chem", "id": id, "grade": 70 }),
        "validation_failed",
    );
    s.request_ok(
        "assignments.complete",
        json!({ "className": "Chem", "id": id, "grade": 70 }),
    );
    let res = s.request_ok(
        "assignments.editGrade",
        json!({ "className": "Chem", "id": id, "grade": 95 }),
    );
    assert_eq!(
        res.pointer("/assignment/grade").and_then(|v| v.as_f64()),
        Some(95.0)
    );

    s.request_err(
        "assignments.create",
        json!({
            "className": "Chem",
            "title": "Essay",
            "category": "Writing",
            "due": "2024-09-10",
            "points": 10
        }),
        "validation_failed",
    );
    s.request_err(
        "assignments.create",
        json!({
            "className": "Chem",
            "title": "Lab 2",
            "category": "Labs",
            "due": "2024-09-10",
            "points": 0
        }),
        "validation_failed",
    );

    let _ = std::fs::remove_dir_all(workspace);
}

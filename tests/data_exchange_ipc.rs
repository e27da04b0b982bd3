mod common;

use common::{add_assignment, seed_class, standard_scheme, temp_dir, Sidecar};
use serde_json::json;

#[test]
fn export_then_import_into_a_fresh_workspace() {
    let src = temp_dir("classtrack-export-src");
    let dst = temp_dir("classtrack-export-dst");
    let bundle = src.join("out").join("backup.zip");

    {
        let mut s = Sidecar::open(&src);
        seed_class(&mut s, "Latin", json!({ "Translation": 70, "Vocab": 30 }));
        let id = add_assignment(&mut s, "Latin", "Caesar 1", "Translation", "2024-09-02", 25.0);
        s.request_ok(
            "assignments.complete",
            json!({ "className": "Latin", "id": id, "grade": 92 }),
        );
        s.request_ok("grading.save", json!({ "bands": standard_scheme() }));
        s.request_ok(
            "schedule.save",
            json!({ "periods": [{ "name": "Latin", "start": "13:00", "end": "13:50", "weekdays": ["Tue", "Thu"] }] }),
        );
        let res = s.request_ok("data.export", json!({ "outPath": bundle.to_string_lossy() }));
        assert_eq!(
            res.get("bundleFormat").and_then(|v| v.as_str()),
            Some("classtrack-data-v1")
        );
        assert_eq!(res.pointer("/counts/assignments").and_then(|v| v.as_u64()), Some(1));
    }

    let mut s = Sidecar::open(&dst);
    s.request_ok("classes.create", json!({ "name": "Doomed" }));

    let error = s.request_err(
        "data.import",
        json!({ "inPath": bundle.to_string_lossy() }),
        "confirm_required",
    );
    assert_eq!(
        error.pointer("/details/counts/classes").and_then(|v| v.as_u64()),
        Some(1)
    );
    let still = s.request_ok("classes.list", json!({}));
    assert_eq!(
        still.pointer("/classes/0/name").and_then(|v| v.as_str()),
        Some("Doomed")
    );

    let res = s.request_ok(
        "data.import",
        json!({ "inPath": bundle.to_string_lossy(), "confirm": true }),
    );
    assert_eq!(
        res.get("bundleFormatDetected").and_then(|v| v.as_str()),
        Some("classtrack-data-v1")
    );

    let classes = s.request_ok("classes.list", json!({}));
    let names: Vec<&str> = classes
        .get("classes")
        .and_then(|v| v.as_array())
        .expect("classes")
        .iter()
        .filter_map(|c| c.get("name").and_then(|v| v.as_str()))
        .collect();
    assert_eq!(names, vec!["Latin"]);
    let grade = s.request_ok("grades.class", json!({ "className": "Latin" }));
    assert_eq!(
        grade.pointer("/standing/letter").and_then(|v| v.as_str()),
        Some("A")
    );
    let schedule = s.request_ok("schedule.get", json!({}));
    assert_eq!(
        schedule.pointer("/periods/0/weekdays"),
        Some(&json!(["Tue", "Thu"]))
    );

    let _ = std::fs::remove_dir_all(src);
    let _ = std::fs::remove_dir_all(dst);
}

#[test]
fn plain_json_import_requires_the_core_documents() {
    let workspace = temp_dir("classtrack-plain-import");
    let mut s = Sidecar::open(&workspace);
    s.request_ok("grading.save", json!({ "bands": standard_scheme() }));

    let partial = workspace.join("partial.json");
    std::fs::write(
        &partial,
        json!({ "classes": [], "assignments": {} }).to_string(),
    )
    .expect("write partial");
    let error = s.request_err(
        "data.import",
        json!({ "inPath": partial.to_string_lossy(), "confirm": true }),
        "validation_failed",
    );
    assert!(error
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .contains("categoryWeights"));

    // Browser exports carry no gradingScheme and older assignments no id.
    let browser = workspace.join("browser.json");
    std::fs::write(
        &browser,
        json!({
            "classes": [{ "name": "Drama", "teacher": "Ms. Hale", "room": "Stage", "id": 1726000000000_i64 }],
            "assignments": { "Drama": [
                { "title": "Monologue", "category": "Performance", "due": "2024-09-20",
                  "points": 40, "completed": false, "link": "" }
            ] },
            "categoryWeights": { "Drama": { "Performance": 100 } },
            "schedule": []
        })
        .to_string(),
    )
    .expect("write browser export");
    let res = s.request_ok(
        "data.import",
        json!({ "inPath": browser.to_string_lossy(), "confirm": true }),
    );
    assert_eq!(
        res.get("bundleFormatDetected").and_then(|v| v.as_str()),
        Some("plain-json")
    );

    // The file carried no gradingScheme, so the saved one stays.
    let scheme = s.request_ok("grading.get", json!({}));
    assert_eq!(
        scheme
            .get("bands")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(5)
    );

    let list = s.request_ok("assignments.list", json!({ "className": "Drama" }));
    let id = list
        .pointer("/assignments/0/id")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert!(!id.is_empty());
    assert_eq!(
        list.pointer("/assignments/0/class").and_then(|v| v.as_str()),
        Some("Drama")
    );

    s.request_err(
        "data.import",
        json!({ "inPath": workspace.join("missing.json").to_string_lossy(), "confirm": true }),
        "not_found",
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn import_applies_the_same_rules_as_each_save() {
    let workspace = temp_dir("classtrack-import-rules");
    let mut s = Sidecar::open(&workspace);
    seed_class(&mut s, "Bio", json!({ "HW": 50, "Test": 50 }));

    let base = || {
        json!({
            "classes": [{ "name": "Bio", "teacher": "", "room": "", "id": 1 }],
            "assignments": { "Bio": [] },
            "categoryWeights": { "Bio": { "HW": 60, "Test": 40 } },
            "schedule": []
        })
    };
    let write = |name: &str, data: &serde_json::Value| {
        let path = workspace.join(name);
        std::fs::write(&path, data.to_string()).expect("write import file");
        path
    };

    let mut huge = base();
    huge["categoryWeights"]["Bio"]["HW"] = json!(i64::MAX);
    let mut overlap = base();
    overlap["schedule"] = json!([
        { "name": "Bio", "start": "09:00", "end": "10:00", "weekdays": ["Mon"] },
        { "name": "Lab", "start": "09:30", "end": "10:30", "weekdays": ["Mon"] }
    ]);
    let mut gapped = base();
    gapped["gradingScheme"] = json!([
        { "letter": "A", "min": 91, "max": 100, "gpaValue": 4.0 },
        { "letter": "B", "min": 0, "max": 89, "gpaValue": 3.0 }
    ]);
    let mut bad_grade = base();
    bad_grade["assignments"]["Bio"] = json!([
        { "id": "x", "title": "Quiz", "category": "Test", "due": "2024-09-01T09:00",
          "points": 10, "completed": true, "grade": 250 }
    ]);

    for (name, data) in [
        ("huge.json", huge),
        ("overlap.json", overlap),
        ("gapped.json", gapped),
        ("bad-grade.json", bad_grade),
    ] {
        let path = write(name, &data);
        s.request_err(
            "data.import",
            json!({ "inPath": path.to_string_lossy(), "confirm": true }),
            "validation_failed",
        );
    }

    // Nothing was written and the daemon is still answering.
    let weights = s.request_ok("weights.get", json!({ "className": "Bio" }));
    assert_eq!(weights.get("totalWeight").and_then(|v| v.as_i64()), Some(100));
    let schedule = s.request_ok("schedule.get", json!({}));
    assert_eq!(schedule.get("periods"), Some(&json!([])));

    let good = write("good.json", &base());
    s.request_ok(
        "data.import",
        json!({ "inPath": good.to_string_lossy(), "confirm": true }),
    );
    let weights = s.request_ok("weights.get", json!({ "className": "Bio" }));
    assert_eq!(weights.get("weights"), Some(&json!({ "HW": 60, "Test": 40 })));

    let _ = std::fs::remove_dir_all(workspace);
}

#[path = "../src/backup.rs"]
mod backup;

use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn sample_data() -> serde_json::Value {
    json!({
        "classes": [{ "name": "Physics", "teacher": "Dr. Lee", "room": "Lab 2", "period": "", "id": 1 }],
        "assignments": { "Physics": [] },
        "categoryWeights": { "Physics": { "Labs": 100 } },
        "schedule": [],
        "gradingScheme": []
    })
}

#[test]
fn zip_export_and_read_back() {
    let out_dir = temp_dir("classtrack-backup-out");
    let bundle_path = out_dir.join("data.classtrack.zip");

    let export = backup::export_data_bundle(&sample_data(), &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 2);
    assert_eq!(export.data_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains(&export.data_sha256));
    archive.by_name("data.json").expect("data entry in bundle");

    let import = backup::read_data_bundle(&bundle_path).expect("read bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.data, sample_data());

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_data_entry_fails_checksum() {
    let out_dir = temp_dir("classtrack-backup-tamper");
    let bundle_path = out_dir.join("tampered.zip");

    let manifest = json!({
        "format": backup::BUNDLE_FORMAT_V1,
        "version": 1,
        "dataSha256": "00".repeat(32),
    });
    let f = File::create(&bundle_path).expect("create zip");
    let mut zip = zip::ZipWriter::new(f);
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("start manifest");
    zip.write_all(manifest.to_string().as_bytes())
        .expect("write manifest");
    zip.start_file("data.json", opts).expect("start data");
    zip.write_all(sample_data().to_string().as_bytes())
        .expect("write data");
    zip.finish().expect("finish zip");

    let err = backup::read_data_bundle(&bundle_path).expect_err("checksum mismatch");
    assert!(err.to_string().contains("checksum"));

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn plain_json_is_detected_and_checked() {
    let dir = temp_dir("classtrack-backup-plain");
    let ok_path = dir.join("export.json");
    let mut data = sample_data();
    data.as_object_mut()
        .expect("object")
        .remove("gradingScheme");
    std::fs::write(&ok_path, data.to_string()).expect("write json");
    let import = backup::read_data_bundle(&ok_path).expect("plain json import");
    assert_eq!(import.bundle_format_detected, backup::PLAIN_JSON_FORMAT);

    let bad_path = dir.join("bad.json");
    std::fs::write(&bad_path, json!({ "classes": [] }).to_string()).expect("write json");
    let err = backup::read_data_bundle(&bad_path).expect_err("missing documents");
    let msg = err.to_string();
    assert!(msg.contains("assignments"));
    assert!(msg.contains("schedule"));

    let garbage = dir.join("garbage.json");
    std::fs::write(&garbage, "not json at all").expect("write garbage");
    assert!(backup::read_data_bundle(&garbage).is_err());

    let _ = std::fs::remove_dir_all(dir);
}

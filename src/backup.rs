use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data.json";
pub const BUNDLE_FORMAT_V1: &str = "classtrack-data-v1";
pub const PLAIN_JSON_FORMAT: &str = "plain-json";

/// Documents a plain JSON export must carry. `gradingScheme` is optional
/// since older exports predate it.
pub const REQUIRED_DOCUMENTS: [&str; 4] = ["classes", "assignments", "categoryWeights", "schedule"];

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub data_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub data: serde_json::Value,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn export_data_bundle(
    data: &serde_json::Value,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    check_required_documents(data)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let data_text = serde_json::to_string_pretty(data).context("failed to serialize data")?;
    let data_sha256 = sha256_hex(data_text.as_bytes());

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "dataSha256": data_sha256,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DATA_ENTRY, opts)
        .context("failed to start data entry")?;
    zip.write_all(data_text.as_bytes())
        .context("failed to write data entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 2,
        data_sha256,
    })
}

/// Reads a zip bundle, or a plain JSON file as written by the browser
/// version. Nothing is written; the caller decides whether to apply it.
pub fn read_data_bundle(in_path: &Path) -> anyhow::Result<ImportSummary> {
    if !is_zip_file(in_path)? {
        let text = std::fs::read_to_string(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
        let data: serde_json::Value =
            serde_json::from_str(&text).context("import file is not valid JSON")?;
        check_required_documents(&data)?;
        return Ok(ImportSummary {
            bundle_format_detected: PLAIN_JSON_FORMAT.to_string(),
            data,
        });
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut data_text = String::new();
    archive
        .by_name(DATA_ENTRY)
        .context("bundle missing data.json")?
        .read_to_string(&mut data_text)
        .context("failed to read data.json")?;

    if let Some(expected) = manifest.get("dataSha256").and_then(|v| v.as_str()) {
        let actual = sha256_hex(data_text.as_bytes());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(anyhow!(
                "data.json checksum mismatch (expected {}, found {})",
                expected,
                actual
            ));
        }
    }

    let data: serde_json::Value =
        serde_json::from_str(&data_text).context("data.json is invalid JSON")?;
    check_required_documents(&data)?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        data,
    })
}

fn check_required_documents(data: &serde_json::Value) -> anyhow::Result<()> {
    let Some(obj) = data.as_object() else {
        return Err(anyhow!("invalid data format: expected a JSON object"));
    };
    let missing: Vec<&str> = REQUIRED_DOCUMENTS
        .iter()
        .copied()
        .filter(|k| obj.get(*k).map(|v| v.is_null()).unwrap_or(true))
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!(
            "invalid data format, missing required fields: {}",
            missing.join(", ")
        ));
    }
    Ok(())
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}

use anyhow::{anyhow, Context};
use rusqlite::Connection;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::model::ArchiveEntry;
use crate::persist;

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT_V1: &str = "reportcard-archive-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub report_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub report_count: usize,
    pub added: usize,
    pub replaced: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn entry_name(id: &str) -> String {
    format!("reports/{}.json", id)
}

/// Exports every archived report in `scope` as one JSON entry per report,
/// plus a manifest carrying a SHA-256 checksum for each entry.
pub fn export_scope_bundle(
    conn: &Connection,
    scope: &str,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let reports = persist::archive_entries(conn, scope)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut manifest_entries = Vec::with_capacity(reports.len());
    let mut bodies = Vec::with_capacity(reports.len());
    for report in &reports {
        let body = serde_json::to_string_pretty(report)
            .with_context(|| format!("failed to serialize report {}", report.id))?;
        manifest_entries.push(json!({
            "file": entry_name(&report.id),
            "id": report.id,
            "sha256": sha256_hex(body.as_bytes()),
        }));
        bodies.push((entry_name(&report.id), body));
    }

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "scope": scope,
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "entries": manifest_entries,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, body) in bodies {
        zip.start_file(&name, opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write entry {}", name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        report_count: reports.len(),
    })
}

/// Imports a bundle into `scope`, merging by report id: an entry with a
/// known id replaces the stored one, new ids append. Checksums are
/// verified before anything is written.
pub fn import_scope_bundle(
    conn: &Connection,
    scope: &str,
    in_path: &Path,
) -> anyhow::Result<ImportSummary> {
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
    let listed = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut incoming: Vec<ArchiveEntry> = Vec::with_capacity(listed.len());
    for item in &listed {
        let file = item
            .get("file")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry missing file"))?;
        let expected_sha = item
            .get("sha256")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest entry missing sha256"))?;

        let mut body = String::new();
        archive
            .by_name(file)
            .with_context(|| format!("bundle missing entry {}", file))?
            .read_to_string(&mut body)
            .with_context(|| format!("failed to read entry {}", file))?;
        if sha256_hex(body.as_bytes()) != expected_sha {
            return Err(anyhow!("checksum mismatch for entry {}", file));
        }

        let mut report: ArchiveEntry = serde_json::from_str(&body)
            .with_context(|| format!("entry {} is not a valid report", file))?;
        report.data.normalize();
        incoming.push(report);
    }

    let report_count = incoming.len();
    let (added, replaced) = persist::merge_archive_entries(conn, scope, incoming)?;

    Ok(ImportSummary {
        report_count,
        added,
        replaced,
    })
}

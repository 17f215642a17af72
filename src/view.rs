//! Plain-text rendering of command results.

use gudang_config::Config;
use gudang_library::Report;
use gudang_metadata::VideoRecord;
use std::fmt::Write;

/// Number of hash characters shown in listings.
pub const HASH_PREFIX_LEN: usize = 16;

/// Size in MiB with two decimals, e.g. `1.50 MB`.
pub fn size_mib(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Leading characters of a hash followed by an ellipsis.
pub fn hash_prefix(hash: &str) -> String {
    let prefix: String = hash.chars().take(HASH_PREFIX_LEN).collect();
    format!("{prefix}...")
}

pub fn video(record: &VideoRecord, config: &Config) -> String {
    let mut out = String::new();
    _ = writeln!(out, "{} - {}", record.original_name, record.upload_date_string());
    _ = writeln!(out, "  Size:   {}", size_mib(record.file_size));
    _ = writeln!(out, "  Hash:   {}", hash_prefix(&record.hash_value));
    _ = writeln!(out, "  Stream: {}", config.stream_url(&record.filename));
    out
}

pub fn videos(records: &[VideoRecord], config: &Config) -> String {
    if records.is_empty() {
        return "No videos uploaded yet. Upload one with `gudang upload <FILE>`.\n".to_string();
    }
    records.iter().map(|record| video(record, config)).collect::<Vec<_>>().join("\n")
}

pub fn report(report: &Report) -> String {
    if report.is_clean() {
        return "Storage directory and metadata agree.\n".to_string();
    }
    let mut out = String::new();
    for file in &report.orphaned {
        _ = writeln!(out, "orphaned file (no metadata): {}", file.path.display());
    }
    for record in &report.missing {
        _ = writeln!(out, "missing file: {}", record.filename);
    }
    for (record, file) in &report.size_mismatches {
        _ = writeln!(out, "size mismatch: {} (recorded {}, on disk {})", record.filename, record.file_size, file.size);
    }
    for file in &report.staged {
        _ = writeln!(out, "unfinished upload: {}", file.path.display());
    }
    out
}

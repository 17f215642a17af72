//! Comparing the storage directory against the metadata store.
//!
//! Neither uploads nor removals are atomic across the two, so a crash at the
//! wrong moment leaves a file without a row (invisible to listings forever)
//! or a row without a file. [`reconcile`] finds both; [`prune`] deletes the
//! files nobody refers to. Rows are never touched: whether a row whose file
//! vanished should go is the operator's call (see
//! [`remove_video`](crate::catalog::remove_video)).

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gudang_metadata::{Repository, VideoRecord};
use gudang_storage::error::ErrorKind as StorageErrorKind;
use gudang_storage::{BackendHandle, FileInfo};
use std::collections::HashMap;
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};

/// How long a staged file must sit untouched before [`prune`] treats its
/// upload as abandoned.
pub const STAGED_GRACE: Duration = Duration::hours(1);

/// Differences between the storage directory and the metadata store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Files with no row.
    pub orphaned: Vec<FileInfo>,
    /// Rows with no file.
    pub missing: Vec<VideoRecord>,
    /// Rows whose recorded size doesn't match the file on disk.
    pub size_mismatches: Vec<(VideoRecord, FileInfo)>,
    /// Leftovers of uploads that never completed.
    pub staged: Vec<FileInfo>,
}
impl Report {
    pub fn is_clean(&self) -> bool {
        self.orphaned.is_empty() && self.missing.is_empty() && self.size_mismatches.is_empty() && self.staged.is_empty()
    }
}

/// Walk the storage directory and compare it with every recorded video.
///
/// Results are sorted by path/filename so reports are stable.
pub async fn reconcile(backend: &BackendHandle, repo: &Repository) -> Result<Report> {
    let records = repo.list().await.or_raise(|| ErrorKind::Metadata)?;
    let files = backend.list(None).await.or_raise(|| ErrorKind::Storage)?;

    let mut on_disk: HashMap<PathBuf, FileInfo> = HashMap::with_capacity(files.len());
    let mut report = Report::default();
    for file in files {
        if file.is_staged() {
            report.staged.push(file);
        } else {
            on_disk.insert(file.path.clone(), file);
        }
    }
    for record in records {
        match on_disk.remove(&PathBuf::from(&record.filename)) {
            None => report.missing.push(record),
            Some(file) if file.size != record.file_size => report.size_mismatches.push((record, file)),
            Some(_) => {},
        }
    }
    report.orphaned = on_disk.into_values().collect();

    report.orphaned.sort_by(|a, b| a.path.cmp(&b.path));
    report.staged.sort_by(|a, b| a.path.cmp(&b.path));
    report.missing.sort_by(|a, b| a.filename.cmp(&b.filename));
    report.size_mismatches.sort_by(|(a, _), (b, _)| a.filename.cmp(&b.filename));
    tracing::debug!(
        orphaned = report.orphaned.len(),
        missing = report.missing.len(),
        size_mismatches = report.size_mismatches.len(),
        staged = report.staged.len(),
        "Reconciled storage with metadata"
    );
    Ok(report)
}

/// Delete the orphaned files listed in `report`, and the staged files last
/// modified before `staged_before`.
///
/// Staged files modified since then may belong to an upload still in
/// progress and are left alone. Files that disappeared since the report was
/// made are skipped. Returns the paths actually deleted.
pub async fn prune(backend: &BackendHandle, report: &Report, staged_before: OffsetDateTime) -> Result<Vec<PathBuf>> {
    let abandoned = report.staged.iter().filter(|file| file.modified < staged_before);
    let mut deleted = Vec::new();
    for file in report.orphaned.iter().chain(abandoned) {
        match backend.delete(&file.path).await {
            Ok(()) => {
                tracing::info!(path = %file.path.display(), "Pruned unreferenced file");
                deleted.push(file.path.clone());
            },
            Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => {},
            Err(e) => return Err(e.raise(ErrorKind::Storage)),
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Upload, store_video};
    use gudang_metadata::{Database, NewVideo};
    use gudang_storage::backend::MockBackend;
    use std::path::Path;
    use std::sync::Arc;

    async fn setup() -> (Arc<MockBackend>, BackendHandle, Repository) {
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let repo = Repository::from(&Database::connect_in_memory().await.unwrap());
        (mock, backend, repo)
    }

    #[tokio::test]
    async fn test_clean_library() {
        let (_mock, backend, repo) = setup().await;
        let mut data: &[u8] = b"0123456789";
        store_video(&backend, &repo, Upload::new("clip.mp4", &mut data)).await.unwrap();
        let report = reconcile(&backend, &repo).await.unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[tokio::test]
    async fn test_detects_every_kind_of_drift() {
        let (_mock, backend, repo) = setup().await;
        // Row without file.
        repo.insert(NewVideo::now("missing.mp4", 10, "x")).await.unwrap();
        // Row with a file of the wrong size.
        repo.insert(NewVideo::now("resized.mkv", 10, "x")).await.unwrap();
        backend.write(Path::new("resized.mkv"), b"0123").await.unwrap();
        // File without row, and a leftover staged upload.
        backend.write(Path::new("orphan.mov"), b"data").await.unwrap();
        backend.write(Path::new(".staging/1-2-3.part"), b"data").await.unwrap();

        let report = reconcile(&backend, &repo).await.unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].filename, "missing.mp4");
        assert_eq!(report.size_mismatches.len(), 1);
        assert_eq!(report.size_mismatches[0].1.size, 4);
        assert_eq!(report.orphaned.len(), 1);
        assert_eq!(report.orphaned[0].path, Path::new("orphan.mov"));
        assert_eq!(report.staged.len(), 1);
    }

    #[tokio::test]
    async fn test_prune_deletes_only_unreferenced_files() {
        let (mock, backend, repo) = setup().await;
        let mut data: &[u8] = b"0123456789";
        store_video(&backend, &repo, Upload::new("keep.mp4", &mut data)).await.unwrap();
        backend.write(Path::new("orphan.mov"), b"data").await.unwrap();
        backend.write(Path::new(".staging/1-2-3.part"), b"data").await.unwrap();

        let report = reconcile(&backend, &repo).await.unwrap();
        let cutoff = OffsetDateTime::now_utc() + Duration::minutes(1);
        let deleted = prune(&backend, &report, cutoff).await.unwrap();
        assert_eq!(deleted.len(), 2);
        assert_eq!(mock.paths().await, vec![PathBuf::from("keep.mp4")]);
        assert!(reconcile(&backend, &repo).await.unwrap().is_clean());
        // Pruning a stale report again is harmless.
        assert!(prune(&backend, &report, cutoff).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_keeps_recently_staged_files() {
        let (mock, backend, repo) = setup().await;
        backend.write(Path::new("orphan.mov"), b"data").await.unwrap();
        backend.write(Path::new(".staging/1-2-3.part"), b"half an upl").await.unwrap();

        let report = reconcile(&backend, &repo).await.unwrap();
        assert_eq!(report.staged.len(), 1);
        let deleted = prune(&backend, &report, OffsetDateTime::now_utc() - STAGED_GRACE).await.unwrap();
        assert_eq!(deleted, vec![PathBuf::from("orphan.mov")]);
        assert_eq!(mock.paths().await, vec![PathBuf::from(".staging/1-2-3.part")]);
    }
}

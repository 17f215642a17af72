//! Listing and removing stored videos.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gudang_metadata::{Repository, VideoRecord};
use gudang_storage::error::ErrorKind as StorageErrorKind;
use gudang_storage::{BackendHandle, validate_file_name};
use std::path::Path;

/// What [`remove_video`] actually removed.
///
/// Removal is best-effort: a missing row or a missing file is not an error,
/// it just shows up here as `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub record_deleted: bool,
    pub file_deleted: bool,
}
impl Removal {
    /// Neither a row nor a file existed.
    pub fn is_noop(&self) -> bool {
        !self.record_deleted && !self.file_deleted
    }
}

/// All stored videos, most recently uploaded first.
pub async fn list_videos(repo: &Repository) -> Result<Vec<VideoRecord>> {
    repo.list().await.or_raise(|| ErrorKind::Metadata)
}

/// The stored video named `filename`, if any.
pub async fn get_video(repo: &Repository, filename: &str) -> Result<Option<VideoRecord>> {
    repo.get_by_filename(filename).await.or_raise(|| ErrorKind::Metadata)
}

/// Remove a video: first its row, then its file.
///
/// There is no rollback between the two steps. If the process dies after
/// the row is gone the file is left behind as an orphan for
/// [`reconcile`](crate::reconcile) to find.
pub async fn remove_video(backend: &BackendHandle, repo: &Repository, filename: &str) -> Result<Removal> {
    if let Err(e) = validate_file_name(filename).map(drop) {
        return Err(e.raise(ErrorKind::InvalidName(filename.to_string())));
    }
    let record_deleted = repo.delete_by_filename(filename).await.or_raise(|| ErrorKind::Metadata)?;
    let file_deleted = match backend.delete(Path::new(filename)).await {
        Ok(()) => true,
        Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => false,
        Err(e) => return Err(e.raise(ErrorKind::Storage)),
    };
    let removal = Removal { record_deleted, file_deleted };
    if removal.is_noop() {
        tracing::debug!(filename, "Nothing to remove");
    } else {
        tracing::info!(filename, record_deleted, file_deleted, "Removed video");
    }
    Ok(removal)
}

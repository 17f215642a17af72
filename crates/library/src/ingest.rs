//! Storing uploaded videos.
//!
//! An upload goes through these steps:
//!
//! 1. The name is validated as a storage key and checked against the
//!    metadata store. Known names are rejected before any byte is written.
//! 2. The bytes are streamed into a unique file under
//!    [`STAGING_DIR`](gudang_storage::STAGING_DIR).
//! 3. The size is read back from the staged file and the file is hashed in
//!    [`CHUNK_SIZE`](gudang_storage::hash::CHUNK_SIZE) pieces.
//! 4. The row is inserted. If that fails (including losing a race against
//!    another upload of the same name) the staged file is discarded.
//! 5. The staged file is renamed into place. If that fails the row is
//!    deleted again.
//!
//! An existing video's bytes are therefore never overwritten by a rejected
//! upload, and a committed row always points at the bytes it describes.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gudang_metadata::error::ErrorKind as MetadataErrorKind;
use gudang_metadata::{NewVideo, Repository, VideoRecord};
use gudang_storage::backend::UploadSource;
use gudang_storage::error::ErrorKind as StorageErrorKind;
use gudang_storage::hash::hash_reader;
use gudang_storage::{BackendHandle, STAGING_DIR, validate_file_name};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A video waiting to be stored.
pub struct Upload<'a> {
    /// Name the video was uploaded under; becomes its filename.
    pub name: String,
    /// Size reported by whoever supplied the upload. Informational only: the
    /// recorded size is always measured from the written file.
    pub declared_size: Option<u64>,
    /// The video's bytes.
    pub source: UploadSource<'a>,
}
impl<'a> Upload<'a> {
    pub fn new(name: impl Into<String>, source: UploadSource<'a>) -> Self {
        Self { name: name.into(), declared_size: None, source }
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }
}

/// A successfully stored video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub record: VideoRecord,
}
impl Ingested {
    /// Human-readable confirmation for the front end.
    pub fn message(&self) -> String {
        format!("Video {:?} stored successfully", self.record.filename)
    }
}

/// Store a video: write its bytes to the storage directory and record its
/// metadata.
///
/// Fails with [`ErrorKind::InvalidName`] if the name can't be a storage key
/// and with [`ErrorKind::Duplicate`] if a video with this name already
/// exists; in both cases nothing is written.
pub async fn store_video(backend: &BackendHandle, repo: &Repository, upload: Upload<'_>) -> Result<Ingested> {
    let Upload { name, declared_size, source } = upload;
    if let Err(e) = validate_file_name(&name).map(drop) {
        return Err(e.raise(ErrorKind::InvalidName(name)));
    }
    if repo.exists(&name).await.or_raise(|| ErrorKind::Metadata)? {
        exn::bail!(ErrorKind::Duplicate(name));
    }

    let staged = staging_path();
    tracing::debug!(backend = backend.name(), filename = %name, staged = %staged.display(), "Staging upload");
    match stage_and_commit(backend, repo, &name, &staged, declared_size, source).await {
        Ok(record) => {
            tracing::info!(
                filename = %record.filename,
                size = record.file_size,
                hash = %record.hash_value,
                "Stored video"
            );
            Ok(Ingested { record })
        },
        Err(e) => {
            discard(backend, &staged).await;
            Err(e)
        },
    }
}

async fn stage_and_commit(
    backend: &BackendHandle,
    repo: &Repository,
    name: &str,
    staged: &Path,
    declared_size: Option<u64>,
    source: UploadSource<'_>,
) -> Result<VideoRecord> {
    let copied = backend.write_stream(staged, source).await.or_raise(|| ErrorKind::Storage)?;
    let size = backend.stat(staged).await.or_raise(|| ErrorKind::Storage)?.size;
    if size != copied {
        tracing::warn!(filename = name, copied, size, "Staged file size differs from bytes copied");
    }
    if let Some(declared) = declared_size
        && declared != size
    {
        tracing::warn!(filename = name, declared, size, "Declared upload size differs from stored size");
    }

    let reader = backend.reader(staged).await.or_raise(|| ErrorKind::Storage)?;
    let hash = tokio::task::spawn_blocking(move || hash_reader(reader))
        .await
        .or_raise(|| ErrorKind::Hash)?
        .or_raise(|| ErrorKind::Hash)?;

    let record = match repo.insert(NewVideo::now(name, size, hash)).await {
        Ok(record) => record,
        Err(e) if matches!(&*e, MetadataErrorKind::Duplicate(_)) => {
            return Err(e.raise(ErrorKind::Duplicate(name.to_string())));
        },
        Err(e) => return Err(e.raise(ErrorKind::Metadata)),
    };

    if let Err(e) = backend.rename(staged, Path::new(name)).await {
        // Without its file the row would describe nothing.
        if let Err(undo) = repo.delete_by_filename(name).await {
            tracing::warn!(filename = name, error = ?undo, "Could not remove row of video that failed to store");
        }
        return Err(e.raise(ErrorKind::Storage));
    }
    Ok(record)
}

/// Best-effort removal of a staged upload.
async fn discard(backend: &BackendHandle, staged: &Path) {
    match backend.delete(staged).await {
        Ok(()) => tracing::debug!(staged = %staged.display(), "Discarded staged upload"),
        Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => {},
        Err(e) => tracing::warn!(staged = %staged.display(), error = ?e, "Could not discard staged upload"),
    }
}

/// Unique path under the staging directory for an in-flight upload.
///
/// The upload's name is left out so that any name short enough to be stored
/// is short enough to be staged.
fn staging_path() -> PathBuf {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let sequence = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    Path::new(STAGING_DIR).join(format!("{nanos}-{}-{sequence}.part", std::process::id()))
}

//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the interface the ingest
//! and catalog services use to reach the storage directory. The local
//! filesystem is the only production backend; an in-memory backend is
//! available behind the `mock` feature for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::FileInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::Read;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncRead;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub type BoxSyncRead = Box<dyn Read + Send + 'static>;
/// Source of an upload's bytes.
pub type UploadSource<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Unified interface for the storage directory.
///
/// All operations are asynchronous. Paths are relative to the storage root
/// and are validated with [`validate_path`](crate::validate_path) by every
/// implementation before use.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use gudang_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of(backend: &dyn StorageBackend, name: &str) -> Result<u64> {
///     let path = Path::new(name);
///     if backend.exists(path).await? {
///         Ok(backend.stat(path).await?.size)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream metadata of every file under the root, optionally restricted to
    /// paths starting with `prefix` (component-wise).
    ///
    /// Listing a prefix that doesn't exist yields nothing rather than an
    /// error.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Open a file for streaming reads.
    ///
    /// Returns a `'static` boxed [`Read`] suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking), e.g. to hash a video
    /// with [`hash_reader`](crate::hash::hash_reader):
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use gudang_storage::hash::hash_reader;
    /// # use gudang_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let reader = backend.reader(Path::new("clip.mp4")).await?;
    /// let digest = tokio::task::spawn_blocking(move || hash_reader(reader)).await.unwrap().unwrap();
    /// println!("{digest}");
    /// # Ok(())
    /// # }
    /// ```
    async fn reader(&self, path: &Path) -> Result<BoxSyncRead>;

    /// Write file contents, creating or overwriting the file.
    ///
    /// Implementations create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Stream `source` into a file until it is exhausted, creating or
    /// overwriting the file. Returns the number of bytes copied.
    ///
    /// Implementations create parent directories as needed and must not
    /// buffer the whole source in memory.
    async fn write_stream(&self, path: &Path, source: UploadSource<'_>) -> Result<u64>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Rename/move a file within the same backend, overwriting the
    /// destination if it exists.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the source
    /// file does not exist.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &Path) -> Result<FileInfo>;
}

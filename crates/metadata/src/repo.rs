//! Repository for [`VideoRecord`] rows.
//!
//! Each method is a single statement; nothing here spans a transaction.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{InsertRow, NewVideo, VideoRecord, VideoRow};
use exn::ResultExt;
use sqlx::SqlitePool;

/// Repository for managing video rows in the metadata store.
///
/// The only constraint enforced by the store is filename uniqueness: a
/// second insert under an existing filename fails with
/// [`ErrorKind::Duplicate`] and leaves the existing row untouched.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    // =========================================================================
    // Insert
    // =========================================================================

    /// Record a new video, returning it with its assigned id.
    ///
    /// Returns [`ErrorKind::Duplicate`] if the filename is already recorded.
    pub async fn insert(&self, video: NewVideo) -> Result<VideoRecord> {
        let row = InsertRow::try_from(&video)?;
        let result = sqlx::query(include_str!("../queries/insert_video.sql"))
            .bind(row.filename)
            .bind(row.original_name)
            .bind(row.upload_date)
            .bind(row.file_size)
            .bind(row.hash_value)
            .execute(&self.pool)
            .await;
        match result {
            Ok(done) => Ok(video.into_record(done.last_insert_rowid())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                exn::bail!(ErrorKind::Duplicate(video.filename))
            },
            Err(e) => Err(e).or_raise(|| ErrorKind::Database),
        }
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the video recorded under `filename`, if any.
    pub async fn get_by_filename(&self, filename: impl AsRef<str>) -> Result<Option<VideoRecord>> {
        let row: Option<VideoRow> = sqlx::query_as(include_str!("../queries/get_by_filename.sql"))
            .bind(filename.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(VideoRecord::try_from).transpose()
    }

    /// Whether a video is recorded under `filename`.
    pub async fn exists(&self, filename: impl AsRef<str>) -> Result<bool> {
        Ok(self.get_by_filename(filename).await?.is_some())
    }

    /// All videos, most recently uploaded first.
    ///
    /// Uploads sharing the same second are ordered by id, newest first.
    pub async fn list(&self) -> Result<Vec<VideoRecord>> {
        let rows: Vec<VideoRow> = sqlx::query_as(include_str!("../queries/list_videos.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(VideoRecord::try_from).collect()
    }

    /// Number of recorded videos.
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(include_str!("../queries/count_videos.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("row count"))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete the row for `filename`.
    ///
    /// Returns `true` if a row was deleted, `false` if there was none.
    pub async fn delete_by_filename(&self, filename: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_by_filename.sql"))
            .bind(filename.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

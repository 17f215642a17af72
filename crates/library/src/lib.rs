//! Video library services.
//!
//! Ties the storage directory ([`gudang_storage`]) and the metadata store
//! ([`gudang_metadata`]) together:
//! - [`ingest`] stores uploads,
//! - [`catalog`] lists and removes stored videos,
//! - [`reconcile`] finds files and rows that have drifted apart.
//!
//! The modules expose free functions taking the backend and repository
//! explicitly. [`Library`] bundles both for callers that don't want to carry
//! them around separately.

pub mod catalog;
pub mod error;
pub mod ingest;
pub mod reconcile;

pub use crate::catalog::Removal;
pub use crate::ingest::{Ingested, Upload};
pub use crate::reconcile::Report;
use crate::error::Result;
use gudang_metadata::{Repository, VideoRecord};
use gudang_storage::BackendHandle;
use std::path::PathBuf;
use time::OffsetDateTime;

/// A storage backend and the metadata repository describing it.
#[derive(Clone)]
pub struct Library {
    backend: BackendHandle,
    repo: Repository,
}
impl Library {
    pub fn new(backend: BackendHandle, repo: Repository) -> Self {
        Self { backend, repo }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// See [`ingest::store_video`].
    pub async fn store(&self, upload: Upload<'_>) -> Result<Ingested> {
        ingest::store_video(&self.backend, &self.repo, upload).await
    }

    /// See [`catalog::list_videos`].
    pub async fn list(&self) -> Result<Vec<VideoRecord>> {
        catalog::list_videos(&self.repo).await
    }

    /// See [`catalog::get_video`].
    pub async fn get(&self, filename: &str) -> Result<Option<VideoRecord>> {
        catalog::get_video(&self.repo, filename).await
    }

    /// See [`catalog::remove_video`].
    pub async fn remove(&self, filename: &str) -> Result<Removal> {
        catalog::remove_video(&self.backend, &self.repo, filename).await
    }

    /// See [`reconcile::reconcile`].
    pub async fn reconcile(&self) -> Result<Report> {
        reconcile::reconcile(&self.backend, &self.repo).await
    }

    /// See [`reconcile::prune`]. Staged files younger than
    /// [`STAGED_GRACE`](reconcile::STAGED_GRACE) are kept.
    pub async fn prune(&self, report: &Report) -> Result<Vec<PathBuf>> {
        let staged_before = OffsetDateTime::now_utc() - reconcile::STAGED_GRACE;
        reconcile::prune(&self.backend, report, staged_before).await
    }
}

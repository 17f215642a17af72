//! Storage Directory for gudang.
//!
//! Video files are kept as plain files keyed by their filename, relative to
//! the root of a [`StorageBackend`]. In-flight uploads are written under the
//! hidden [`STAGING_DIR`] and moved into place once their metadata has been
//! committed.

pub mod backend;
pub mod error;
pub mod hash;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::{validate as validate_path, validate_file_name};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;

/// Directory (relative to the storage root) holding uploads that have not
/// been committed to the metadata store yet.
pub const STAGING_DIR: &str = ".staging";

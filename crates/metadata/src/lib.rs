//! SQLite metadata store for stored videos.
//!
//! A single `videos` table records one row per file in the storage
//! directory: its filename (unique, the storage key), the name it was
//! uploaded under, when it was uploaded, its size and its MD5 checksum.
//! Rows are created on upload and deleted on removal; they are never
//! updated in place.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{NewVideo, VideoRecord};
pub use crate::repo::Repository;

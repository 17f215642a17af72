//! Path validation for the storage directory.
//!
//! Storage keys are relative paths. Nothing handed to a backend may escape
//! the storage root, and uploaded videos must sit directly inside it.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a storage path.
///
/// `.` components, repeated separators and trailing slashes are dropped, and
/// `..` is resolved as long as it never climbs above the storage root. Null
/// bytes, drive prefixes and paths that normalize to nothing are rejected with
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath).
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use gudang_storage::validate_path;
/// assert!(validate_path("clip.mp4").is_ok());
/// assert!(validate_path(".staging/42-clip.mp4").is_ok());
/// assert!(validate_path("../videos.db").is_err());
/// assert!(validate_path("a\0b.mp4").is_err());
/// assert_eq!(validate_path("./holiday//clip.mp4/").unwrap(), Path::new("holiday/clip.mp4"));
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive Path::components() on Unix but truncate
                // paths in C-based syscalls.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(original.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(original.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Validates a filename used as a storage key for an uploaded video.
///
/// Unlike [`validate`], the name must already be a single plain component:
/// no directories, no `.`/`..`, nothing hidden (a leading dot would collide
/// with the staging directory).
///
/// ```
/// use gudang_storage::validate_file_name;
/// assert!(validate_file_name("clip.mp4").is_ok());
/// assert!(validate_file_name("holiday/clip.mp4").is_err());
/// assert!(validate_file_name(".staging").is_err());
/// ```
pub fn validate_file_name(name: &str) -> Result<&str> {
    let path = Path::new(name);
    let mut components = path.components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(s)), None) if s == path.as_os_str()
    );
    if !plain || name.starts_with('.') || name.contains('\0') || name.contains('\\') {
        exn::bail!(ErrorKind::InvalidPath(path.to_path_buf()));
    }
    Ok(name)
}

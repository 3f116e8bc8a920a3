use std::io;
use std::path::{Path, PathBuf};

/// Per-file deletion failure, surfaced distinctly to the caller and never
/// silently swallowed.
#[derive(Debug)]
pub enum TrashError {
    /// The path no longer exists. Deliberately an explicit outcome rather
    /// than a silent success: the caller decides whether "already gone" is
    /// acceptable for its workflow.
    AlreadyGone(PathBuf),
    PermissionDenied(PathBuf),
    /// Platform trash failure (cross-volume moves, full trash, ...).
    Failed(PathBuf, String),
}

impl std::fmt::Display for TrashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrashError::AlreadyGone(path) => {
                write!(f, "Path is already gone: {}", path.display())
            }
            TrashError::PermissionDenied(path) => {
                write!(f, "Permission denied moving to trash: {}", path.display())
            }
            TrashError::Failed(path, reason) => {
                write!(f, "Could not move {} to trash: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for TrashError {}

/// Moves one path to the platform's recoverable trash location.
///
/// This engine never deletes permanently; restoring is always possible from
/// the OS trash. The operation is atomic per file: on error the file is
/// untouched.
pub fn move_to_trash(path: &Path) -> Result<(), TrashError> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(TrashError::AlreadyGone(path.to_path_buf()));
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(TrashError::PermissionDenied(path.to_path_buf()));
        }
        Err(e) => {
            return Err(TrashError::Failed(path.to_path_buf(), e.to_string()));
        }
    }

    trash::delete(path).map_err(|e| match e {
        trash::Error::CouldNotAccess { .. } => TrashError::PermissionDenied(path.to_path_buf()),
        other => TrashError::Failed(path.to_path_buf(), other.to_string()),
    })
}

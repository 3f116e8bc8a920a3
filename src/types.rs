use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::classify::{self, FileType, TypeOverrides};

/// One filesystem entry seen during a scan.
///
/// The file type is derived from the path once at construction time and
/// never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<SystemTime>,
    pub file_type: FileType,
    pub is_directory: bool,
}

impl FileRecord {
    pub fn new(
        id: u64,
        path: &Path,
        size: u64,
        modified: Option<SystemTime>,
        is_directory: bool,
    ) -> Self {
        Self::build(id, path, size, modified, is_directory, classify::classify(path))
    }

    /// Like `new`, with configured extension remaps consulted first.
    pub fn with_overrides(
        id: u64,
        path: &Path,
        size: u64,
        modified: Option<SystemTime>,
        is_directory: bool,
        overrides: &TypeOverrides,
    ) -> Self {
        Self::build(id, path, size, modified, is_directory, overrides.classify(path))
    }

    fn build(
        id: u64,
        path: &Path,
        size: u64,
        modified: Option<SystemTime>,
        is_directory: bool,
        file_type: FileType,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            id,
            name,
            path: path.display().to_string(),
            size,
            modified,
            file_type,
            is_directory,
        }
    }

    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// A set of files sharing identical byte size and content hash.
///
/// Invariant: `files.len() >= 2`, all members the same size, all members the
/// same hash. `wasted_space` is the bytes reclaimable by keeping one copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub size: u64,
    pub hash: String,
    pub files: Vec<FileRecord>,
    pub wasted_space: u64,
}

/// Aggregate for one breakdown bucket (a file type or a top-level folder).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketStats {
    pub bytes: u64,
    pub file_count: u64,
}

/// Key for files sitting directly in the scan root in the by-folder rollup.
pub const ROOT_BUCKET: &str = ".";

/// Size-by-type and size-by-top-level-folder rollups over one full scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageBreakdown {
    pub by_type: HashMap<FileType, BucketStats>,
    pub by_folder: HashMap<String, BucketStats>,
    pub total_files: u64,
    pub total_size: u64,
}

/// Immutable snapshot captured at scan completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned_path: String,
    pub total_files: u64,
    pub total_size: u64,
    pub skipped_paths: u64,
    pub by_type: HashMap<FileType, BucketStats>,
}

/// A path that could not be read during traversal or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub path: String,
    pub error: String,
}

/// Free/total space of the volume holding the scan root, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskUsage {
    pub total_space: u64,
    pub available_space: u64,
    pub used_space: u64,
    pub used_percent: f64,
}

/// Everything one completed scan session publishes to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub summary: ScanSummary,
    pub breakdown: StorageBreakdown,
    pub records: Vec<FileRecord>,
    pub large_files: Vec<FileRecord>,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_usage: Option<DiskUsage>,
}

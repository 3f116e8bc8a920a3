use crate::classify::TypeOverrides;
use crate::state::{estimate_progress, CancelToken, ScanStateCell};
use crate::types::{FileRecord, Warning};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// How often (in visited files) progress is pushed into the state cell.
const PROGRESS_BATCH: u64 = 64;

/// Directory names whose contents are never worth descending into by
/// default: package internals produce pathological run times and
/// meaningless duplicate hits.
const BUNDLE_SUFFIXES: &[&str] = &[".app", ".framework", ".bundle", ".xcodeproj"];

#[derive(Debug)]
pub struct WalkStats {
    pub total_bytes: u64,
    pub file_count: u64,
    pub dir_count: u64,
    pub warnings: Vec<Warning>,
    pub cancelled: bool,
}

/// A failure at the scan root itself. Nested failures are recoverable and
/// land in `WalkStats::warnings` instead.
#[derive(Debug)]
pub enum WalkError {
    RootNotFound(PathBuf),
    RootNotADirectory(PathBuf),
    RootUnreadable(PathBuf, std::io::Error),
}

impl std::fmt::Display for WalkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalkError::RootNotFound(path) => {
                write!(f, "Scan root does not exist: {}", path.display())
            }
            WalkError::RootNotADirectory(path) => {
                write!(f, "Scan root is not a directory: {}", path.display())
            }
            WalkError::RootUnreadable(path, e) => {
                write!(f, "Cannot read scan root {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for WalkError {}

/// Recursive directory traversal with exclusion rules, cooperative
/// cancellation, and progressive state reporting.
pub struct Walker {
    follow_symlinks: bool,
    max_depth: Option<usize>,
    exclude_patterns: Vec<String>,
    skip_hidden: bool,
    skip_bundles: bool,
    type_overrides: TypeOverrides,
}

impl Walker {
    pub fn new(
        follow_symlinks: bool,
        max_depth: Option<usize>,
        exclude_patterns: Vec<String>,
        skip_hidden: bool,
        skip_bundles: bool,
    ) -> Self {
        Self {
            follow_symlinks,
            max_depth,
            exclude_patterns,
            skip_hidden,
            skip_bundles,
            type_overrides: TypeOverrides::default(),
        }
    }

    /// Applies configured extension remaps when classifying records.
    pub fn with_type_overrides(mut self, overrides: TypeOverrides) -> Self {
        self.type_overrides = overrides;
        self
    }

    /// Walks `root` depth-first, invoking `callback` once per regular file.
    ///
    /// Progress `(estimate, items_found)` is pushed into `state` after each
    /// batch of files; the estimate is advisory only since the total file
    /// count is unknown upfront. The cancel token is polled per entry, so
    /// cancellation latency is bounded by a single metadata read.
    ///
    /// Symbolic links are not followed unless configured; when they are,
    /// walkdir's own loop detection turns link cycles into recoverable
    /// warnings rather than unbounded traversal.
    pub fn walk<F>(
        &self,
        root: &Path,
        state: &ScanStateCell,
        cancel: &CancelToken,
        mut callback: F,
    ) -> Result<WalkStats, WalkError>
    where
        F: FnMut(FileRecord),
    {
        self.check_root(root)?;

        let mut stats = WalkStats {
            total_bytes: 0,
            file_count: 0,
            dir_count: 0,
            warnings: Vec::new(),
            cancelled: false,
        };
        let mut next_id: u64 = 0;

        let mut walker = WalkDir::new(root).follow_links(self.follow_symlinks);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let iter = walker
            .into_iter()
            .filter_entry(|entry| self.should_descend(entry, root));

        for entry_result in iter {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            match entry_result {
                Ok(entry) => {
                    if let Err(e) = self.process_entry(&entry, &mut stats, &mut next_id, &mut callback)
                    {
                        stats.warnings.push(Warning {
                            path: entry.path().display().to_string(),
                            error: e.to_string(),
                        });
                    }
                }
                Err(e) => {
                    stats.warnings.push(Warning {
                        path: e
                            .path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "unknown".to_string()),
                        error: e.to_string(),
                    });
                }
            }

            if stats.file_count % PROGRESS_BATCH == 0 {
                state.report(estimate_progress(stats.file_count), stats.file_count);
            }
        }

        state.report(estimate_progress(stats.file_count), stats.file_count);
        Ok(stats)
    }

    fn check_root(&self, root: &Path) -> Result<(), WalkError> {
        let metadata = std::fs::metadata(root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WalkError::RootNotFound(root.to_path_buf())
            } else {
                WalkError::RootUnreadable(root.to_path_buf(), e)
            }
        })?;

        if !metadata.is_dir() {
            return Err(WalkError::RootNotADirectory(root.to_path_buf()));
        }

        // Listing failures (typically EACCES) are fatal here, unlike nested
        // directories where they only produce a warning.
        std::fs::read_dir(root)
            .map(|_| ())
            .map_err(|e| WalkError::RootUnreadable(root.to_path_buf(), e))
    }

    fn should_descend(&self, entry: &DirEntry, root: &Path) -> bool {
        // Never filter out the root itself.
        if entry.path() == root {
            return true;
        }

        let name = entry.file_name().to_string_lossy();

        if self.skip_hidden && name.starts_with('.') {
            return false;
        }

        if self.skip_bundles
            && entry.file_type().is_dir()
            && BUNDLE_SUFFIXES
                .iter()
                .any(|suffix| name.to_lowercase().ends_with(suffix))
        {
            return false;
        }

        if !self.exclude_patterns.is_empty() {
            let path_str = entry.path().to_string_lossy();
            if self.exclude_patterns.iter().any(|p| path_str.contains(p)) {
                return false;
            }
        }

        true
    }

    fn process_entry<F>(
        &self,
        entry: &DirEntry,
        stats: &mut WalkStats,
        next_id: &mut u64,
        callback: &mut F,
    ) -> std::io::Result<()>
    where
        F: FnMut(FileRecord),
    {
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            stats.dir_count += 1;
        } else if metadata.is_file() {
            let size = metadata.len();
            stats.total_bytes += size;
            stats.file_count += 1;

            let id = *next_id;
            *next_id += 1;

            callback(FileRecord::with_overrides(
                id,
                entry.path(),
                size,
                metadata.modified().ok(),
                false,
                &self.type_overrides,
            ));
        }

        Ok(())
    }
}

use crate::aggregate::StorageAggregator;
use crate::classify::TypeOverrides;
use crate::duplicates::{DuplicateFinder, DuplicateScan};
use crate::select;
use crate::state::{CancelToken, ScanState, ScanStateCell};
use crate::trash_bin::{self, TrashError};
use crate::types::{DiskUsage, FileRecord, ScanOutcome};
use crate::walker::Walker;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Per-scan configuration, passed explicitly by the caller. No environment
/// variables or global state feed the engine.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub min_size_bytes: u64,
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
    pub exclude_patterns: Vec<String>,
    pub skip_hidden: bool,
    pub skip_bundles: bool,
    pub collect_disk_usage: bool,
    pub type_overrides: TypeOverrides,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_size_bytes: 0,
            follow_symlinks: false,
            max_depth: None,
            exclude_patterns: Vec::new(),
            skip_hidden: false,
            skip_bundles: true,
            collect_disk_usage: false,
            type_overrides: TypeOverrides::default(),
        }
    }
}

/// Coordinates scan sessions and owns all mutable scan state.
///
/// One engine instance runs at most one scan at a time; starting a new scan
/// while one is in flight cancels the running one and waits for it before
/// spawning the next worker, so two sessions can never race on the shared
/// state cell. Callers observe the engine only through `state()` and the
/// published immutable snapshots.
///
/// Each session is independent: construct one engine per caller rather than
/// sharing a process-wide instance.
pub struct ScanEngine {
    state: ScanStateCell,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
    outcome: Arc<Mutex<Option<Arc<ScanOutcome>>>>,
    duplicates: Arc<Mutex<Option<Arc<DuplicateScan>>>>,
}

impl ScanEngine {
    pub fn new() -> Self {
        Self {
            state: ScanStateCell::new(),
            cancel: CancelToken::new(),
            worker: None,
            outcome: Arc::new(Mutex::new(None)),
            duplicates: Arc::new(Mutex::new(None)),
        }
    }

    /// Current state of the active (or most recent) scan session.
    pub fn state(&self) -> ScanState {
        self.state.get()
    }

    /// Latest published full-scan snapshot, if any scan has completed.
    pub fn latest_outcome(&self) -> Option<Arc<ScanOutcome>> {
        self.outcome.lock().clone()
    }

    /// Latest published duplicate-detection result. Partial when the pass
    /// was cancelled.
    pub fn latest_duplicates(&self) -> Option<Arc<DuplicateScan>> {
        self.duplicates.lock().clone()
    }

    /// Requests cancellation of whichever scan is active. Cooperative: the
    /// worker notices at its next per-file poll.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks until the in-flight worker (if any) has finished.
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            // A panicked worker already left the state cell terminal.
            let _ = handle.join();
        }
    }

    /// Starts a full scan session: walk, aggregate, large-file selection.
    ///
    /// Any in-flight scan is cancelled and joined first. The session ends
    /// with the state cell in `Complete`, `Error`, or `Cancelled`; on
    /// completion an immutable `ScanOutcome` snapshot is published.
    pub fn start_scan(&mut self, root: PathBuf, options: ScanOptions) {
        self.restart();

        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let outcome_slot = Arc::clone(&self.outcome);

        self.worker = Some(std::thread::spawn(move || {
            run_scan(root, options, &state, &cancel, &outcome_slot);
        }));
    }

    /// Starts a duplicate-detection session over previously collected
    /// candidates (typically the large-file selection of the last scan).
    ///
    /// Shares the single-session discipline with `start_scan`. On
    /// cancellation the groups confirmed so far are still published.
    pub fn start_duplicate_scan(&mut self, candidates: Vec<FileRecord>) {
        self.restart();

        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let dup_slot = Arc::clone(&self.duplicates);

        self.worker = Some(std::thread::spawn(move || {
            run_duplicate_scan(candidates, &state, &cancel, &dup_slot);
        }));
    }

    /// Moves one previously scanned file to the platform trash. Independent
    /// of scanning; the duplicate hasher tolerates files disappearing
    /// underneath it as a skip.
    pub fn trash(&self, record: &FileRecord) -> Result<(), TrashError> {
        trash_bin::move_to_trash(&record.path_buf())
    }

    fn restart(&mut self) {
        self.cancel.cancel();
        self.wait();
        self.cancel.reset();
        self.state.begin();
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.wait();
    }
}

fn run_scan(
    root: PathBuf,
    options: ScanOptions,
    state: &ScanStateCell,
    cancel: &CancelToken,
    outcome_slot: &Mutex<Option<Arc<ScanOutcome>>>,
) {
    let walker = Walker::new(
        options.follow_symlinks,
        options.max_depth,
        options.exclude_patterns.clone(),
        options.skip_hidden,
        options.skip_bundles,
    )
    .with_type_overrides(options.type_overrides.clone());

    let mut aggregator = StorageAggregator::new(&root);
    let mut records: Vec<FileRecord> = Vec::new();

    let stats = match walker.walk(&root, state, cancel, |record| {
        aggregator.process_record(&record);
        records.push(record);
    }) {
        Ok(stats) => stats,
        Err(e) => {
            state.fail(e.to_string());
            return;
        }
    };

    if stats.cancelled {
        state.cancel();
        return;
    }

    let (breakdown, summary) = aggregator.finalize(&root, stats.warnings.len() as u64);
    let large_files = select::select_large(&records, options.min_size_bytes);
    let disk_usage = if options.collect_disk_usage {
        disk_usage_for(&root)
    } else {
        None
    };

    *outcome_slot.lock() = Some(Arc::new(ScanOutcome {
        summary,
        breakdown,
        records,
        large_files,
        warnings: stats.warnings,
        disk_usage,
    }));
    state.finish();
}

fn run_duplicate_scan(
    candidates: Vec<FileRecord>,
    state: &ScanStateCell,
    cancel: &CancelToken,
    dup_slot: &Mutex<Option<Arc<DuplicateScan>>>,
) {
    let total = candidates.len() as u64;
    let finder = DuplicateFinder::from_candidates(&candidates);

    let scan = finder.find_duplicates(cancel, |fraction| {
        state.report(fraction, total);
    });
    let cancelled = scan.cancelled;

    // Publish before the terminal transition so a caller that observes
    // `Cancelled` already sees the partial groups.
    *dup_slot.lock() = Some(Arc::new(scan));

    if cancelled {
        state.cancel();
    } else {
        state.finish();
    }
}

/// Total/available space of the volume containing `path`, for the display
/// header. Best-effort: `None` when the volume cannot be resolved.
fn disk_usage_for(path: &Path) -> Option<DiskUsage> {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let canonical = path.canonicalize().ok()?;

    let disk = disks
        .iter()
        .filter(|d| canonical.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;

    let total_space = disk.total_space();
    let available_space = disk.available_space();
    let used_space = total_space.saturating_sub(available_space);
    let used_percent = if total_space > 0 {
        (used_space as f64 / total_space as f64) * 100.0
    } else {
        0.0
    };

    Some(DiskUsage {
        total_space,
        available_space,
        used_space,
        used_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ROOT_BUCKET;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn wait_terminal(engine: &mut ScanEngine) -> ScanState {
        engine.wait();
        let state = engine.state();
        assert!(state.is_terminal(), "scan left non-terminal: {:?}", state);
        state
    }

    #[test]
    fn test_scenario_scan_select_and_duplicates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), vec![1u8; 500]).unwrap();
        fs::write(dir.path().join("b.txt"), vec![1u8; 500]).unwrap();
        fs::write(dir.path().join("c.bin"), vec![2u8; 500]).unwrap();
        fs::create_dir(dir.path().join("d")).unwrap();
        fs::write(dir.path().join("d/sub.txt"), vec![3u8; 2000]).unwrap();

        let mut engine = ScanEngine::new();
        engine.start_scan(
            dir.path().to_path_buf(),
            ScanOptions {
                min_size_bytes: 1000,
                ..ScanOptions::default()
            },
        );
        assert_eq!(wait_terminal(&mut engine), ScanState::Complete);

        let outcome = engine.latest_outcome().unwrap();
        assert_eq!(outcome.summary.total_files, 4);
        assert_eq!(outcome.summary.total_size, 3500);
        assert_eq!(outcome.large_files.len(), 1);
        assert!(outcome.large_files[0].path.ends_with("sub.txt"));
        assert_eq!(outcome.breakdown.by_folder["d"].bytes, 2000);
        assert_eq!(outcome.breakdown.by_folder[ROOT_BUCKET].bytes, 1500);

        engine.start_duplicate_scan(outcome.records.clone());
        assert_eq!(wait_terminal(&mut engine), ScanState::Complete);

        let dup = engine.latest_duplicates().unwrap();
        assert_eq!(dup.groups.len(), 1);
        assert_eq!(dup.groups[0].files.len(), 2);
        assert_eq!(dup.groups[0].wasted_space, 500);
        let names: Vec<&str> = dup.groups[0].files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_scan_applies_configured_type_remaps() {
        use crate::classify::FileType;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("trace.log"), vec![0u8; 64]).unwrap();

        let mut engine = ScanEngine::new();
        engine.start_scan(
            dir.path().to_path_buf(),
            ScanOptions {
                type_overrides: TypeOverrides::from_pairs([(
                    "log".to_string(),
                    FileType::Document,
                )]),
                ..ScanOptions::default()
            },
        );
        assert_eq!(wait_terminal(&mut engine), ScanState::Complete);

        let outcome = engine.latest_outcome().unwrap();
        assert_eq!(outcome.records[0].file_type, FileType::Document);
        assert_eq!(outcome.breakdown.by_type[&FileType::Document].bytes, 64);
    }

    #[test]
    fn test_scan_error_on_missing_root() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone");

        let mut engine = ScanEngine::new();
        engine.start_scan(missing, ScanOptions::default());

        match wait_terminal(&mut engine) {
            ScanState::Error(message) => assert!(message.contains("does not exist")),
            other => panic!("expected error state, got {:?}", other),
        }
        assert!(engine.latest_outcome().is_none());
    }

    #[test]
    fn test_cancel_terminates_promptly() {
        let dir = tempdir().unwrap();
        for i in 0..1000 {
            fs::write(dir.path().join(format!("f{i:04}.dat")), b"x").unwrap();
        }

        let mut engine = ScanEngine::new();
        engine.start_scan(dir.path().to_path_buf(), ScanOptions::default());
        engine.cancel();

        let started = Instant::now();
        engine.wait();
        assert!(started.elapsed() < Duration::from_secs(1));

        let state = engine.state();
        assert!(state.is_terminal());

        // Terminal means terminal: no further updates arrive afterwards.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.state(), state);
    }

    #[test]
    fn test_new_scan_replaces_previous_session() {
        let dir_a = tempdir().unwrap();
        fs::write(dir_a.path().join("one.txt"), b"1").unwrap();
        let dir_b = tempdir().unwrap();
        fs::write(dir_b.path().join("two.txt"), b"22").unwrap();
        fs::write(dir_b.path().join("three.txt"), b"333").unwrap();

        let mut engine = ScanEngine::new();
        engine.start_scan(dir_a.path().to_path_buf(), ScanOptions::default());
        engine.start_scan(dir_b.path().to_path_buf(), ScanOptions::default());
        assert_eq!(wait_terminal(&mut engine), ScanState::Complete);

        let outcome = engine.latest_outcome().unwrap();
        assert_eq!(outcome.summary.scanned_path, dir_b.path().display().to_string());
        assert_eq!(outcome.summary.total_files, 2);
    }

    #[test]
    fn test_cancelled_duplicate_scan_publishes_partial_result() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), b"pair").unwrap();
        fs::write(dir.path().join("b.bin"), b"pair").unwrap();
        let records = vec![
            FileRecord::new(0, &dir.path().join("a.bin"), 4, None, false),
            FileRecord::new(1, &dir.path().join("b.bin"), 4, None, false),
        ];

        let mut engine = ScanEngine::new();
        // Flag set before the worker's first poll: the pass stops at once
        // but still publishes its (empty) partial result.
        engine.start_duplicate_scan(records);
        engine.cancel();
        engine.wait();

        assert!(engine.state().is_terminal());
        assert!(engine.latest_duplicates().is_some());
    }

    #[test]
    fn test_trash_missing_record_is_typed_error() {
        let dir = tempdir().unwrap();
        let record = FileRecord::new(0, &dir.path().join("ghost.txt"), 1, None, false);

        let engine = ScanEngine::new();
        assert!(matches!(
            engine.trash(&record),
            Err(TrashError::AlreadyGone(_))
        ));
    }
}

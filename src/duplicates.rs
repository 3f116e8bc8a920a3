use crate::state::CancelToken;
use crate::types::{DuplicateGroup, FileRecord, Warning};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Prefix length for the cheap first-pass hash within a size bucket.
const QUICK_HASH_BYTES: usize = 4096;

/// Chunk size for streaming full-content hashes. Large files are never
/// loaded into memory whole.
const HASH_CHUNK_BYTES: usize = 128 * 1024;

/// Result of one duplicate-detection pass. `cancelled` marks a pass that
/// stopped early; `groups` then holds whatever was confirmed before the
/// cancellation rather than being discarded.
#[derive(Debug)]
pub struct DuplicateScan {
    pub groups: Vec<DuplicateGroup>,
    pub warnings: Vec<Warning>,
    pub cancelled: bool,
}

/// Two-stage duplicate confirmation: candidates are partitioned by exact
/// byte size (singleton sizes cannot contain duplicates), then confirmed by
/// a streaming blake3 content hash within each size bucket, with a short
/// prefix hash as a prefilter before re-reading whole files.
pub struct DuplicateFinder {
    size_buckets: HashMap<u64, Vec<FileRecord>>,
}

impl DuplicateFinder {
    pub fn new() -> Self {
        Self {
            size_buckets: HashMap::new(),
        }
    }

    pub fn from_candidates(candidates: &[FileRecord]) -> Self {
        let mut finder = Self::new();
        for record in candidates {
            finder.add_file(record.clone());
        }
        finder
    }

    pub fn add_file(&mut self, record: FileRecord) {
        if record.is_directory {
            return;
        }
        self.size_buckets
            .entry(record.size)
            .or_default()
            .push(record);
    }

    /// Runs the confirmation pass.
    ///
    /// `progress` receives the fraction of size buckets processed so far.
    /// The cancel token is polled between buckets and between read chunks
    /// inside each file hash; on cancellation the groups confirmed so far
    /// are returned. Files that cannot be read (vanished or permission
    /// denied mid-pass) are dropped from their bucket with a warning; a
    /// bucket left with fewer than two members is dropped entirely.
    pub fn find_duplicates<F>(&self, cancel: &CancelToken, mut progress: F) -> DuplicateScan
    where
        F: FnMut(f64),
    {
        let mut groups = Vec::new();
        let mut warnings = Vec::new();
        let mut cancelled = false;

        // Deterministic bucket order: largest sizes first, so the most
        // valuable groups are confirmed before any cancellation.
        let mut buckets: Vec<(&u64, &Vec<FileRecord>)> = self
            .size_buckets
            .iter()
            .filter(|(_, records)| records.len() >= 2)
            .collect();
        buckets.sort_by(|a, b| b.0.cmp(a.0));

        let total_buckets = buckets.len();
        progress(0.0);

        for (done, (size, records)) in buckets.into_iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            self.confirm_bucket(*size, records, cancel, &mut groups, &mut warnings);

            progress((done + 1) as f64 / total_buckets.max(1) as f64);
        }

        if !cancelled {
            progress(1.0);
        }

        sort_groups(&mut groups);

        DuplicateScan {
            groups,
            warnings,
            cancelled,
        }
    }

    fn confirm_bucket(
        &self,
        size: u64,
        records: &[FileRecord],
        cancel: &CancelToken,
        groups: &mut Vec<DuplicateGroup>,
        warnings: &mut Vec<Warning>,
    ) {
        // Stage 1.5: prefix hash prefilter. Files differing in their first
        // 4 KiB cannot be duplicates, so they skip the full re-read.
        let quick: Vec<(&FileRecord, io::Result<String>)> = records
            .par_iter()
            .map(|record| (record, hash_file_prefix(Path::new(&record.path))))
            .collect();

        let mut quick_buckets: HashMap<String, Vec<&FileRecord>> = HashMap::new();
        for (record, result) in quick {
            match result {
                Ok(hash) => quick_buckets.entry(hash).or_default().push(record),
                Err(e) => warnings.push(Warning {
                    path: record.path.clone(),
                    error: e.to_string(),
                }),
            }
        }

        // Stage 2: full streaming hash within surviving prefix groups.
        for candidates in quick_buckets.into_values() {
            if candidates.len() < 2 || cancel.is_cancelled() {
                continue;
            }

            let full: Vec<(&FileRecord, io::Result<Option<String>>)> = candidates
                .par_iter()
                .map(|record| (*record, hash_file_full(Path::new(&record.path), cancel)))
                .collect();

            let mut full_buckets: HashMap<String, Vec<FileRecord>> = HashMap::new();
            for (record, result) in full {
                match result {
                    Ok(Some(hash)) => {
                        full_buckets.entry(hash).or_default().push(record.clone())
                    }
                    // Interrupted by cancellation; no hash, no warning.
                    Ok(None) => continue,
                    Err(e) => warnings.push(Warning {
                        path: record.path.clone(),
                        error: e.to_string(),
                    }),
                }
            }

            for (hash, mut files) in full_buckets {
                if files.len() < 2 {
                    continue;
                }
                files.sort_by(|a, b| a.path.cmp(&b.path));
                let wasted_space = size * (files.len() as u64 - 1);
                groups.push(DuplicateGroup {
                    size,
                    hash,
                    files,
                    wasted_space,
                });
            }
        }
    }
}

impl Default for DuplicateFinder {
    fn default() -> Self {
        Self::new()
    }
}

/// Display ordering: biggest reclaimable space first, then per-file size,
/// then first member path for a stable, deterministic listing.
fn sort_groups(groups: &mut [DuplicateGroup]) {
    groups.sort_by(|a, b| {
        b.wasted_space
            .cmp(&a.wasted_space)
            .then_with(|| b.size.cmp(&a.size))
            .then_with(|| {
                let a_first = a.files.first().map(|f| f.path.as_str()).unwrap_or("");
                let b_first = b.files.first().map(|f| f.path.as_str()).unwrap_or("");
                a_first.cmp(b_first)
            })
    });
}

fn hash_file_prefix(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; QUICK_HASH_BYTES];
    let n = file.read(&mut buffer)?;
    buffer.truncate(n);

    Ok(blake3::hash(&buffer).to_hex().to_string())
}

/// Streams the whole file through blake3 in fixed-size chunks, polling the
/// cancel token between chunks. `Ok(None)` means the read was interrupted
/// by cancellation.
fn hash_file_full(path: &Path, cancel: &CancelToken) -> io::Result<Option<String>> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_BYTES];

    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(Some(hasher.finalize().to_hex().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record_for(path: &Path) -> FileRecord {
        let size = fs::metadata(path).unwrap().len();
        FileRecord::new(0, path, size, None, false)
    }

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> FileRecord {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        record_for(&path)
    }

    #[test]
    fn test_no_duplicates_for_distinct_content() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"content1");
        let b = write_file(dir.path(), "b.bin", b"content2");

        let finder = DuplicateFinder::from_candidates(&[a, b]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});

        assert!(scan.groups.is_empty());
        assert!(!scan.cancelled);
    }

    #[test]
    fn test_identical_files_form_one_group() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"same content");
        let b = write_file(dir.path(), "b.bin", b"same content");
        let c = write_file(dir.path(), "c.bin", b"same content");
        let d = write_file(dir.path(), "d.bin", b"other stuff!");

        let finder = DuplicateFinder::from_candidates(&[a, b, c, d]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});

        assert_eq!(scan.groups.len(), 1);
        let group = &scan.groups[0];
        assert_eq!(group.files.len(), 3);
        assert_eq!(group.size, 12);
        assert_eq!(group.wasted_space, 24);
    }

    #[test]
    fn test_group_invariants_hold() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"xxxxxxxx");
        let b = write_file(dir.path(), "b.bin", b"xxxxxxxx");
        let c = write_file(dir.path(), "c.bin", b"yyyyyyyy");
        let d = write_file(dir.path(), "d.bin", b"yyyyyyyy");

        let finder = DuplicateFinder::from_candidates(&[a, b, c, d]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});

        assert_eq!(scan.groups.len(), 2);
        for group in &scan.groups {
            assert!(group.files.len() >= 2);
            assert!(group.files.iter().all(|f| f.size == group.size));
            assert_eq!(group.wasted_space, group.size * (group.files.len() as u64 - 1));
        }
        // Same wasted space and size: tie broken by first path.
        let first_paths: Vec<&str> = scan
            .groups
            .iter()
            .map(|g| g.files[0].path.as_str())
            .collect();
        assert!(first_paths[0] < first_paths[1]);
    }

    #[test]
    fn test_same_size_different_content_not_grouped() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"AAAA");
        let b = write_file(dir.path(), "b.bin", b"BBBB");

        let finder = DuplicateFinder::from_candidates(&[a, b]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});
        assert!(scan.groups.is_empty());
    }

    #[test]
    fn test_prefix_collision_resolved_by_full_hash() {
        // Identical first 4 KiB, divergent tails.
        let dir = tempdir().unwrap();
        let mut head = vec![7u8; QUICK_HASH_BYTES];
        let mut one = head.clone();
        one.extend_from_slice(b"tail-one");
        head.extend_from_slice(b"tail-two");

        let a = write_file(dir.path(), "a.bin", &one);
        let b = write_file(dir.path(), "b.bin", &head);

        let finder = DuplicateFinder::from_candidates(&[a, b]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});
        assert!(scan.groups.is_empty());
    }

    #[test]
    fn test_vanished_file_dropped_with_warning() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"duplicated");
        let b = write_file(dir.path(), "b.bin", b"duplicated");
        let c = write_file(dir.path(), "c.bin", b"duplicated");
        fs::remove_file(dir.path().join("c.bin")).unwrap();

        let finder = DuplicateFinder::from_candidates(&[a, b, c]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});

        assert_eq!(scan.groups.len(), 1);
        assert_eq!(scan.groups[0].files.len(), 2);
        assert_eq!(scan.warnings.len(), 1);
        assert!(scan.warnings[0].path.ends_with("c.bin"));
    }

    #[test]
    fn test_vanished_file_can_dissolve_group() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"duplicated");
        let b = write_file(dir.path(), "b.bin", b"duplicated");
        fs::remove_file(dir.path().join("b.bin")).unwrap();

        let finder = DuplicateFinder::from_candidates(&[a, b]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});

        assert!(scan.groups.is_empty());
        assert_eq!(scan.warnings.len(), 1);
    }

    #[test]
    fn test_cancellation_returns_partial_results() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"zz");
        let b = write_file(dir.path(), "b.bin", b"zz");

        let cancel = CancelToken::new();
        cancel.cancel();

        let finder = DuplicateFinder::from_candidates(&[a, b]);
        let scan = finder.find_duplicates(&cancel, |_| {});

        assert!(scan.cancelled);
        assert!(scan.groups.is_empty());
    }

    #[test]
    fn test_groups_sorted_by_wasted_space() {
        let dir = tempdir().unwrap();
        let small1 = write_file(dir.path(), "s1.bin", b"ab");
        let small2 = write_file(dir.path(), "s2.bin", b"ab");
        let big = vec![9u8; 10_000];
        let big1 = write_file(dir.path(), "g1.bin", &big);
        let big2 = write_file(dir.path(), "g2.bin", &big);

        let finder = DuplicateFinder::from_candidates(&[small1, small2, big1, big2]);
        let scan = finder.find_duplicates(&CancelToken::new(), |_| {});

        assert_eq!(scan.groups.len(), 2);
        assert_eq!(scan.groups[0].wasted_space, 10_000);
        assert_eq!(scan.groups[1].wasted_space, 2);
    }

    #[test]
    fn test_progress_reaches_one_on_completion() {
        let dir = tempdir().unwrap();
        let a = write_file(dir.path(), "a.bin", b"pair");
        let b = write_file(dir.path(), "b.bin", b"pair");

        let mut last = -1.0f64;
        let finder = DuplicateFinder::from_candidates(&[a, b]);
        let scan = finder.find_duplicates(&CancelToken::new(), |p| {
            assert!(p >= last);
            last = p;
        });

        assert!(!scan.cancelled);
        assert!((last - 1.0).abs() < f64::EPSILON);
    }
}

use crate::types::{FileRecord, ScanSummary, StorageBreakdown, ROOT_BUCKET};
use std::path::{Component, Path, PathBuf};

/// Single-pass rollup of the file stream into two independent breakdowns:
/// size-by-type and size-by-top-level-folder.
///
/// By-folder buckets only the immediate child directory of the scan root;
/// files sitting directly in the root land in the `ROOT_BUCKET` entry.
/// Rebuilt wholesale on each full scan, never incrementally updated.
pub struct StorageAggregator {
    root: PathBuf,
    breakdown: StorageBreakdown,
}

impl StorageAggregator {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            breakdown: StorageBreakdown::default(),
        }
    }

    /// Folds one record into both rollups. O(1) per record.
    pub fn process_record(&mut self, record: &FileRecord) {
        if record.is_directory {
            return;
        }

        self.breakdown.total_files += 1;
        self.breakdown.total_size += record.size;

        let type_entry = self
            .breakdown
            .by_type
            .entry(record.file_type)
            .or_default();
        type_entry.bytes += record.size;
        type_entry.file_count += 1;

        let folder = self.top_level_folder(record);
        let folder_entry = self.breakdown.by_folder.entry(folder).or_default();
        folder_entry.bytes += record.size;
        folder_entry.file_count += 1;
    }

    fn top_level_folder(&self, record: &FileRecord) -> String {
        let path = Path::new(&record.path);
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => return ROOT_BUCKET.to_string(),
        };

        let mut components = rel.components();
        match (components.next(), components.next()) {
            // At least two components: the first is a top-level directory.
            (Some(first), Some(_)) => component_name(first),
            // A single component is the file itself, directly in root.
            _ => ROOT_BUCKET.to_string(),
        }
    }

    pub fn finalize(self, scanned_path: &Path, skipped_paths: u64) -> (StorageBreakdown, ScanSummary) {
        let summary = ScanSummary {
            scanned_path: scanned_path.display().to_string(),
            total_files: self.breakdown.total_files,
            total_size: self.breakdown.total_size,
            skipped_paths,
            by_type: self.breakdown.by_type.clone(),
        };
        (self.breakdown, summary)
    }
}

fn component_name(component: Component<'_>) -> String {
    component.as_os_str().to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FileType;

    fn record(root: &str, rel: &str, size: u64) -> FileRecord {
        let path = Path::new(root).join(rel);
        FileRecord::new(0, &path, size, None, false)
    }

    #[test]
    fn test_empty_input_yields_zero_summary() {
        let root = Path::new("/scan");
        let agg = StorageAggregator::new(root);
        let (breakdown, summary) = agg.finalize(root, 0);

        assert_eq!(breakdown.total_files, 0);
        assert_eq!(breakdown.total_size, 0);
        assert!(breakdown.by_type.is_empty());
        assert!(breakdown.by_folder.is_empty());
        assert_eq!(summary.total_size, 0);
    }

    #[test]
    fn test_by_type_sizes_conserve_total() {
        let root = Path::new("/scan");
        let mut agg = StorageAggregator::new(root);
        agg.process_record(&record("/scan", "movie.mp4", 1000));
        agg.process_record(&record("/scan", "pics/photo.jpg", 300));
        agg.process_record(&record("/scan", "pics/other.jpg", 200));
        agg.process_record(&record("/scan", "mystery", 77));

        let (breakdown, summary) = agg.finalize(root, 0);

        let by_type_total: u64 = breakdown.by_type.values().map(|b| b.bytes).sum();
        assert_eq!(by_type_total, 1577);
        assert_eq!(summary.total_size, 1577);
        assert_eq!(summary.total_files, 4);

        assert_eq!(breakdown.by_type[&FileType::Image].bytes, 500);
        assert_eq!(breakdown.by_type[&FileType::Image].file_count, 2);
        assert_eq!(breakdown.by_type[&FileType::Video].bytes, 1000);
        assert_eq!(breakdown.by_type[&FileType::Other].bytes, 77);
    }

    #[test]
    fn test_by_folder_buckets_top_level_children_only() {
        let root = Path::new("/scan");
        let mut agg = StorageAggregator::new(root);
        agg.process_record(&record("/scan", "docs/a.txt", 10));
        agg.process_record(&record("/scan", "docs/deep/nested/b.txt", 20));
        agg.process_record(&record("/scan", "media/c.mp3", 30));
        agg.process_record(&record("/scan", "loose.txt", 5));

        let (breakdown, _) = agg.finalize(root, 0);

        assert_eq!(breakdown.by_folder["docs"].bytes, 30);
        assert_eq!(breakdown.by_folder["docs"].file_count, 2);
        assert_eq!(breakdown.by_folder["media"].bytes, 30);
        assert_eq!(breakdown.by_folder[ROOT_BUCKET].bytes, 5);
    }

    #[test]
    fn test_directories_are_not_aggregated() {
        let root = Path::new("/scan");
        let mut agg = StorageAggregator::new(root);
        let dir = FileRecord::new(0, &root.join("sub"), 4096, None, true);
        agg.process_record(&dir);

        let (breakdown, _) = agg.finalize(root, 0);
        assert_eq!(breakdown.total_files, 0);
        assert_eq!(breakdown.total_size, 0);
    }
}

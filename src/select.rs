use crate::types::FileRecord;

/// Re-sort orders callers may apply on top of the default size-descending
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Size,
    Name,
    Modified,
    Type,
}

/// Filters `records` down to files of at least `min_bytes` (inclusive),
/// sorted by size descending with path as a deterministic tie-break.
///
/// A zero threshold selects everything. The filter is re-invocable with a
/// different threshold against a retained record set without re-walking the
/// filesystem.
pub fn select_large(records: &[FileRecord], min_bytes: u64) -> Vec<FileRecord> {
    let mut selected: Vec<FileRecord> = records
        .iter()
        .filter(|r| !r.is_directory && r.size >= min_bytes)
        .cloned()
        .collect();

    sort_records(&mut selected, SortKey::Size);
    selected
}

pub fn sort_records(records: &mut [FileRecord], key: SortKey) {
    match key {
        SortKey::Size => {
            records.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        }
        SortKey::Name => {
            records.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        }
        SortKey::Modified => {
            // Newest first; records with no timestamp sink to the end.
            records.sort_by(|a, b| {
                b.modified
                    .cmp(&a.modified)
                    .then_with(|| a.path.cmp(&b.path))
            });
        }
        SortKey::Type => {
            records.sort_by(|a, b| {
                a.file_type
                    .label()
                    .cmp(b.file_type.label())
                    .then_with(|| b.size.cmp(&a.size))
                    .then_with(|| a.path.cmp(&b.path))
            });
        }
    }
}

use crate::duplicates::DuplicateScan;
use crate::types::{BucketStats, DuplicateGroup, FileRecord, ScanOutcome, Warning};
use colored::*;
use humansize::{format_size, BINARY};
use serde::Serialize;
use std::io;
use std::path::Path;

const BAR_WIDTH: usize = 30;

pub struct TerminalRenderer {
    use_color: bool,
    top: usize,
}

impl TerminalRenderer {
    pub fn new(use_color: bool, top: usize) -> Self {
        Self { use_color, top }
    }

    pub fn render(&self, outcome: &ScanOutcome, duplicates: Option<&DuplicateScan>) {
        println!();
        self.print_header(outcome);
        println!();
        self.print_by_type(outcome);
        println!();
        self.print_by_folder(outcome);

        if !outcome.large_files.is_empty() {
            println!();
            self.print_large_files(&outcome.large_files);
        }

        if let Some(scan) = duplicates {
            println!();
            self.print_duplicates(scan);
        }

        if !outcome.warnings.is_empty() {
            println!();
            self.print_warnings(&outcome.warnings);
        }
        println!();
    }

    fn print_header(&self, outcome: &ScanOutcome) {
        println!(
            "  {}",
            self.colorize(
                &format!("Storage scan: {}", outcome.summary.scanned_path),
                "cyan",
                true
            )
        );
        println!(
            "  {} files, {} total, {} paths skipped",
            outcome.summary.total_files,
            format_size(outcome.summary.total_size, BINARY),
            outcome.summary.skipped_paths
        );

        if let Some(disk) = &outcome.disk_usage {
            println!(
                "  Volume: {} used of {} ({:.1}%)",
                self.colorize(&format_size(disk.used_space, BINARY), "yellow", false),
                format_size(disk.total_space, BINARY),
                disk.used_percent
            );
        }
    }

    fn print_by_type(&self, outcome: &ScanOutcome) {
        println!("  {}", self.colorize("By type", "white", true));

        let total = outcome.breakdown.total_size.max(1);
        let mut rows: Vec<(&str, &BucketStats)> = outcome
            .breakdown
            .by_type
            .iter()
            .map(|(t, stats)| (t.label(), stats))
            .collect();
        rows.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes).then_with(|| a.0.cmp(b.0)));

        for (label, stats) in rows {
            let percent = stats.bytes as f64 / total as f64 * 100.0;
            let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
            let bar = format!(
                "{}{}",
                "█".repeat(filled.min(BAR_WIDTH)),
                "░".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
            );
            println!(
                "  {:<13} {} {:>10} {:>5.1}%  ({} files)",
                label,
                self.colorize(&bar, percent_color(percent), false),
                format_size(stats.bytes, BINARY),
                percent,
                stats.file_count
            );
        }
    }

    fn print_by_folder(&self, outcome: &ScanOutcome) {
        println!("  {}", self.colorize("By top-level folder", "white", true));

        let mut rows: Vec<(&String, &BucketStats)> =
            outcome.breakdown.by_folder.iter().collect();
        rows.sort_by(|a, b| b.1.bytes.cmp(&a.1.bytes).then_with(|| a.0.cmp(b.0)));

        for (folder, stats) in rows.into_iter().take(self.top) {
            println!(
                "  {:>10}  {:<40} ({} files)",
                format_size(stats.bytes, BINARY),
                folder,
                stats.file_count
            );
        }
    }

    fn print_large_files(&self, files: &[FileRecord]) {
        println!("  {}", self.colorize("Largest files", "white", true));

        for record in files.iter().take(self.top) {
            println!(
                "  {:>10}  {:<12} {}",
                self.colorize(&format_size(record.size, BINARY), "yellow", false),
                record.file_type.label(),
                truncate_path(&record.path, 70)
            );
        }
        if files.len() > self.top {
            println!("  ... and {} more over the threshold", files.len() - self.top);
        }
    }

    fn print_duplicates(&self, scan: &DuplicateScan) {
        let wasted: u64 = scan.groups.iter().map(|g| g.wasted_space).sum();
        let title = if scan.cancelled {
            format!(
                "Duplicate groups (partial, cancelled): {} reclaimable",
                format_size(wasted, BINARY)
            )
        } else {
            format!(
                "Duplicate groups: {} reclaimable across {} groups",
                format_size(wasted, BINARY),
                scan.groups.len()
            )
        };
        println!("  {}", self.colorize(&title, "white", true));

        for group in scan.groups.iter().take(self.top) {
            println!(
                "  {} x {} ({} wasted)",
                group.files.len(),
                self.colorize(&format_size(group.size, BINARY), "yellow", false),
                format_size(group.wasted_space, BINARY)
            );
            for file in &group.files {
                println!("      {}", truncate_path(&file.path, 72));
            }
        }
        if scan.groups.len() > self.top {
            println!("  ... and {} more groups", scan.groups.len() - self.top);
        }
    }

    fn print_warnings(&self, warnings: &[Warning]) {
        println!(
            "  {}",
            self.colorize(&format!("{} paths skipped", warnings.len()), "yellow", true)
        );
        for warning in warnings.iter().take(self.top) {
            println!("  {} ({})", truncate_path(&warning.path, 60), warning.error);
        }
    }

    fn colorize(&self, text: &str, color: &str, bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }

        let colored = match color {
            "cyan" => text.cyan(),
            "yellow" => text.yellow(),
            "red" => text.red(),
            "green" => text.green(),
            "white" => text.white(),
            "bright_black" => text.bright_black(),
            _ => text.normal(),
        };

        if bold {
            colored.bold().to_string()
        } else {
            colored.to_string()
        }
    }
}

fn percent_color(percent: f64) -> &'static str {
    if percent > 50.0 {
        "red"
    } else if percent > 20.0 {
        "yellow"
    } else {
        "green"
    }
}

fn truncate_path(path: &str, max: usize) -> String {
    if path.chars().count() <= max {
        path.to_string()
    } else {
        let tail: String = path
            .chars()
            .rev()
            .take(max.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    }
}

/// Combined JSON report over one scan session.
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    outcome: &'a ScanOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicates: Option<&'a Vec<DuplicateGroup>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicates_partial: Option<bool>,
}

pub struct JsonRenderer;

impl JsonRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(
        &self,
        outcome: &ScanOutcome,
        duplicates: Option<&DuplicateScan>,
        output_path: Option<&Path>,
    ) -> io::Result<()> {
        let report = JsonReport {
            outcome,
            duplicates: duplicates.map(|d| &d.groups),
            duplicates_partial: duplicates.map(|d| d.cancelled),
        };
        let json = serde_json::to_string_pretty(&report)?;

        match output_path {
            Some(path) => std::fs::write(path, json + "\n"),
            None => {
                println!("{}", json);
                Ok(())
            }
        }
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes one row per scanned file: name, path, size, type.
pub fn export_csv(records: &[FileRecord], path: &Path) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["name", "path", "size_bytes", "type"])?;

    for record in records {
        writer.write_record([
            record.name.as_str(),
            record.path.as_str(),
            &record.size.to_string(),
            record.file_type.label(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

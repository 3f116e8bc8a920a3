use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "diskscout")]
#[command(about = "Scan a directory tree for storage breakdowns, large files, and duplicates", long_about = None)]
pub struct Cli {
    /// Path to scan (defaults to current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Minimum size for the large-file report (e.g. 1000000, 500KB, 2GB)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<String>,

    /// Confirm duplicates among the large-file candidates by content hash
    #[arg(long)]
    pub find_duplicates: bool,

    /// Substring patterns to exclude from traversal
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Follow symbolic links (disabled by default)
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Maximum depth for directory recursion
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Skip hidden files and directories
    #[arg(long)]
    pub skip_hidden: bool,

    /// Descend into application bundles (.app, .framework, ...)
    #[arg(long)]
    pub include_bundles: bool,

    /// Sort the large-file report: size, name, modified, or type
    #[arg(long, value_name = "KEY", default_value = "size")]
    pub sort: String,

    /// Number of large files and duplicate groups to print
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Show a progress spinner during the scan
    #[arg(long)]
    pub progress: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Output JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Export the full file list as CSV to file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Number of threads for duplicate hashing (0 = auto-detect)
    #[arg(long, default_value = "0")]
    pub threads: usize,

    /// Config file path (default: ~/.config/diskscout/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match self.sort.as_str() {
            "size" | "name" | "modified" | "type" => {}
            other => {
                return Err(format!(
                    "Invalid --sort key: {}. Must be size, name, modified, or type",
                    other
                ))
            }
        }

        if let Some(spec) = &self.min_size {
            parse_size(spec)?;
        }

        Ok(())
    }

    pub fn get_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn min_size_bytes(&self) -> Option<u64> {
        // Validated up front; a stale value here means validate() was skipped.
        self.min_size.as_ref().and_then(|s| parse_size(s).ok())
    }

    pub fn should_output_json(&self) -> bool {
        self.json || self.output.is_some()
    }
}

/// Parses a byte count with an optional binary-ish suffix: `512`, `100KB`,
/// `2MB`, `1GB`, `1TB` (suffixes are powers of 1024, case-insensitive).
pub fn parse_size(spec: &str) -> Result<u64, String> {
    let spec = spec.trim();
    let upper = spec.to_uppercase();

    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("TB") {
        (n, 1u64 << 40)
    } else if let Some(n) = upper.strip_suffix("GB") {
        (n, 1u64 << 30)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1u64 << 20)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1u64 << 10)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    let value: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("Invalid size: {}", spec))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Size overflows: {}", spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_plain_bytes() {
        assert_eq!(parse_size("512"), Ok(512));
        assert_eq!(parse_size("0"), Ok(0));
    }

    #[test]
    fn test_parse_size_suffixes() {
        assert_eq!(parse_size("100KB"), Ok(100 * 1024));
        assert_eq!(parse_size("2mb"), Ok(2 * 1024 * 1024));
        assert_eq!(parse_size("1GB"), Ok(1 << 30));
        assert_eq!(parse_size("1 TB"), Ok(1 << 40));
        assert_eq!(parse_size("64B"), Ok(64));
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("lots").is_err());
        assert!(parse_size("12.5MB").is_err());
        assert!(parse_size("").is_err());
    }
}

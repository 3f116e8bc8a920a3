mod aggregate;
mod classify;
mod cli;
mod config;
mod duplicates;
mod engine;
mod output;
mod progress;
mod select;
mod state;
mod trash_bin;
mod types;
mod walker;

use clap::Parser;
use cli::Cli;
use config::DiskscoutConfig;
use engine::{ScanEngine, ScanOptions};
use output::{JsonRenderer, TerminalRenderer};
use progress::ScanProgress;
use select::SortKey;
use state::ScanState;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let config = match DiskscoutConfig::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if cli.threads > 0 {
        // Global pool is used by the duplicate hasher.
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
        {
            eprintln!("Error: could not configure {} threads: {}", cli.threads, e);
            std::process::exit(2);
        }
    }

    let type_overrides = match config.type_overrides() {
        Ok(overrides) => overrides,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let path = cli.get_path();
    let options = ScanOptions {
        min_size_bytes: cli.min_size_bytes().unwrap_or(config.min_size_bytes),
        follow_symlinks: cli.follow_symlinks,
        max_depth: cli.max_depth,
        exclude_patterns: merge_excludes(&config.exclude, &cli.exclude),
        skip_hidden: cli.skip_hidden || config.skip_hidden,
        skip_bundles: config.skip_bundles && !cli.include_bundles,
        collect_disk_usage: !cli.should_output_json(),
        type_overrides,
    };

    let show_progress = cli.progress && !cli.should_output_json();
    let progress = ScanProgress::new(show_progress);

    let mut engine = ScanEngine::new();
    engine.start_scan(path, options);
    let final_state = poll_until_terminal(&engine, &progress, "Scanning");

    if let ScanState::Error(message) = final_state {
        eprintln!("Error: {}", message);
        std::process::exit(2);
    }

    let outcome = match engine.latest_outcome() {
        Some(outcome) => outcome,
        None => {
            // Cancelled before anything was published.
            eprintln!("Scan did not complete");
            std::process::exit(2);
        }
    };

    let duplicates = if cli.find_duplicates {
        engine.start_duplicate_scan(outcome.large_files.clone());
        let progress = ScanProgress::new(show_progress);
        let state = poll_until_terminal(&engine, &progress, "Hashing candidates");
        if let ScanState::Error(message) = state {
            eprintln!("Error: {}", message);
            std::process::exit(2);
        }
        engine.latest_duplicates()
    } else {
        None
    };

    if let Some(csv_path) = &cli.csv {
        if let Err(e) = output::export_csv(&outcome.records, csv_path) {
            eprintln!("Error writing CSV output: {}", e);
            std::process::exit(3);
        }
    }

    // Re-sort the large-file report for display; the snapshot itself stays
    // size-descending.
    let mut display = (*outcome).clone();
    select::sort_records(&mut display.large_files, sort_key(&cli.sort));

    if cli.should_output_json() {
        let renderer = JsonRenderer::new();
        if let Err(e) = renderer.render(&display, duplicates.as_deref(), cli.output.as_deref()) {
            eprintln!("Error writing JSON output: {}", e);
            std::process::exit(3);
        }
    } else {
        let use_color = !cli.no_color && std::io::IsTerminal::is_terminal(&std::io::stdout());
        let renderer = TerminalRenderer::new(use_color, cli.top);
        renderer.render(&display, duplicates.as_deref());
    }

    let exit_code = if display.warnings.is_empty() { 0 } else { 1 };
    std::process::exit(exit_code);
}

fn poll_until_terminal(engine: &ScanEngine, progress: &ScanProgress, phase: &str) -> ScanState {
    loop {
        let state = engine.state();
        if state.is_terminal() {
            progress.finish();
            return state;
        }
        progress.update(phase, &state);
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn merge_excludes(from_config: &[String], from_cli: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = from_config.to_vec();
    for pattern in from_cli {
        if !merged.contains(pattern) {
            merged.push(pattern.clone());
        }
    }
    merged
}

fn sort_key(name: &str) -> SortKey {
    match name {
        "name" => SortKey::Name,
        "modified" => SortKey::Modified,
        "type" => SortKey::Type,
        _ => SortKey::Size,
    }
}

use crate::state::ScanState;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner fed by polling the engine's published `ScanState`.
pub struct ScanProgress {
    bar: ProgressBar,
    enabled: bool,
}

impl ScanProgress {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                bar: ProgressBar::hidden(),
                enabled: false,
            };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );

        Self { bar, enabled: true }
    }

    pub fn update(&self, phase: &str, state: &ScanState) {
        if !self.enabled {
            return;
        }

        match state {
            ScanState::Scanning {
                progress,
                items_found,
            } => {
                self.bar.set_message(format!(
                    "{} | {} items | ~{:.0}%",
                    phase,
                    items_found,
                    progress * 100.0
                ));
                self.bar.tick();
            }
            ScanState::Idle => {
                self.bar.set_message(phase.to_string());
                self.bar.tick();
            }
            _ => {}
        }
    }

    pub fn finish(&self) {
        if self.enabled {
            self.bar.finish_and_clear();
        }
    }
}

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observable state of one scan session.
///
/// During a single session transitions are one-directional:
/// `Idle -> Scanning -> {Complete, Error, Cancelled}`. A new scan request
/// resets the cell to `Scanning` from any terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanState {
    Idle,
    Scanning { progress: f64, items_found: u64 },
    Complete,
    Error(String),
    Cancelled,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::Complete | ScanState::Error(_) | ScanState::Cancelled
        )
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning { .. })
    }
}

/// Shared, thread-safe holder for the current `ScanState`.
///
/// The scan worker is the only writer; callers poll `get()` and must never
/// observe a regression from a terminal state back to `Scanning` within one
/// session. Progress updates are monotone nondecreasing.
#[derive(Clone)]
pub struct ScanStateCell {
    inner: Arc<Mutex<ScanState>>,
}

impl ScanStateCell {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ScanState::Idle)),
        }
    }

    pub fn get(&self) -> ScanState {
        self.inner.lock().clone()
    }

    /// Resets to `Scanning` at zero progress. Called once per scan request.
    pub fn begin(&self) {
        *self.inner.lock() = ScanState::Scanning {
            progress: 0.0,
            items_found: 0,
        };
    }

    /// Publishes a progress update. Ignored once the session has reached a
    /// terminal state, and never allowed to decrease the reported progress.
    pub fn report(&self, progress: f64, items_found: u64) {
        let mut state = self.inner.lock();
        if let ScanState::Scanning {
            progress: current, ..
        } = *state
        {
            *state = ScanState::Scanning {
                progress: progress.clamp(0.0, 1.0).max(current),
                items_found,
            };
        }
    }

    pub fn finish(&self) {
        self.terminate(ScanState::Complete);
    }

    pub fn fail(&self, message: String) {
        self.terminate(ScanState::Error(message));
    }

    pub fn cancel(&self) {
        self.terminate(ScanState::Cancelled);
    }

    fn terminate(&self, terminal: ScanState) {
        let mut state = self.inner.lock();
        // First terminal transition wins; a late worker update cannot
        // overwrite an already-terminal session.
        if !state.is_terminal() {
            *state = terminal;
        }
    }
}

impl Default for ScanStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative cancellation flag shared between the engine and its workers.
///
/// Workers poll `is_cancelled()` per file (or per small batch); there is no
/// forced preemption.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Advisory progress estimate for a traversal whose total size is unknown
/// upfront: approaches 1.0 as items accumulate but never reaches it. Monotone
/// in `items_found`, which is all callers may rely on.
pub fn estimate_progress(items_found: u64) -> f64 {
    let items = items_found as f64;
    items / (items + 4096.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions_one_directional() {
        let cell = ScanStateCell::new();
        assert_eq!(cell.get(), ScanState::Idle);

        cell.begin();
        assert!(cell.get().is_scanning());

        cell.report(0.5, 100);
        assert_eq!(
            cell.get(),
            ScanState::Scanning {
                progress: 0.5,
                items_found: 100
            }
        );

        cell.finish();
        assert_eq!(cell.get(), ScanState::Complete);

        // Updates after a terminal state are ignored.
        cell.report(0.9, 200);
        assert_eq!(cell.get(), ScanState::Complete);
        cell.fail("late".to_string());
        assert_eq!(cell.get(), ScanState::Complete);
    }

    #[test]
    fn test_cancel_beats_late_completion() {
        let cell = ScanStateCell::new();
        cell.begin();
        cell.cancel();
        cell.finish();
        assert_eq!(cell.get(), ScanState::Cancelled);
    }

    #[test]
    fn test_new_scan_resets_terminal_state() {
        let cell = ScanStateCell::new();
        cell.begin();
        cell.fail("boom".to_string());
        cell.begin();
        assert!(cell.get().is_scanning());
    }

    #[test]
    fn test_progress_never_decreases() {
        let cell = ScanStateCell::new();
        cell.begin();
        cell.report(0.6, 600);
        cell.report(0.2, 700);
        match cell.get() {
            ScanState::Scanning {
                progress,
                items_found,
            } => {
                assert!((progress - 0.6).abs() < f64::EPSILON);
                assert_eq!(items_found, 700);
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_estimate_progress_monotone_and_bounded() {
        let mut last = 0.0;
        for items in [0u64, 1, 10, 1000, 100_000, 10_000_000] {
            let p = estimate_progress(items);
            assert!(p >= last);
            assert!((0.0..1.0).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_cancel_token_roundtrip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }
}

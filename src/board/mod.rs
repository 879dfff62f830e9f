// Board analysis: run, value-drop, and scarcity detectors over the pick
// history and remaining pool.
//
// Snapshots are ephemeral: recomputed before every pick from current
// state, never persisted as authoritative data. Only the summary string is
// cached per-pick for the audit trail.

pub mod drops;
pub mod runs;
pub mod scarcity;

use serde::{Deserialize, Serialize};

use crate::draft::item::PlayerCard;
use crate::draft::pick::PickRecord;

pub use drops::{detect_value_drops, ValueDropSignal};
pub use runs::{detect_runs, RunSignal};
pub use scarcity::{detect_scarcity, ScarcitySignal};

/// Fixed sentinel summary for a snapshot with no signals. Consumers must
/// treat this string as equivalent to "no signals" rather than parsing it.
pub const NO_SIGNALS_SUMMARY: &str = "Board quiet: no runs, drops, or scarce positions.";

// ---------------------------------------------------------------------------
// Detector thresholds
// ---------------------------------------------------------------------------

/// Tuning thresholds for the three board detectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Size of the recent-pick window the run detector scans.
    pub run_window: usize,
    /// Minimum appearances within the window to call a run.
    pub run_min_count: usize,
    /// Minimum (current pick - rank) gap to call a value drop.
    pub drop_threshold: u32,
    /// Maximum remaining count to call a category scarce.
    pub scarcity_threshold: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            run_window: 8,
            run_min_count: 3,
            drop_threshold: 8,
            scarcity_threshold: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The combined output of all three detectors for one pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// The pick number the snapshot was computed for.
    pub pick_number: u32,
    /// Active category runs, strongest first.
    pub runs: Vec<RunSignal>,
    /// Available cards the draft has passed by, biggest drop first.
    pub drops: Vec<ValueDropSignal>,
    /// Categories running dry, scarcest first.
    pub scarcity: Vec<ScarcitySignal>,
}

impl BoardSnapshot {
    /// Run all three detectors over the pick history and remaining pool.
    /// Pure: identical inputs always yield identical snapshots.
    pub fn compute(
        picks: &[PickRecord],
        pool: &[PlayerCard],
        pick_number: u32,
        cfg: &SignalConfig,
    ) -> Self {
        BoardSnapshot {
            pick_number,
            runs: detect_runs(picks, cfg.run_window, cfg.run_min_count),
            drops: detect_value_drops(pool, pick_number, cfg.drop_threshold),
            scarcity: detect_scarcity(pool, cfg.scarcity_threshold),
        }
    }

    /// Whether no detector fired.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.drops.is_empty() && self.scarcity.is_empty()
    }

    /// Build the deterministic human-readable summary: non-empty signal
    /// groups concatenated in run, drop, scarcity order. An empty snapshot
    /// yields [`NO_SIGNALS_SUMMARY`].
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return NO_SIGNALS_SUMMARY.to_string();
        }

        let mut groups: Vec<String> = Vec::new();

        if !self.runs.is_empty() {
            let parts: Vec<String> = self
                .runs
                .iter()
                .map(|r| format!("{} x{} in last {} picks", r.category, r.count, r.window))
                .collect();
            groups.push(format!("Runs: {}", parts.join(", ")));
        }

        if !self.drops.is_empty() {
            let parts: Vec<String> = self
                .drops
                .iter()
                .map(|d| {
                    format!(
                        "{} ({} rank {}) down {}",
                        d.item_name, d.category, d.rank, d.drop
                    )
                })
                .collect();
            groups.push(format!("Value drops: {}", parts.join(", ")));
        }

        if !self.scarcity.is_empty() {
            let parts: Vec<String> = self
                .scarcity
                .iter()
                .map(|s| format!("{} has {} left", s.category, s.remaining))
                .collect();
            groups.push(format!("Scarcity: {}", parts.join(", ")));
        }

        groups.join(" | ")
    }
}

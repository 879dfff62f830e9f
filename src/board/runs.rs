// Position-run detection.
//
// A run is a burst of picks at one category inside the recent window.
// Runs matter because they drain a category faster than rank alone
// predicts, and several archetype rules key off them.

use serde::{Deserialize, Serialize};

use crate::draft::item::{Category, ALL_CATEGORIES};
use crate::draft::pick::PickRecord;

/// A detected category run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSignal {
    /// The category being run on.
    pub category: Category,
    /// How many of the last `window` picks hit this category.
    pub count: usize,
    /// The window size the count was taken over.
    pub window: usize,
}

/// Detect category runs over the last `window` picks.
///
/// Any category appearing at least `min_count` times in the window emits a
/// signal. Output is sorted by count descending, ties broken by category
/// display order, so identical inputs always produce identical output.
pub fn detect_runs(picks: &[PickRecord], window: usize, min_count: usize) -> Vec<RunSignal> {
    let start = picks.len().saturating_sub(window);
    let recent = &picks[start..];

    let mut signals: Vec<RunSignal> = ALL_CATEGORIES
        .iter()
        .filter_map(|&category| {
            let count = recent.iter().filter(|p| p.category == category).count();
            (count >= min_count).then_some(RunSignal {
                category,
                count,
                window,
            })
        })
        .collect();

    signals.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.sort_order().cmp(&b.category.sort_order()))
    });
    signals
}

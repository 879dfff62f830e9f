// Category scarcity detection.
//
// Tracks how few cards remain per category. A near-empty category forces
// rosters still missing that slot to act soon, which several archetype
// rules and the advisory prompts lean on.

use serde::{Deserialize, Serialize};

use crate::draft::item::{Category, PlayerCard, ALL_CATEGORIES};

/// A category running out of available cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScarcitySignal {
    /// The scarce category.
    pub category: Category,
    /// How many cards of this category remain in the pool.
    pub remaining: usize,
}

/// Detect scarce categories in the remaining pool.
///
/// Any category with `remaining <= threshold` emits a signal. Output is
/// sorted ascending by remaining count (scarcest first), ties broken by
/// category display order.
pub fn detect_scarcity(pool: &[PlayerCard], threshold: usize) -> Vec<ScarcitySignal> {
    let mut signals: Vec<ScarcitySignal> = ALL_CATEGORIES
        .iter()
        .filter_map(|&category| {
            let remaining = pool.iter().filter(|c| c.category == category).count();
            (remaining <= threshold).then_some(ScarcitySignal {
                category,
                remaining,
            })
        })
        .collect();

    signals.sort_by(|a, b| {
        a.remaining
            .cmp(&b.remaining)
            .then_with(|| a.category.sort_order().cmp(&b.category.sort_order()))
    });
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(category: Category, n: usize) -> Vec<PlayerCard> {
        (0..n)
            .map(|i| PlayerCard {
                id: format!("{}{i}", category.display_str()),
                name: format!("{} {i}", category.display_str()),
                category,
                rank: i as u32 + 1,
                age: 23,
                college: "Test U".into(),
            })
            .collect()
    }

    #[test]
    fn empty_pool_every_category_scarce() {
        let signals = detect_scarcity(&[], 5);
        assert_eq!(signals.len(), 4);
        assert!(signals.iter().all(|s| s.remaining == 0));
    }

    #[test]
    fn scarce_at_threshold() {
        let mut pool = cards(Category::TightEnd, 5);
        pool.extend(cards(Category::RunningBack, 20));
        pool.extend(cards(Category::WideReceiver, 20));
        pool.extend(cards(Category::Quarterback, 20));
        let signals = detect_scarcity(&pool, 5);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].category, Category::TightEnd);
        assert_eq!(signals[0].remaining, 5);
    }

    #[test]
    fn abundant_categories_not_flagged() {
        let pool = cards(Category::WideReceiver, 6);
        let signals = detect_scarcity(&pool, 5);
        // WR has 6 (> 5), the other three categories have 0.
        assert_eq!(signals.len(), 3);
        assert!(signals.iter().all(|s| s.category != Category::WideReceiver));
    }

    #[test]
    fn sorted_scarcest_first() {
        let mut pool = cards(Category::TightEnd, 2);
        pool.extend(cards(Category::Quarterback, 4));
        pool.extend(cards(Category::RunningBack, 20));
        pool.extend(cards(Category::WideReceiver, 20));
        let signals = detect_scarcity(&pool, 5);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].category, Category::TightEnd);
        assert_eq!(signals[0].remaining, 2);
        assert_eq!(signals[1].category, Category::Quarterback);
    }

    #[test]
    fn ties_broken_by_display_order() {
        let mut pool = cards(Category::TightEnd, 3);
        pool.extend(cards(Category::Quarterback, 3));
        pool.extend(cards(Category::RunningBack, 20));
        pool.extend(cards(Category::WideReceiver, 20));
        let signals = detect_scarcity(&pool, 5);
        assert_eq!(signals[0].category, Category::Quarterback);
        assert_eq!(signals[1].category, Category::TightEnd);
    }
}

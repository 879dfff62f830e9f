// Value-drop detection.
//
// A card has "dropped" when the draft has moved well past its rank and it
// is still available. The drop magnitude is the gap between the current
// pick number and the card's rank.

use serde::{Deserialize, Serialize};

use crate::draft::item::{Category, PlayerCard};

/// A card still available well past its rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueDropSignal {
    /// Catalog id of the dropped card.
    pub item_id: String,
    /// Display name of the dropped card.
    pub item_name: String,
    /// The card's category.
    pub category: Category,
    /// The card's overall rank.
    pub rank: u32,
    /// How far the draft has moved past the rank.
    pub drop: u32,
}

/// Detect value drops across the remaining pool at `current_pick`.
///
/// Every card with `current_pick - rank >= threshold` emits a signal.
/// Output is sorted descending by drop magnitude, ties broken by rank
/// ascending (the better card lists first).
pub fn detect_value_drops(
    pool: &[PlayerCard],
    current_pick: u32,
    threshold: u32,
) -> Vec<ValueDropSignal> {
    let mut signals: Vec<ValueDropSignal> = pool
        .iter()
        .filter_map(|card| {
            let drop = current_pick.checked_sub(card.rank)?;
            (drop >= threshold).then(|| ValueDropSignal {
                item_id: card.id.clone(),
                item_name: card.name.clone(),
                category: card.category,
                rank: card.rank,
                drop,
            })
        })
        .collect();

    signals.sort_by(|a, b| b.drop.cmp(&a.drop).then_with(|| a.rank.cmp(&b.rank)));
    signals
}

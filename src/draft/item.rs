// Draftable item representation: categories, player cards, tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of ranks per derived tier bucket.
const TIER_WIDTH: u32 = 12;

/// Positional categories used for roster slot assignment.
///
/// This is a closed set: every item in the catalog carries exactly one of
/// these, and every roster has exactly one dedicated slot per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
}

/// All categories in deterministic display order.
pub const ALL_CATEGORIES: [Category; 4] = [
    Category::Quarterback,
    Category::RunningBack,
    Category::WideReceiver,
    Category::TightEnd,
];

impl Category {
    /// Parse a category abbreviation (as it appears in catalog CSVs and
    /// operator commands). Case-insensitive.
    pub fn from_str_cat(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QB" => Some(Category::Quarterback),
            "RB" => Some(Category::RunningBack),
            "WR" => Some(Category::WideReceiver),
            "TE" => Some(Category::TightEnd),
            _ => None,
        }
    }

    /// Return the display abbreviation for this category.
    pub fn display_str(&self) -> &'static str {
        match self {
            Category::Quarterback => "QB",
            Category::RunningBack => "RB",
            Category::WideReceiver => "WR",
            Category::TightEnd => "TE",
        }
    }

    /// Deterministic ordering index for display and slot layout.
    pub fn sort_order(&self) -> u8 {
        match self {
            Category::Quarterback => 0,
            Category::RunningBack => 1,
            Category::WideReceiver => 2,
            Category::TightEnd => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// Derive the tier bucket for an overall rank. Rank 1 is tier 1; each tier
/// spans `TIER_WIDTH` consecutive ranks.
pub fn tier_for_rank(rank: u32) -> u32 {
    debug_assert!(rank >= 1, "ranks are 1-indexed");
    (rank - 1) / TIER_WIDTH + 1
}

/// A draftable player in the catalog.
///
/// Cards live in the available pool until claimed; a claimed card moves to
/// exactly one roster and never returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCard {
    /// Unique catalog id (stable across sessions).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Positional category.
    pub category: Category,
    /// Overall desirability rank, 1-indexed. Lower = better.
    pub rank: u32,
    /// Player age in years.
    pub age: u32,
    /// College affiliation.
    pub college: String,
}

impl PlayerCard {
    /// Derived tier bucket of this card's rank.
    pub fn tier(&self) -> u32 {
        tier_for_rank(self.rank)
    }
}

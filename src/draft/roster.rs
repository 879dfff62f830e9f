// Roster construction and slot assignment.
//
// Each roster has one dedicated slot per category plus a single FLEX slot
// that accepts any category. The FLEX slot, once filled, is never
// reassigned.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::{Category, PlayerCard, ALL_CATEGORIES};

/// Identifies which roster slot a card occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotName {
    /// The dedicated slot for a category.
    Dedicated(Category),
    /// The flexible slot accepting any category.
    Flex,
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotName::Dedicated(cat) => write!(f, "{}", cat.display_str()),
            SlotName::Flex => write!(f, "FLEX"),
        }
    }
}

/// A single slot on a roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSlot {
    /// The slot's designation.
    pub name: SlotName,
    /// The card occupying this slot, if any.
    pub card: Option<PlayerCard>,
}

/// A seat's complete roster: one dedicated slot per category plus FLEX.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub slots: Vec<RosterSlot>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    /// Create an empty roster. Slots are laid out in category sort order
    /// with FLEX last.
    pub fn new() -> Self {
        let mut slots: Vec<RosterSlot> = ALL_CATEGORIES
            .iter()
            .map(|&cat| RosterSlot {
                name: SlotName::Dedicated(cat),
                card: None,
            })
            .collect();
        slots.push(RosterSlot {
            name: SlotName::Flex,
            card: None,
        });
        Roster { slots }
    }

    fn slot(&self, name: SlotName) -> &RosterSlot {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .expect("roster always contains every slot")
    }

    fn slot_mut(&mut self, name: SlotName) -> &mut RosterSlot {
        self.slots
            .iter_mut()
            .find(|s| s.name == name)
            .expect("roster always contains every slot")
    }

    /// Whether the dedicated slot for `category` is empty.
    pub fn dedicated_open(&self, category: Category) -> bool {
        self.slot(SlotName::Dedicated(category)).card.is_none()
    }

    /// Whether the FLEX slot is empty.
    pub fn flex_open(&self) -> bool {
        self.slot(SlotName::Flex).card.is_none()
    }

    /// Whether this roster can still legally accept a card of `category`:
    /// true iff the dedicated slot for the category is empty or the FLEX
    /// slot is empty.
    pub fn can_accept(&self, category: Category) -> bool {
        self.dedicated_open(category) || self.flex_open()
    }

    /// All categories this roster can still legally accept, in display
    /// order. Empty iff every slot is filled.
    pub fn eligible_categories(&self) -> Vec<Category> {
        ALL_CATEGORIES
            .iter()
            .copied()
            .filter(|&cat| self.can_accept(cat))
            .collect()
    }

    /// The slot a card of `category` would occupy: the dedicated slot if
    /// empty, else FLEX if empty, else none. Pure query; callers are
    /// expected to have checked [`can_accept`](Self::can_accept) first.
    pub fn assign_slot(&self, category: Category) -> Option<SlotName> {
        if self.dedicated_open(category) {
            Some(SlotName::Dedicated(category))
        } else if self.flex_open() {
            Some(SlotName::Flex)
        } else {
            None
        }
    }

    /// Place a card on the roster, filling the slot chosen by
    /// [`assign_slot`](Self::assign_slot). Returns the slot filled, or
    /// `None` (roster unchanged) when no slot can take the card's category.
    pub fn place(&mut self, card: PlayerCard) -> Option<SlotName> {
        let name = self.assign_slot(card.category)?;
        self.slot_mut(name).card = Some(card);
        Some(name)
    }

    /// Number of filled slots.
    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.card.is_some()).count()
    }

    /// Total number of slots.
    pub fn total_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether every slot is filled.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.card.is_some())
    }

    /// Whether a card with the given id is already on this roster.
    pub fn has_card(&self, id: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.card.as_ref().is_some_and(|c| c.id == id))
    }
}

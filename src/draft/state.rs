// Draft state: seats, available pool, pick history, turn cursor.
//
// The pool, rosters, pick list, and cursor form one logical unit: every
// mutation goes through `apply_pick`, which removes exactly one card,
// fills exactly one roster slot, appends exactly one pick record, and
// advances the cursor by exactly one.

use serde::{Deserialize, Serialize};

use super::item::{Category, PlayerCard};
use super::pick::PickRecord;
use super::roster::Roster;
use super::turn::turn_for;

/// Archetype name reserved for human-controlled seats. Human seats are
/// never evaluated for behavioral deviations.
pub const HUMAN_ARCHETYPE: &str = "human";

/// The state of a single seat for the life of a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatState {
    /// Seat index (0..N-1).
    pub seat: usize,
    /// Display name shown to spectators.
    pub display_name: String,
    /// Declared strategy archetype, or [`HUMAN_ARCHETYPE`].
    pub archetype: String,
    /// The seat's roster.
    pub roster: Roster,
}

/// The complete state of a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftState {
    /// Unique identifier for this draft session.
    pub draft_id: String,
    /// All seats, indexed by seat number.
    pub seats: Vec<SeatState>,
    /// Number of rounds.
    pub rounds: u32,
    /// Remaining available cards, sorted ascending by rank.
    pub pool: Vec<PlayerCard>,
    /// All committed picks in order.
    pub picks: Vec<PickRecord>,
    /// The next pick number to be made (1-indexed). Exceeds
    /// `total_picks()` once the draft is terminal.
    pub next_pick: u32,
}

impl DraftState {
    /// Create a new draft with an empty pool and empty rosters.
    ///
    /// `seat_specs` is a list of (display_name, archetype) pairs; seat
    /// indices are assigned in order.
    pub fn new(draft_id: &str, seat_specs: Vec<(String, String)>, rounds: u32) -> Self {
        let seats = seat_specs
            .into_iter()
            .enumerate()
            .map(|(seat, (display_name, archetype))| SeatState {
                seat,
                display_name,
                archetype,
                roster: Roster::new(),
            })
            .collect();

        DraftState {
            draft_id: draft_id.to_string(),
            seats,
            rounds,
            pool: Vec::new(),
            picks: Vec::new(),
            next_pick: 1,
        }
    }

    /// Total number of picks in the draft.
    pub fn total_picks(&self) -> u32 {
        self.seats.len() as u32 * self.rounds
    }

    /// Whether the draft has reached its terminal state.
    pub fn is_complete(&self) -> bool {
        self.next_pick > self.total_picks()
    }

    /// The (round, seat) currently on the clock, or `None` when terminal.
    pub fn on_the_clock(&self) -> Option<(u32, usize)> {
        if self.is_complete() {
            return None;
        }
        Some(turn_for(self.next_pick, self.seats.len()))
    }

    /// Replace the available pool, sorting by rank. Used by catalog
    /// seeding at draft start.
    pub fn seed_pool(&mut self, mut cards: Vec<PlayerCard>) {
        cards.sort_by_key(|c| c.rank);
        self.pool = cards;
    }

    /// Look up a card still in the pool by id.
    pub fn find_in_pool(&self, item_id: &str) -> Option<&PlayerCard> {
        self.pool.iter().find(|c| c.id == item_id)
    }

    /// Cards in the pool that `seat`'s roster can still legally accept,
    /// in rank order.
    pub fn eligible_pool_for(&self, seat: usize) -> Vec<&PlayerCard> {
        let roster = &self.seats[seat].roster;
        self.pool
            .iter()
            .filter(|c| roster.can_accept(c.category))
            .collect()
    }

    /// Whether no eligible card remains for `seat`.
    pub fn is_exhausted_for(&self, seat: usize) -> bool {
        self.eligible_pool_for(seat).is_empty()
    }

    /// The last `window` committed picks, oldest first.
    pub fn recent_picks(&self, window: usize) -> &[PickRecord] {
        let start = self.picks.len().saturating_sub(window);
        &self.picks[start..]
    }

    /// Apply one pick: remove the card from the pool, place it on the
    /// seat's roster, append the pick record, and advance the cursor.
    ///
    /// Callers (the pick recorder) must have validated the proposal
    /// against this state already; `None` here means the card is missing
    /// from the pool or the roster cannot take it, and the state is left
    /// untouched.
    pub fn apply_pick(
        &mut self,
        seat: usize,
        item_id: &str,
        rationale: String,
        confidence: f64,
    ) -> Option<PickRecord> {
        let (round, on_clock) = self.on_the_clock()?;
        if on_clock != seat {
            return None;
        }

        let idx = self.pool.iter().position(|c| c.id == item_id)?;
        if !self.seats[seat].roster.can_accept(self.pool[idx].category) {
            return None;
        }

        let card = self.pool.remove(idx);
        let category = card.category;
        let item_name = card.name.clone();
        let slot = self.seats[seat]
            .roster
            .place(card)
            .expect("can_accept checked above");

        let record = PickRecord {
            pick_number: self.next_pick,
            round,
            seat,
            item_id: item_id.to_string(),
            item_name,
            category,
            slot,
            rationale,
            confidence,
        };
        self.picks.push(record.clone());
        self.next_pick += 1;
        Some(record)
    }

    /// Count of remaining pool cards per category, for `category`.
    pub fn remaining_in_category(&self, category: Category) -> usize {
        self.pool.iter().filter(|c| c.category == category).count()
    }
}

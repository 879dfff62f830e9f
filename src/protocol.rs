// Wire types for the operator WebSocket surface.
//
// Operator clients send `Command` messages and receive a `Reply` per
// command; every connected client additionally receives the broadcast
// `DraftEvent` stream. All three are externally-tagged JSON with a `type`
// discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::archetype::Deviation;
use crate::draft::item::{Category, PlayerCard};
use crate::draft::pick::PickRecord;
use crate::draft::roster::Roster;
use crate::draft::state::DraftState;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// An operator command, parsed from incoming WebSocket text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Create and seed a new draft from the configured seats.
    StartDraft,
    /// Advance the current turn: ask the advisor for the seat on the clock
    /// and commit its (re-validated) proposal.
    AdvanceTurn,
    /// Commit a pick chosen by the human operator for the seat on the clock.
    HumanPick {
        item_id: String,
        #[serde(default)]
        rationale: String,
    },
    /// Fetch the full current draft state.
    GetState,
    /// Fetch the remaining available pool.
    GetAvailable,
    /// Fetch archetype assignments and all recorded deviations.
    GetDeviations,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// The per-command reply sent back to the issuing client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    DraftStarted {
        draft_id: String,
        pool_size: usize,
        state: StateView,
    },
    PickCommitted {
        pick: PickRecord,
        deviation: Option<Deviation>,
        board_summary: String,
        state: StateView,
    },
    State {
        state: StateView,
    },
    Available {
        items: Vec<PlayerCard>,
    },
    Deviations {
        assignments: Vec<ArchetypeAssignment>,
        deviations: Vec<Deviation>,
    },
    /// A rejected command. When a draft exists, the fresh authoritative
    /// state rides along so the client can resynchronize without a
    /// separate read.
    Error {
        code: String,
        message: String,
        state: Option<StateView>,
    },
}

/// A seat's declared archetype, for the deviations report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeAssignment {
    pub seat: usize,
    pub display_name: String,
    pub archetype: String,
}

// ---------------------------------------------------------------------------
// Broadcast events
// ---------------------------------------------------------------------------

/// One-way notifications fanned out to every connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEvent {
    PickCommitted {
        timestamp: DateTime<Utc>,
        draft_id: String,
        pick: PickRecord,
        board_summary: String,
        /// Seat now on the clock, `None` once the draft is complete.
        on_clock_seat: Option<usize>,
    },
    DeviationDetected {
        timestamp: DateTime<Utc>,
        draft_id: String,
        deviation: Deviation,
    },
    DraftComplete {
        timestamp: DateTime<Utc>,
        draft_id: String,
        total_picks: u32,
    },
}

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// The client-facing projection of a [`DraftState`]: the raw state plus the
/// derived turn fields clients would otherwise recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateView {
    pub draft_id: String,
    pub next_pick: u32,
    pub total_picks: u32,
    pub complete: bool,
    /// Current round, `None` once complete.
    pub round: Option<u32>,
    /// Seat on the clock, `None` once complete.
    pub on_clock_seat: Option<usize>,
    pub seats: Vec<SeatView>,
    pub pool_remaining: usize,
    pub picks: Vec<PickRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub seat: usize,
    pub display_name: String,
    pub archetype: String,
    pub roster: Roster,
    /// Categories this roster can still legally accept.
    pub eligible: Vec<Category>,
}

impl StateView {
    pub fn from_state(state: &DraftState) -> Self {
        let (round, on_clock_seat) = match state.on_the_clock() {
            Some((round, seat)) => (Some(round), Some(seat)),
            None => (None, None),
        };

        StateView {
            draft_id: state.draft_id.clone(),
            next_pick: state.next_pick,
            total_picks: state.total_picks(),
            complete: state.is_complete(),
            round,
            on_clock_seat,
            seats: state
                .seats
                .iter()
                .map(|s| SeatView {
                    seat: s.seat,
                    display_name: s.display_name.clone(),
                    archetype: s.archetype.clone(),
                    roster: s.roster.clone(),
                    eligible: s.roster.eligible_categories(),
                })
                .collect(),
            pool_remaining: state.pool.len(),
            picks: state.picks.clone(),
        }
    }
}

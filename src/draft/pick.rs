// Pick records and proposals.

use serde::{Deserialize, Serialize};

use super::item::Category;
use super::roster::SlotName;

/// A committed draft pick. Immutable once appended to the pick list; the
/// committed list is the single source of truth for what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickRecord {
    /// Sequential pick number (1-indexed).
    pub pick_number: u32,
    /// Round this pick belongs to.
    pub round: u32,
    /// Seat index of the participant who made the pick.
    pub seat: usize,
    /// Catalog id of the claimed card.
    pub item_id: String,
    /// Display name of the claimed card.
    pub item_name: String,
    /// Category of the claimed card.
    pub category: Category,
    /// Roster slot the card was assigned to.
    pub slot: SlotName,
    /// Free-text rationale supplied by the advisor (or operator).
    pub rationale: String,
    /// Advisor confidence in [0, 1].
    pub confidence: f64,
}

/// A proposed pick, as produced by an advisor or a human operator. The
/// recorder treats this as untrusted: everything is re-validated against
/// fresh authoritative state before committing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedPick {
    /// The pick number this proposal was computed for.
    pub pick_number: u32,
    /// The seat the proposer believes is on the clock.
    pub seat: usize,
    /// Catalog id of the card to claim.
    pub item_id: String,
    /// Free-text rationale.
    pub rationale: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_record_serde_round_trip() {
        let pick = PickRecord {
            pick_number: 13,
            round: 2,
            seat: 11,
            item_id: "rb-04".into(),
            item_name: "Test Back".into(),
            category: Category::RunningBack,
            slot: SlotName::Flex,
            rationale: "best value on the board".into(),
            confidence: 0.82,
        };
        let json = serde_json::to_string(&pick).unwrap();
        let back: PickRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pick_number, 13);
        assert_eq!(back.seat, 11);
        assert_eq!(back.category, Category::RunningBack);
        assert_eq!(back.slot, SlotName::Flex);
        assert!((back.confidence - 0.82).abs() < f64::EPSILON);
    }

    #[test]
    fn proposal_carries_cursor_view() {
        let proposal = ProposedPick {
            pick_number: 7,
            seat: 3,
            item_id: "wr-11".into(),
            rationale: "need a receiver".into(),
            confidence: 0.5,
        };
        assert_eq!(proposal.pick_number, 7);
        assert_eq!(proposal.seat, 3);
    }
}

// Advisory collaborators.
//
// An advisor proposes which card a seat should claim. Proposals are
// untrusted: the pick recorder re-validates everything against fresh state
// at commit time, so an advisor working from a stale snapshot can never
// corrupt the draft. The deterministic best-available rule doubles as the
// fallback when the LLM-backed advisor fails or is not configured, so a
// draft never stalls on a non-responsive turn.

pub mod client;
pub mod prompt;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::draft::item::Category;
use crate::draft::state::DraftState;

/// Confidence carried by deterministic fallback candidates. Well below
/// normal advisor confidence so the pick log shows which turns fell back.
pub const FALLBACK_CONFIDENCE: f64 = 0.25;

/// Confidence carried by the best-available rule when used directly.
const BEST_AVAILABLE_CONFIDENCE: f64 = 0.6;

/// A candidate pick produced by an advisor (or the fallback rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub item_id: String,
    pub category: Category,
    pub rationale: String,
    pub confidence: f64,
}

/// Advisory collaborator boundary.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Propose a pick for `seat` against the given state. The caller owns
    /// timeouts; implementations should not retry internally.
    async fn propose(
        &self,
        state: &DraftState,
        seat: usize,
        board_summary: &str,
    ) -> Result<Candidate>;
}

/// Deterministic advisor: always takes the best-ranked card the seat's
/// roster can still accept.
pub struct BestAvailableAdvisor;

#[async_trait]
impl Advisor for BestAvailableAdvisor {
    async fn propose(
        &self,
        state: &DraftState,
        seat: usize,
        _board_summary: &str,
    ) -> Result<Candidate> {
        best_available(state, seat)
            .ok_or_else(|| anyhow!("no eligible card remains for seat {seat}"))
    }
}

/// The best-ranked card `seat` can legally accept, as a candidate.
pub fn best_available(state: &DraftState, seat: usize) -> Option<Candidate> {
    let card = state
        .eligible_pool_for(seat)
        .into_iter()
        .min_by_key(|c| c.rank)?;
    Some(Candidate {
        item_id: card.id.clone(),
        category: card.category,
        rationale: format!(
            "{} is the best-ranked eligible card (rank {}) at pick {}",
            card.name, card.rank, state.next_pick
        ),
        confidence: BEST_AVAILABLE_CONFIDENCE,
    })
}

/// Substitute candidate for a failed or timed-out advisor call. Same card
/// choice as [`best_available`], with reduced confidence and a rationale
/// naming the failure, so the turn completes instead of stalling.
pub fn fallback_candidate(state: &DraftState, seat: usize, reason: &str) -> Option<Candidate> {
    let mut candidate = best_available(state, seat)?;
    candidate.rationale = format!(
        "advisor unavailable ({reason}); falling back to best-ranked eligible card"
    );
    candidate.confidence = FALLBACK_CONFIDENCE;
    Some(candidate)
}

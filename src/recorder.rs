// The pick-commit protocol.
//
// A proposal may have been computed against stale state by a slow advisor,
// so every commit re-reads the authoritative state and re-validates the
// proposal against it before anything mutates. Attempts are serialized per
// recorder; the loser of a duplicate race observes the winner's write on
// its own re-read and rejects with a conflict instead of double-applying.
//
// Pool, rosters, pick list, and cursor travel as one stored value, and the
// optional deviation record and audit summary join that write in a single
// atomic batch, so no interleaving can observe a partial commit.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::archetype::{ArchetypeRegistry, Deviation};
use crate::board::{BoardSnapshot, SignalConfig};
use crate::draft::pick::{PickRecord, ProposedPick};
use crate::draft::state::DraftState;
use crate::errors::ArenaError;
use crate::store::{pick_key, BatchEntry, Store, NS_AUDIT, NS_DEVIATION, NS_DRAFT};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A committed pick and everything derived from it.
#[derive(Debug)]
pub struct CommitOutcome {
    pub record: PickRecord,
    pub deviation: Option<Deviation>,
    /// Summary of the board snapshot computed before the pick.
    pub board_summary: String,
    /// The authoritative state after the commit.
    pub state: DraftState,
}

/// A rejected commit. Carries the fresh authoritative state (when a draft
/// exists) so the caller can resynchronize without a separate read.
#[derive(Debug)]
pub struct CommitRejected {
    pub error: ArenaError,
    pub state: Option<DraftState>,
}

/// Domain result of a commit attempt. Infrastructure failures (store IO)
/// surface separately as anyhow errors.
#[derive(Debug)]
pub enum CommitResult {
    Committed(Box<CommitOutcome>),
    Rejected(CommitRejected),
}

impl CommitResult {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitResult::Committed(_))
    }
}

// ---------------------------------------------------------------------------
// PickRecorder
// ---------------------------------------------------------------------------

/// Validates and applies proposed picks against the authoritative store.
pub struct PickRecorder {
    store: Arc<dyn Store>,
    registry: ArchetypeRegistry,
    signals: SignalConfig,
    /// Serializes commit attempts so each re-validation observes the
    /// previous attempt's write.
    commit_lock: Mutex<()>,
}

impl PickRecorder {
    pub fn new(store: Arc<dyn Store>, registry: ArchetypeRegistry, signals: SignalConfig) -> Self {
        PickRecorder {
            store,
            registry,
            signals,
            commit_lock: Mutex::new(()),
        }
    }

    /// Load the authoritative state for `draft_id`, if any.
    pub fn load_state(&self, draft_id: &str) -> Result<Option<DraftState>> {
        match self.store.get(NS_DRAFT, draft_id)? {
            Some(value) => {
                let state: DraftState = serde_json::from_value(value)
                    .context("failed to decode stored draft state")?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Attempt to commit `proposal` against the freshest state.
    ///
    /// Safe to invoke concurrently: attempts are serialized internally and
    /// each one re-reads before validating, so of two duplicate requests
    /// for the same cursor exactly one commits and the other rejects.
    pub fn commit(&self, draft_id: &str, proposal: &ProposedPick) -> Result<CommitResult> {
        // Cheap pre-check on the proposal itself, before touching state.
        if !(0.0..=1.0).contains(&proposal.confidence) {
            return Ok(reject(
                ArenaError::Validation(format!(
                    "confidence must be in [0, 1], got {}",
                    proposal.confidence
                )),
                None,
            ));
        }

        let _guard = self.commit_lock.lock().expect("commit mutex poisoned");

        // Re-read the authoritative state. This is the critical step: the
        // proposal may have been computed against a stale snapshot.
        let Some(mut state) = self.load_state(draft_id)? else {
            return Ok(reject(
                ArenaError::NotFound(format!("no active draft with id {draft_id}")),
                None,
            ));
        };

        if proposal.seat >= state.seats.len() {
            let error = ArenaError::Validation(format!(
                "seat index {} out of range for {} seats",
                proposal.seat,
                state.seats.len()
            ));
            return Ok(reject(error, Some(state)));
        }

        if state.is_complete() {
            return Ok(reject(
                ArenaError::Conflict("draft already complete".into()),
                Some(state),
            ));
        }

        let (_, on_clock) = state
            .on_the_clock()
            .expect("non-terminal state has a seat on the clock");
        if proposal.pick_number != state.next_pick || proposal.seat != on_clock {
            let error = ArenaError::Conflict(format!(
                "proposal computed for pick {} seat {}, but the draft is at pick {} seat {}",
                proposal.pick_number, proposal.seat, state.next_pick, on_clock
            ));
            return Ok(reject(error, Some(state)));
        }

        if state.is_exhausted_for(on_clock) {
            let error = ArenaError::Exhausted(format!(
                "no eligible card remains in the pool for seat {on_clock}"
            ));
            return Ok(reject(error, Some(state)));
        }

        let Some(card) = state.find_in_pool(&proposal.item_id) else {
            let error = ArenaError::Conflict(format!(
                "item {} is no longer available",
                proposal.item_id
            ));
            return Ok(reject(error, Some(state)));
        };
        let category = card.category;

        if !state.seats[on_clock].roster.can_accept(category) {
            let error = ArenaError::Conflict(format!(
                "no slot available for {category} on seat {on_clock}'s roster"
            ));
            return Ok(reject(error, Some(state)));
        }

        // Validated against fresh state; now derive the board snapshot and
        // pre-pick context the deviation rules need, then apply.
        let board =
            BoardSnapshot::compute(&state.picks, &state.pool, state.next_pick, &self.signals);
        let board_summary = board.summary();
        let pool_before = state.pool.clone();
        let roster_before = state.seats[on_clock].roster.clone();
        let archetype = state.seats[on_clock].archetype.clone();

        let record = state
            .apply_pick(
                on_clock,
                &proposal.item_id,
                proposal.rationale.clone(),
                proposal.confidence,
            )
            .expect("proposal validated against this exact state");

        let deviation =
            self.registry
                .evaluate(&archetype, &record, &board, &pool_before, &roster_before);

        // Persist state, deviation, and audit summary as one atomic batch.
        let mut batch: Vec<BatchEntry> = vec![(
            NS_DRAFT,
            draft_id.to_string(),
            serde_json::to_value(&state).context("failed to encode draft state")?,
        )];
        if let Some(dev) = &deviation {
            batch.push((
                NS_DEVIATION,
                pick_key(draft_id, record.pick_number),
                serde_json::to_value(dev).context("failed to encode deviation")?,
            ));
        }
        batch.push((
            NS_AUDIT,
            pick_key(draft_id, record.pick_number),
            json!({
                "pick_number": record.pick_number,
                "board_summary": board_summary,
            }),
        ));
        self.store.put_batch(&batch)?;

        info!(
            "committed pick #{}: {} ({}) -> seat {} [{}]",
            record.pick_number, record.item_name, record.category, record.seat, record.slot
        );
        if let Some(dev) = &deviation {
            info!(
                "deviation at pick #{}: {} [{:?}/{:?}] {}",
                record.pick_number, dev.archetype, dev.tag, dev.severity, dev.trigger
            );
        } else {
            debug!("pick #{} in character", record.pick_number);
        }

        Ok(CommitResult::Committed(Box::new(CommitOutcome {
            record,
            deviation,
            board_summary,
            state,
        })))
    }

    /// Deviations recorded for `draft_id`, in pick order.
    pub fn deviations(&self, draft_id: &str) -> Result<Vec<Deviation>> {
        let prefix = format!("{draft_id}:");
        self.store
            .list_prefix(NS_DEVIATION, &prefix)?
            .into_iter()
            .map(|(key, value)| {
                serde_json::from_value(value)
                    .with_context(|| format!("failed to decode deviation at {key}"))
            })
            .collect()
    }
}

fn reject(error: ArenaError, state: Option<DraftState>) -> CommitResult {
    CommitResult::Rejected(CommitRejected { error, state })
}

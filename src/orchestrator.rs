// Draft lifecycle orchestration.
//
// Owns the public operations the operator surface calls into: starting a
// draft, advancing turns, committing human picks, and reads. The
// orchestrator asks an advisor for candidates and owns the advisor timeout;
// the recorder re-validates every proposal against fresh state, so a slow
// or stale advisor can never corrupt the draft. Committed picks and
// detected deviations are published on a broadcast channel for the
// WebSocket fan-out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::advisor::{fallback_candidate, Advisor};
use crate::archetype::{ArchetypeRegistry, Deviation};
use crate::board::BoardSnapshot;
use crate::catalog::CatalogSeeder;
use crate::config::Config;
use crate::draft::item::PlayerCard;
use crate::draft::pick::ProposedPick;
use crate::draft::state::{DraftState, HUMAN_ARCHETYPE};
use crate::errors::ArenaError;
use crate::protocol::DraftEvent;
use crate::recorder::{CommitRejected, CommitResult, PickRecorder};
use crate::store::{Store, KEY_CURRENT_DRAFT, NS_DRAFT, NS_META};

/// How long to wait on an advisor before substituting the deterministic
/// fallback, so a draft never stalls on a non-responsive turn.
const ADVISOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the draft-event broadcast channel. Slow subscribers that
/// fall further behind than this see a lag error, not backpressure.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Confidence recorded for picks entered directly by the human operator.
const OPERATOR_CONFIDENCE: f64 = 1.0;

pub struct Orchestrator {
    config: Config,
    store: Arc<dyn Store>,
    recorder: PickRecorder,
    seeder: CatalogSeeder,
    advisor: Arc<dyn Advisor>,
    events: broadcast::Sender<DraftEvent>,
}

impl Orchestrator {
    pub fn new(config: Config, store: Arc<dyn Store>, advisor: Arc<dyn Advisor>) -> Self {
        let recorder = PickRecorder::new(
            Arc::clone(&store),
            ArchetypeRegistry::standard(),
            config.signals,
        );
        let seeder = CatalogSeeder::new(Arc::clone(&store), PathBuf::from(&config.catalog_path));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Orchestrator {
            config,
            store,
            recorder,
            seeder,
            advisor,
            events,
        }
    }

    /// Subscribe to the pick-committed / deviation-detected event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Draft lifecycle
    // -----------------------------------------------------------------------

    /// Create, persist, and seed a new draft from the configured seats.
    ///
    /// Rejects with a conflict while an earlier draft is still in progress;
    /// a completed draft is replaced.
    pub async fn start_draft(&self) -> Result<DraftState> {
        if let Some(state) = self.active_state()? {
            if !state.is_complete() {
                return Err(ArenaError::Conflict(format!(
                    "draft {} is still in progress (at pick {})",
                    state.draft_id, state.next_pick
                ))
                .into());
            }
        }

        let draft_id = format!("draft_{}", Utc::now().format("%Y%m%d_%H%M%S%3f"));
        let seat_specs = self
            .config
            .arena
            .seats
            .iter()
            .map(|s| (s.name.clone(), s.archetype.clone()))
            .collect();
        let state = DraftState::new(&draft_id, seat_specs, self.config.arena.rounds);

        self.store.put(
            NS_DRAFT,
            &draft_id,
            &serde_json::to_value(&state).context("failed to encode new draft state")?,
        )?;
        self.store
            .put(NS_META, KEY_CURRENT_DRAFT, &Value::String(draft_id.clone()))?;

        let pool_size = self.seeder.seed(&draft_id).await?;
        info!(
            "started draft {} with {} seats, {} rounds, {} catalog cards",
            draft_id,
            state.seats.len(),
            state.rounds,
            pool_size
        );

        self.recorder
            .load_state(&draft_id)?
            .context("seeded draft state missing from store")
    }

    /// Advance the current turn: ask the advisor for the seat on the clock
    /// and commit its proposal. A proposal that loses a race against a
    /// concurrent commit is recomputed against fresh state and retried once;
    /// a second conflict is surfaced to the caller.
    pub async fn advance_turn(&self) -> Result<CommitResult> {
        let first = self.advance_once().await?;
        match &first {
            CommitResult::Rejected(rejected) if rejected.error.is_retryable() => {
                warn!(
                    "advance lost a race ({}); retrying once with fresh state",
                    rejected.error
                );
                self.advance_once().await
            }
            _ => Ok(first),
        }
    }

    async fn advance_once(&self) -> Result<CommitResult> {
        let (draft_id, state) = self.require_active()?;

        if state.is_complete() {
            return Ok(rejected(
                ArenaError::Conflict("draft already complete".into()),
                state,
            ));
        }
        let (_, seat) = state
            .on_the_clock()
            .expect("non-terminal state has a seat on the clock");
        if state.seats[seat].archetype == HUMAN_ARCHETYPE {
            return Ok(rejected(
                ArenaError::Validation(format!(
                    "seat {seat} ({}) is human-controlled; submit a human_pick",
                    state.seats[seat].display_name
                )),
                state,
            ));
        }

        let board_summary =
            BoardSnapshot::compute(&state.picks, &state.pool, state.next_pick, &self.config.signals)
                .summary();

        // The advisor call happens outside any lock: the recorder re-reads
        // and re-validates at commit time, so however long this takes, the
        // worst outcome is a retryable conflict.
        let candidate = match tokio::time::timeout(
            ADVISOR_TIMEOUT,
            self.advisor.propose(&state, seat, &board_summary),
        )
        .await
        {
            Ok(Ok(candidate)) => candidate,
            Ok(Err(e)) => {
                warn!("advisor failed for seat {seat}: {e:#}");
                match fallback_candidate(&state, seat, &e.to_string()) {
                    Some(candidate) => candidate,
                    None => {
                        return Ok(rejected(
                            ArenaError::Exhausted(format!(
                                "no eligible card remains in the pool for seat {seat}"
                            )),
                            state,
                        ));
                    }
                }
            }
            Err(_) => {
                warn!("advisor timed out for seat {seat} after {ADVISOR_TIMEOUT:?}");
                match fallback_candidate(&state, seat, "advisor timed out") {
                    Some(candidate) => candidate,
                    None => {
                        return Ok(rejected(
                            ArenaError::Exhausted(format!(
                                "no eligible card remains in the pool for seat {seat}"
                            )),
                            state,
                        ));
                    }
                }
            }
        };

        let proposal = ProposedPick {
            pick_number: state.next_pick,
            seat,
            item_id: candidate.item_id,
            rationale: candidate.rationale,
            confidence: candidate.confidence,
        };
        let result = self.recorder.commit(&draft_id, &proposal)?;
        self.publish_outcome(&draft_id, &result);
        Ok(result)
    }

    /// Commit a pick chosen by the human operator for the seat on the clock.
    pub fn human_pick(&self, item_id: &str, rationale: &str) -> Result<CommitResult> {
        let (draft_id, state) = self.require_active()?;

        if state.is_complete() {
            return Ok(rejected(
                ArenaError::Conflict("draft already complete".into()),
                state,
            ));
        }
        let (_, seat) = state
            .on_the_clock()
            .expect("non-terminal state has a seat on the clock");
        if state.seats[seat].archetype != HUMAN_ARCHETYPE {
            return Ok(rejected(
                ArenaError::Validation(format!(
                    "seat {seat} ({}) is an AI seat; use advance_turn",
                    state.seats[seat].display_name
                )),
                state,
            ));
        }

        let proposal = ProposedPick {
            pick_number: state.next_pick,
            seat,
            item_id: item_id.to_string(),
            rationale: if rationale.is_empty() {
                "operator pick".to_string()
            } else {
                rationale.to_string()
            },
            confidence: OPERATOR_CONFIDENCE,
        };
        let result = self.recorder.commit(&draft_id, &proposal)?;
        self.publish_outcome(&draft_id, &result);
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The full current draft state.
    pub fn get_state(&self) -> Result<DraftState> {
        let (_, state) = self.require_active()?;
        Ok(state)
    }

    /// The remaining available pool, in rank order.
    pub fn get_available(&self) -> Result<Vec<PlayerCard>> {
        let (_, state) = self.require_active()?;
        Ok(state.pool)
    }

    /// All deviations recorded for the current draft, in pick order.
    pub fn get_deviations(&self) -> Result<Vec<Deviation>> {
        let (draft_id, _) = self.require_active()?;
        self.recorder.deviations(&draft_id)
    }

    // -----------------------------------------------------------------------
    // Recovery and background advance
    // -----------------------------------------------------------------------

    /// Restore the active draft from the store after a restart, if one was
    /// in progress. Every commit persists the full state, so recovery is a
    /// single read.
    pub fn recover(&self) -> Result<Option<DraftState>> {
        match self.active_state()? {
            Some(state) => {
                info!(
                    "recovered draft {} at pick {} ({} picks committed)",
                    state.draft_id,
                    state.next_pick,
                    state.picks.len()
                );
                Ok(Some(state))
            }
            None => {
                info!("no draft to recover");
                Ok(None)
            }
        }
    }

    /// Periodically advance AI turns. Runs until the task is cancelled; a
    /// tick with no active draft, a human seat on the clock, or a completed
    /// draft is a no-op.
    pub async fn run_auto_advance(self: Arc<Self>) {
        let secs = self.config.arena.auto_advance_secs;
        if secs == 0 {
            info!("auto-advance disabled (arena.auto_advance_secs = 0)");
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(secs));
        interval.tick().await;

        loop {
            interval.tick().await;

            let state = match self.active_state() {
                Ok(Some(state)) => state,
                Ok(None) => continue,
                Err(e) => {
                    warn!("auto-advance could not read state: {e:#}");
                    continue;
                }
            };
            if state.is_complete() {
                continue;
            }
            let Some((_, seat)) = state.on_the_clock() else {
                continue;
            };
            if state.seats[seat].archetype == HUMAN_ARCHETYPE {
                continue;
            }

            match self.advance_turn().await {
                Ok(CommitResult::Committed(_)) => {}
                Ok(CommitResult::Rejected(rejected)) => {
                    // A client-driven advance can beat the timer; that is
                    // exactly the duplicate race the recorder absorbs.
                    debug!("auto-advance rejected: {}", rejected.error);
                }
                Err(e) => warn!("auto-advance failed: {e:#}"),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn current_draft_id(&self) -> Result<Option<String>> {
        match self.store.get(NS_META, KEY_CURRENT_DRAFT)? {
            Some(value) => {
                let id = value
                    .as_str()
                    .context("stored current draft id is not a string")?;
                Ok(Some(id.to_string()))
            }
            None => Ok(None),
        }
    }

    fn active_state(&self) -> Result<Option<DraftState>> {
        match self.current_draft_id()? {
            Some(draft_id) => self.recorder.load_state(&draft_id),
            None => Ok(None),
        }
    }

    /// The active draft id and its fresh state, or a typed NotFound error.
    fn require_active(&self) -> Result<(String, DraftState)> {
        let Some(draft_id) = self.current_draft_id()? else {
            return Err(ArenaError::NotFound("no active draft".into()).into());
        };
        let Some(state) = self.recorder.load_state(&draft_id)? else {
            return Err(ArenaError::NotFound(format!(
                "no draft state stored for {draft_id}"
            ))
            .into());
        };
        Ok((draft_id, state))
    }

    fn publish_outcome(&self, draft_id: &str, result: &CommitResult) {
        let CommitResult::Committed(outcome) = result else {
            return;
        };

        // Send errors just mean nobody is listening.
        let _ = self.events.send(DraftEvent::PickCommitted {
            timestamp: Utc::now(),
            draft_id: draft_id.to_string(),
            pick: outcome.record.clone(),
            board_summary: outcome.board_summary.clone(),
            on_clock_seat: outcome.state.on_the_clock().map(|(_, seat)| seat),
        });

        if let Some(deviation) = &outcome.deviation {
            let _ = self.events.send(DraftEvent::DeviationDetected {
                timestamp: Utc::now(),
                draft_id: draft_id.to_string(),
                deviation: deviation.clone(),
            });
        }

        if outcome.state.is_complete() {
            let _ = self.events.send(DraftEvent::DraftComplete {
                timestamp: Utc::now(),
                draft_id: draft_id.to_string(),
                total_picks: outcome.state.total_picks(),
            });
        }
    }
}

fn rejected(error: ArenaError, state: DraftState) -> CommitResult {
    CommitResult::Rejected(CommitRejected {
        error,
        state: Some(state),
    })
}

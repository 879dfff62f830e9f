// Built-in archetype rules.
//
// Each rule is a short-circuiting sequence of checks specific to its
// archetype's declared bias. Numeric thresholds are archetype-specific
// tuning constants, not universal: a mild quantitative overshoot rates
// minor, a large overshoot (or passing up a forced/obvious in-archetype
// alternative) rates major.

use crate::draft::item::Category;

use super::{DeviationTag, RuleContext, RuleOutcome, Severity};

// ---------------------------------------------------------------------------
// Archetype names
// ---------------------------------------------------------------------------

pub const ZERO_RB: &str = "zero-rb";
pub const VALUE_HAWK: &str = "value-hawk";
pub const SCARCITY_FIRST: &str = "scarcity-first";
pub const RUN_FADER: &str = "run-fader";
pub const MOMENTUM: &str = "momentum";
pub const YOUTH_MOVEMENT: &str = "youth-movement";

// ---------------------------------------------------------------------------
// zero-rb: no running backs in the early rounds
// ---------------------------------------------------------------------------

/// Rounds in which drafting a running back breaks the strategy outright.
const ZERO_RB_EARLY_ROUNDS: u32 = 3;
/// Rounds in which an RB pick is only flagged when it chases an RB run.
const ZERO_RB_MID_ROUNDS: u32 = 5;

pub fn zero_rb(ctx: &RuleContext) -> Option<RuleOutcome> {
    if ctx.picked.category != Category::RunningBack {
        return None;
    }

    let round = ctx.pick.round;
    if round <= ZERO_RB_EARLY_ROUNDS {
        let severity = if round == 1 {
            Severity::Major
        } else {
            Severity::Minor
        };
        return Some((
            format!(
                "drafted {} (RB) in round {round} despite a no-early-RB strategy",
                ctx.picked.name
            ),
            DeviationTag::StrategyBreak,
            severity,
        ));
    }

    if round <= ZERO_RB_MID_ROUNDS {
        if let Some(run) = ctx
            .runs
            .iter()
            .find(|r| r.category == Category::RunningBack)
        {
            return Some((
                format!(
                    "chased the RB run ({} in last {} picks) in round {round}",
                    run.count, run.window
                ),
                DeviationTag::TrendFollow,
                Severity::Minor,
            ));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// value-hawk: never reach, never leave value on the board
// ---------------------------------------------------------------------------

/// Reach (rank minus pick number) that rates a minor flag.
const HAWK_REACH_MINOR: u32 = 8;
/// Reach that rates a major flag.
const HAWK_REACH_MAJOR: u32 = 14;
/// Passing an eligible card that has dropped this far is a major flag.
const HAWK_PASSED_DROP: u32 = 12;

pub fn value_hawk(ctx: &RuleContext) -> Option<RuleOutcome> {
    let reach = ctx.picked.rank.saturating_sub(ctx.pick.pick_number);
    if reach >= HAWK_REACH_MAJOR {
        return Some((
            format!(
                "reached {reach} ranks for {} (rank {}) at pick {}",
                ctx.picked.name, ctx.picked.rank, ctx.pick.pick_number
            ),
            DeviationTag::ValueDeviation,
            Severity::Major,
        ));
    }
    if reach >= HAWK_REACH_MINOR {
        return Some((
            format!(
                "reached {reach} ranks for {} (rank {}) at pick {}",
                ctx.picked.name, ctx.picked.rank, ctx.pick.pick_number
            ),
            DeviationTag::ValueDeviation,
            Severity::Minor,
        ));
    }

    // Took a worse-ranked card while a big eligible drop sat on the board.
    if let Some(passed) = ctx
        .drops
        .iter()
        .find(|d| d.drop >= HAWK_PASSED_DROP && d.item_id != ctx.picked.id)
    {
        if ctx.picked.rank > passed.rank {
            return Some((
                format!(
                    "left {} (down {}) on the board for {}",
                    passed.item_name, passed.drop, ctx.picked.name
                ),
                DeviationTag::ValueDeviation,
                Severity::Major,
            ));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// scarcity-first: always take the top card of the scarcest open category
// ---------------------------------------------------------------------------

/// Remaining supply at or below which ignoring the scarce category is major.
const SCARCITY_CRITICAL_REMAINING: usize = 2;

pub fn scarcity_first(ctx: &RuleContext) -> Option<RuleOutcome> {
    // Scarcest category the roster can still accept (context is sorted
    // scarcest-first already).
    let scarcest = ctx.scarcity.first()?;

    if ctx.picked.category != scarcest.category {
        let severity = if scarcest.remaining <= SCARCITY_CRITICAL_REMAINING {
            Severity::Major
        } else {
            Severity::Minor
        };
        return Some((
            format!(
                "ignored scarce {} ({} left) to take {} ({})",
                scarcest.category, scarcest.remaining, ctx.picked.name, ctx.picked.category
            ),
            DeviationTag::PositionalPivot,
            severity,
        ));
    }

    // Right category, wrong card: the archetype takes the top-ranked one.
    if let Some(top) = ctx.top_eligible_in(scarcest.category) {
        if top.id != ctx.picked.id {
            return Some((
                format!(
                    "took {} over the top-ranked scarce option {}",
                    ctx.picked.name, top.name
                ),
                DeviationTag::PositionalPivot,
                Severity::Minor,
            ));
        }
    }

    None
}

// ---------------------------------------------------------------------------
// run-fader: never pick into an active run
// ---------------------------------------------------------------------------

/// Run length at which picking into it is a major flag.
const FADER_EXTREME_RUN: usize = 5;

pub fn run_fader(ctx: &RuleContext) -> Option<RuleOutcome> {
    let run = ctx
        .runs
        .iter()
        .find(|r| r.category == ctx.picked.category)?;

    let severity = if run.count >= FADER_EXTREME_RUN {
        Severity::Major
    } else {
        Severity::Minor
    };
    Some((
        format!(
            "picked into the {} run ({} in last {} picks) instead of fading it",
            run.category, run.count, run.window
        ),
        DeviationTag::TrendFollow,
        severity,
    ))
}

// ---------------------------------------------------------------------------
// momentum: ride active runs, never fade them
// ---------------------------------------------------------------------------

/// Run length at which fading it is a major flag.
const MOMENTUM_STRONG_RUN: usize = 4;

pub fn momentum(ctx: &RuleContext) -> Option<RuleOutcome> {
    // Strongest eligible run (context is sorted strongest-first).
    let run = ctx.runs.first()?;
    if ctx.picked.category == run.category {
        return None;
    }

    let severity = if run.count >= MOMENTUM_STRONG_RUN {
        Severity::Major
    } else {
        Severity::Minor
    };
    Some((
        format!(
            "faded the {} run ({} in last {} picks) to take {} ({})",
            run.category, run.count, run.window, ctx.picked.name, ctx.picked.category
        ),
        DeviationTag::TrendFade,
        severity,
    ))
}

// ---------------------------------------------------------------------------
// youth-movement: prefer young players
// ---------------------------------------------------------------------------

/// Age at which a pick starts looking out of character.
const YOUTH_SOFT_AGE: u32 = 27;
/// Age at which a pick is flatly off-strategy.
const YOUTH_HARD_AGE: u32 = 30;
/// An alternative counts as comparable within this many ranks.
const YOUTH_RANK_SLACK: u32 = 6;
/// What "young" means to this archetype.
const YOUTH_TARGET_AGE: u32 = 24;

pub fn youth_movement(ctx: &RuleContext) -> Option<RuleOutcome> {
    if ctx.picked.age < YOUTH_SOFT_AGE {
        return None;
    }

    // Only a deviation when a comparable younger card was actually
    // draftable.
    let alternative = ctx.eligible.iter().find(|c| {
        c.id != ctx.picked.id
            && c.age <= YOUTH_TARGET_AGE
            && c.rank <= ctx.picked.rank + YOUTH_RANK_SLACK
    })?;

    let severity = if ctx.picked.age >= YOUTH_HARD_AGE {
        Severity::Major
    } else {
        Severity::Minor
    };
    Some((
        format!(
            "took {} (age {}) over younger {} (age {}, rank {})",
            ctx.picked.name, ctx.picked.age, alternative.name, alternative.age, alternative.rank
        ),
        DeviationTag::StrategyBreak,
        severity,
    ))
}

// Archetype deviation detection.
//
// Each AI-held seat declares a strategy archetype; after a pick commits,
// the registry's rule for that archetype judges whether the pick was in
// character. Rules see the board snapshot computed *before* the pick and
// the pool as it stood before the pick, both restricted to what the seat's
// roster could legally accept: a seat is never faulted for passing on a
// card it could not have drafted.

pub mod rules;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::{BoardSnapshot, RunSignal, ScarcitySignal, ValueDropSignal};
use crate::draft::item::{Category, PlayerCard};
use crate::draft::pick::PickRecord;
use crate::draft::roster::Roster;

// ---------------------------------------------------------------------------
// Deviation records
// ---------------------------------------------------------------------------

/// The closed taxonomy of deviation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviationTag {
    StrategyBreak,
    ValueDeviation,
    TrendFollow,
    TrendFade,
    PositionalPivot,
}

/// How far out of character the pick was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Major,
}

/// A recorded mismatch between a committed pick and its seat's declared
/// archetype. Append-only, keyed by pick number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
    /// The archetype that was violated.
    pub archetype: String,
    /// The pick that triggered the rule.
    pub pick_number: u32,
    /// Seat that made the pick.
    pub seat: usize,
    /// Human-readable description of what fired.
    pub trigger: String,
    /// Taxonomy tag.
    pub tag: DeviationTag,
    /// Minor or major.
    pub severity: Severity,
}

// ---------------------------------------------------------------------------
// Rule evaluation context
// ---------------------------------------------------------------------------

/// Everything a rule may inspect, pre-filtered for roster legality.
pub struct RuleContext<'a> {
    /// The committed pick under judgment.
    pub pick: &'a PickRecord,
    /// The picked card as it stood in the pool before the pick.
    pub picked: &'a PlayerCard,
    /// Pool cards (before the pick) the roster could legally accept,
    /// rank order, including the picked card itself.
    pub eligible: Vec<&'a PlayerCard>,
    /// Run signals on categories the roster could accept.
    pub runs: Vec<&'a RunSignal>,
    /// Value drops on cards the roster could accept.
    pub drops: Vec<&'a ValueDropSignal>,
    /// Scarcity signals on categories the roster could accept.
    pub scarcity: Vec<&'a ScarcitySignal>,
}

impl<'a> RuleContext<'a> {
    /// Build a context from the pre-pick pool, pre-pick roster, and the
    /// board snapshot computed before the pick. Returns `None` when the
    /// picked card cannot be found in the pre-pick pool (nothing to judge).
    pub fn new(
        pick: &'a PickRecord,
        board: &'a BoardSnapshot,
        pool_before: &'a [PlayerCard],
        roster_before: &'a Roster,
    ) -> Option<Self> {
        let picked = pool_before.iter().find(|c| c.id == pick.item_id)?;

        let eligible: Vec<&PlayerCard> = pool_before
            .iter()
            .filter(|c| roster_before.can_accept(c.category))
            .collect();

        let runs = board
            .runs
            .iter()
            .filter(|r| roster_before.can_accept(r.category))
            .collect();
        let drops = board
            .drops
            .iter()
            .filter(|d| roster_before.can_accept(d.category))
            .collect();
        let scarcity = board
            .scarcity
            .iter()
            .filter(|s| roster_before.can_accept(s.category))
            .collect();

        Some(RuleContext {
            pick,
            picked,
            eligible,
            runs,
            drops,
            scarcity,
        })
    }

    /// Whether every eligible card shares one category: a forced pick, in
    /// which no deviation is ever reported because there was no choice.
    pub fn is_forced_pick(&self) -> bool {
        let mut cats = self.eligible.iter().map(|c| c.category);
        match cats.next() {
            None => true,
            Some(first) => cats.all(|c| c == first),
        }
    }

    /// Best-ranked eligible card of `category`, if any.
    pub fn top_eligible_in(&self, category: Category) -> Option<&'a PlayerCard> {
        self.eligible
            .iter()
            .filter(|c| c.category == category)
            .min_by_key(|c| c.rank)
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A rule returns what fired: (trigger description, tag, severity).
pub type RuleOutcome = (String, DeviationTag, Severity);
pub type RuleFn = fn(&RuleContext) -> Option<RuleOutcome>;

/// Maps archetype names to their evaluation rules. Unregistered archetypes
/// (including the `human` sentinel) are never flagged.
pub struct ArchetypeRegistry {
    rules: HashMap<&'static str, RuleFn>,
}

impl ArchetypeRegistry {
    /// Registry with no rules; nothing is ever flagged.
    pub fn empty() -> Self {
        ArchetypeRegistry {
            rules: HashMap::new(),
        }
    }

    /// The standard registry with all built-in archetypes.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(rules::ZERO_RB, rules::zero_rb);
        registry.register(rules::VALUE_HAWK, rules::value_hawk);
        registry.register(rules::SCARCITY_FIRST, rules::scarcity_first);
        registry.register(rules::RUN_FADER, rules::run_fader);
        registry.register(rules::MOMENTUM, rules::momentum);
        registry.register(rules::YOUTH_MOVEMENT, rules::youth_movement);
        registry
    }

    /// Register (or replace) a rule.
    pub fn register(&mut self, archetype: &'static str, rule: RuleFn) {
        self.rules.insert(archetype, rule);
    }

    /// Whether an archetype name has a registered rule.
    pub fn is_registered(&self, archetype: &str) -> bool {
        self.rules.contains_key(archetype)
    }

    /// Names of all registered archetypes, sorted.
    pub fn archetype_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.rules.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Judge a committed pick against its seat's declared archetype.
    ///
    /// Returns `None` when the archetype is unregistered, the pick was
    /// forced (all eligible cards shared one category), or no rule check
    /// fired.
    pub fn evaluate(
        &self,
        archetype: &str,
        pick: &PickRecord,
        board: &BoardSnapshot,
        pool_before: &[PlayerCard],
        roster_before: &Roster,
    ) -> Option<Deviation> {
        let rule = self.rules.get(archetype)?;
        let ctx = RuleContext::new(pick, board, pool_before, roster_before)?;
        if ctx.is_forced_pick() {
            return None;
        }
        let (trigger, tag, severity) = rule(&ctx)?;
        Some(Deviation {
            archetype: archetype.to_string(),
            pick_number: pick.pick_number,
            seat: pick.seat,
            trigger,
            tag,
            severity,
        })
    }
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

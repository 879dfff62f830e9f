// Prompt templates for the LLM-backed advisor.
//
// Constructs compact, structured prompts for pick selection. Each prompt
// includes pre-computed board signals and rank data so the model focuses on
// trade-offs rather than arithmetic, and demands a strict JSON reply the
// client can parse.

use crate::draft::roster::Roster;
use crate::draft::state::DraftState;

/// How many recent picks to show in the prompt.
const RECENT_PICKS_SHOWN: usize = 8;

/// How many top eligible cards to show in the prompt.
const TOP_AVAILABLE_SHOWN: usize = 12;

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Static system prompt for all pick-advisory calls.
pub fn system_prompt() -> String {
    "You are a general manager in a snake draft. Rosters hold one dedicated slot per \
     position (QB/RB/WR/TE) plus one FLEX slot that accepts any position; once the \
     FLEX slot is filled it never reopens.\n\
     \n\
     Each turn you receive the board state and must choose exactly one card from the \
     TOP AVAILABLE list. Respect your declared strategy archetype. Use the pre-computed \
     ranks and signals provided - do NOT do arithmetic.\n\
     \n\
     Reply with a single JSON object and nothing else:\n\
     {\"item_id\": \"<id from the list>\", \"category\": \"QB|RB|WR|TE\", \
     \"rationale\": \"<one or two sentences>\", \"confidence\": <0.0-1.0>}"
        .to_string()
}

// ---------------------------------------------------------------------------
// Pick prompt
// ---------------------------------------------------------------------------

/// Build the per-turn prompt for `seat`.
///
/// Sections: the turn header, the seat's roster and eligible categories,
/// board signals, recent picks, and the top eligible cards to choose from.
pub fn build_pick_prompt(state: &DraftState, seat: usize, board_summary: &str) -> String {
    let seat_state = &state.seats[seat];
    let (round, _) = crate::draft::turn::turn_for(state.next_pick, state.seats.len());

    let mut prompt = String::with_capacity(2048);

    // Section 1: ON THE CLOCK header
    prompt.push_str(&format!(
        "## ON THE CLOCK\n\
         Pick #{} of {} | Round {} of {}\n\
         Seat: {} | Archetype: {}\n\n",
        state.next_pick,
        state.total_picks(),
        round,
        state.rounds,
        seat_state.display_name,
        seat_state.archetype,
    ));

    // Section 2: MY ROSTER
    prompt.push_str("## MY ROSTER\n");
    prompt.push_str(&format_roster_for_prompt(&seat_state.roster));
    prompt.push('\n');

    // Section 3: ELIGIBLE CATEGORIES
    let eligible = seat_state.roster.eligible_categories();
    let eligible_str = eligible
        .iter()
        .map(|c| c.display_str())
        .collect::<Vec<_>>()
        .join(", ");
    prompt.push_str(&format!("## ELIGIBLE CATEGORIES\n{eligible_str}\n\n"));

    // Section 4: BOARD SIGNALS
    prompt.push_str(&format!("## BOARD SIGNALS\n{board_summary}\n\n"));

    // Section 5: RECENT PICKS
    let recent = state.recent_picks(RECENT_PICKS_SHOWN);
    if !recent.is_empty() {
        prompt.push_str("## RECENT PICKS\n");
        for pick in recent {
            prompt.push_str(&format!(
                "  #{} {} ({}) -> {}\n",
                pick.pick_number, pick.item_name, pick.category, state.seats[pick.seat].display_name,
            ));
        }
        prompt.push('\n');
    }

    // Section 6: TOP AVAILABLE
    prompt.push_str("## TOP AVAILABLE (eligible for your roster)\n");
    for card in state.eligible_pool_for(seat).iter().take(TOP_AVAILABLE_SHOWN) {
        prompt.push_str(&format!(
            "  {} | {} ({}) rank {} age {} - {}\n",
            card.id, card.name, card.category, card.rank, card.age, card.college,
        ));
    }
    prompt.push('\n');

    // Section 7: Closing instruction
    prompt.push_str("## YOUR PICK\nChoose one card from TOP AVAILABLE. Reply with the JSON object only.");

    prompt
}

/// Format a roster as one line per slot.
fn format_roster_for_prompt(roster: &Roster) -> String {
    let mut out = String::new();
    for slot in &roster.slots {
        match &slot.card {
            Some(card) => out.push_str(&format!(
                "  {:4} : {} (rank {})\n",
                slot.name.to_string(),
                card.name,
                card.rank
            )),
            None => out.push_str(&format!("  {:4} : (open)\n", slot.name.to_string())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::NO_SIGNALS_SUMMARY;
    use crate::draft::item::{Category, PlayerCard};

    fn card(id: &str, category: Category, rank: u32) -> PlayerCard {
        PlayerCard {
            id: id.into(),
            name: format!("Player {id}"),
            category,
            rank,
            age: 22,
            college: "Test U".into(),
        }
    }

    fn sample_state() -> DraftState {
        let mut state = DraftState::new(
            "draft_test",
            vec![
                ("Alpha".into(), "zero-rb".into()),
                ("Bravo".into(), "human".into()),
            ],
            3,
        );
        state.seed_pool(vec![
            card("rb1", Category::RunningBack, 1),
            card("wr1", Category::WideReceiver, 2),
            card("qb1", Category::Quarterback, 3),
            card("te1", Category::TightEnd, 4),
            card("wr2", Category::WideReceiver, 5),
            card("rb2", Category::RunningBack, 6),
        ]);
        state
    }

    #[test]
    fn prompt_contains_required_sections() {
        let state = sample_state();
        let prompt = build_pick_prompt(&state, 0, NO_SIGNALS_SUMMARY);

        assert!(prompt.contains("## ON THE CLOCK"));
        assert!(prompt.contains("## MY ROSTER"));
        assert!(prompt.contains("## ELIGIBLE CATEGORIES"));
        assert!(prompt.contains("## BOARD SIGNALS"));
        assert!(prompt.contains("## TOP AVAILABLE"));
        assert!(prompt.contains("## YOUR PICK"));
    }

    #[test]
    fn prompt_names_seat_and_archetype() {
        let state = sample_state();
        let prompt = build_pick_prompt(&state, 0, NO_SIGNALS_SUMMARY);
        assert!(prompt.contains("Seat: Alpha"));
        assert!(prompt.contains("Archetype: zero-rb"));
        assert!(prompt.contains("Pick #1 of 6"));
    }

    #[test]
    fn prompt_lists_eligible_cards_with_ids() {
        let state = sample_state();
        let prompt = build_pick_prompt(&state, 0, NO_SIGNALS_SUMMARY);
        assert!(prompt.contains("rb1 | Player rb1"));
        assert!(prompt.contains("rank 1"));
    }

    #[test]
    fn prompt_omits_ineligible_cards() {
        let mut state = sample_state();
        // Fill seat 0's RB dedicated slot and FLEX.
        state.apply_pick(0, "rb1", String::new(), 0.5).unwrap();
        state.apply_pick(1, "wr1", String::new(), 0.5).unwrap();
        state.apply_pick(1, "qb1", String::new(), 0.5).unwrap();
        state.apply_pick(0, "rb2", String::new(), 0.5).unwrap();

        let prompt = build_pick_prompt(&state, 0, NO_SIGNALS_SUMMARY);
        let available_section = prompt.split("## TOP AVAILABLE").nth(1).unwrap();
        assert!(!available_section.contains("RB)"));
        assert!(available_section.contains("te1"));
    }

    #[test]
    fn prompt_includes_recent_picks_after_history() {
        let mut state = sample_state();
        state.apply_pick(0, "rb1", "opening pick".into(), 0.9).unwrap();

        let prompt = build_pick_prompt(&state, 1, NO_SIGNALS_SUMMARY);
        assert!(prompt.contains("## RECENT PICKS"));
        assert!(prompt.contains("#1 Player rb1 (RB) -> Alpha"));
    }

    #[test]
    fn prompt_skips_recent_picks_when_empty() {
        let state = sample_state();
        let prompt = build_pick_prompt(&state, 0, NO_SIGNALS_SUMMARY);
        assert!(!prompt.contains("## RECENT PICKS"));
    }

    #[test]
    fn system_prompt_demands_json_reply() {
        let system = system_prompt();
        assert!(system.contains("item_id"));
        assert!(system.contains("confidence"));
        assert!(system.contains("JSON"));
    }

    #[test]
    fn board_summary_is_passed_through_verbatim() {
        let state = sample_state();
        let summary = "Runs: RB x3 in last 8 picks";
        let prompt = build_pick_prompt(&state, 0, summary);
        assert!(prompt.contains(summary));
    }
}

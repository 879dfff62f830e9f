// Claude API client for the LLM-backed advisor.
//
// Sends a single non-streaming request to the Anthropic Messages API per
// turn and parses the JSON candidate out of the reply text. Wrapped in an
// Active/Disabled enum so a missing API key degrades to the deterministic
// fallback instead of failing startup.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::draft::item::Category;
use crate::draft::state::DraftState;

use super::{prompt, Advisor, Candidate};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// ClaudeAdvisor
// ---------------------------------------------------------------------------

/// Low-level Claude API advisor client.
pub struct ClaudeAdvisor {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeAdvisor {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    /// Request a candidate pick for `seat`.
    async fn request_candidate(
        &self,
        state: &DraftState,
        seat: usize,
        board_summary: &str,
    ) -> Result<Candidate> {
        if self.api_key.is_empty() {
            bail!("API key not configured");
        }

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": prompt::system_prompt(),
            "messages": [{
                "role": "user",
                "content": prompt::build_pick_prompt(state, seat, board_summary),
            }]
        });

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("advisor request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("API returned status {status}");
        }

        let reply: Value = response
            .json()
            .await
            .context("failed to read advisor response body")?;
        let text = extract_reply_text(&reply)
            .ok_or_else(|| anyhow!("advisor response contained no text block"))?;
        debug!(seat, "advisor reply: {text}");

        parse_candidate(&text).ok_or_else(|| anyhow!("advisor reply did not contain a valid pick"))
    }
}

// ---------------------------------------------------------------------------
// LlmAdvisor wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either an active Claude advisor or disabled.
pub enum LlmAdvisor {
    /// Claude API is configured and ready.
    Active(ClaudeAdvisor),
    /// No API key configured; every proposal errors and the orchestrator
    /// falls back to the deterministic rule.
    Disabled,
}

impl LlmAdvisor {
    /// Build an `LlmAdvisor` from the application config. Returns `Active`
    /// when an API key is present in credentials, otherwise `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => LlmAdvisor::Active(ClaudeAdvisor::new(
                key.clone(),
                config.advisor.model.clone(),
                config.advisor.max_tokens,
            )),
            _ => LlmAdvisor::Disabled,
        }
    }
}

#[async_trait]
impl Advisor for LlmAdvisor {
    async fn propose(
        &self,
        state: &DraftState,
        seat: usize,
        board_summary: &str,
    ) -> Result<Candidate> {
        match self {
            LlmAdvisor::Active(client) => {
                client.request_candidate(state, seat, board_summary).await
            }
            LlmAdvisor::Disabled => bail!("LLM advisor not configured"),
        }
    }
}

// ---------------------------------------------------------------------------
// Reply parsing helpers
// ---------------------------------------------------------------------------

/// Extract the first text block from a Messages API response.
///
/// Expected shape: `{ "content": [{ "type": "text", "text": "..." }] }`
pub(crate) fn extract_reply_text(reply: &Value) -> Option<String> {
    reply
        .get("content")?
        .as_array()?
        .iter()
        .find_map(|block| block.get("text")?.as_str().map(|s| s.to_string()))
}

/// Raw candidate as the model is asked to emit it. Category arrives as a
/// string so both the "QB" abbreviation and the full variant name parse.
#[derive(Debug, serde::Deserialize)]
struct RawCandidate {
    item_id: String,
    category: String,
    #[serde(default)]
    rationale: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// Parse a candidate out of free-form reply text.
///
/// Tolerates prose around the JSON object by slicing from the first `{` to
/// the last `}`. Confidence is clamped to [0, 1].
pub(crate) fn parse_candidate(text: &str) -> Option<Candidate> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawCandidate = serde_json::from_str(&text[start..=end]).ok()?;
    let category = parse_category(&raw.category)?;
    Some(Candidate {
        item_id: raw.item_id,
        category,
        rationale: raw.rationale,
        confidence: raw.confidence.clamp(0.0, 1.0),
    })
}

fn parse_category(s: &str) -> Option<Category> {
    Category::from_str_cat(s)
        .or_else(|| serde_json::from_value(Value::String(s.to_string())).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::NO_SIGNALS_SUMMARY;
    use crate::config::{AdvisorConfig, ArenaConfig, Config, CredentialsConfig, SeatSpec};
    use crate::draft::item::PlayerCard;

    // -- Reply text extraction --

    #[test]
    fn extract_reply_text_from_messages_response() {
        let reply = serde_json::json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": "{\"item_id\":\"rb1\"}" }],
            "model": "claude-sonnet-4-5-20250929",
            "usage": { "input_tokens": 42, "output_tokens": 20 }
        });
        assert_eq!(
            extract_reply_text(&reply),
            Some("{\"item_id\":\"rb1\"}".to_string())
        );
    }

    #[test]
    fn extract_reply_text_skips_non_text_blocks() {
        let reply = serde_json::json!({
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "the pick" }
            ]
        });
        assert_eq!(extract_reply_text(&reply), Some("the pick".to_string()));
    }

    #[test]
    fn extract_reply_text_missing_content() {
        let reply = serde_json::json!({ "id": "msg_1" });
        assert_eq!(extract_reply_text(&reply), None);
    }

    // -- Candidate parsing --

    #[test]
    fn parse_candidate_clean_json() {
        let text = r#"{"item_id": "wr-03", "category": "WR", "rationale": "best receiver left", "confidence": 0.8}"#;
        let candidate = parse_candidate(text).unwrap();
        assert_eq!(candidate.item_id, "wr-03");
        assert_eq!(candidate.category, Category::WideReceiver);
        assert_eq!(candidate.rationale, "best receiver left");
        assert!((candidate.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_candidate_with_surrounding_prose() {
        let text = "Here is my pick:\n{\"item_id\": \"qb-01\", \"category\": \"QB\", \
                    \"rationale\": \"elite arm\", \"confidence\": 0.9}\nGood luck!";
        let candidate = parse_candidate(text).unwrap();
        assert_eq!(candidate.item_id, "qb-01");
        assert_eq!(candidate.category, Category::Quarterback);
    }

    #[test]
    fn parse_candidate_accepts_full_variant_name() {
        let text = r#"{"item_id": "te-02", "category": "TightEnd", "confidence": 0.7}"#;
        let candidate = parse_candidate(text).unwrap();
        assert_eq!(candidate.category, Category::TightEnd);
    }

    #[test]
    fn parse_candidate_clamps_confidence() {
        let text = r#"{"item_id": "rb-01", "category": "RB", "confidence": 1.7}"#;
        assert!((parse_candidate(text).unwrap().confidence - 1.0).abs() < f64::EPSILON);

        let text = r#"{"item_id": "rb-01", "category": "RB", "confidence": -0.3}"#;
        assert!(parse_candidate(text).unwrap().confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn parse_candidate_defaults_missing_fields() {
        let text = r#"{"item_id": "rb-01", "category": "RB"}"#;
        let candidate = parse_candidate(text).unwrap();
        assert_eq!(candidate.rationale, "");
        assert!((candidate.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_candidate_rejects_unknown_category() {
        let text = r#"{"item_id": "k-01", "category": "K", "confidence": 0.5}"#;
        assert!(parse_candidate(text).is_none());
    }

    #[test]
    fn parse_candidate_rejects_no_json() {
        assert!(parse_candidate("I cannot decide.").is_none());
        assert!(parse_candidate("").is_none());
        assert!(parse_candidate("} backwards {").is_none());
    }

    // -- LlmAdvisor wrapper --

    fn make_test_config(api_key: Option<String>) -> Config {
        Config {
            arena: ArenaConfig {
                name: "Test Arena".into(),
                rounds: 5,
                auto_advance_secs: 0,
                seats: vec![
                    SeatSpec {
                        name: "Operator".into(),
                        archetype: "human".into(),
                    },
                    SeatSpec {
                        name: "Hawk".into(),
                        archetype: "value-hawk".into(),
                    },
                ],
            },
            signals: crate::board::SignalConfig::default(),
            advisor: AdvisorConfig {
                model: "claude-sonnet-4-5-20250929".into(),
                max_tokens: 400,
            },
            credentials: CredentialsConfig {
                anthropic_api_key: api_key,
            },
            ws_port: 9100,
            db_path: "test.db".into(),
            catalog_path: "data/catalog.csv".into(),
        }
    }

    #[test]
    fn from_config_with_api_key_returns_active() {
        let config = make_test_config(Some("sk-ant-test-key".to_string()));
        assert!(matches!(
            LlmAdvisor::from_config(&config),
            LlmAdvisor::Active(_)
        ));
    }

    #[test]
    fn from_config_without_api_key_returns_disabled() {
        let config = make_test_config(None);
        assert!(matches!(
            LlmAdvisor::from_config(&config),
            LlmAdvisor::Disabled
        ));
    }

    #[test]
    fn from_config_with_empty_api_key_returns_disabled() {
        let config = make_test_config(Some(String::new()));
        assert!(matches!(
            LlmAdvisor::from_config(&config),
            LlmAdvisor::Disabled
        ));
    }

    #[tokio::test]
    async fn disabled_advisor_errors_so_caller_falls_back() {
        let mut state = DraftState::new(
            "draft_test",
            vec![("Solo".into(), "value-hawk".into())],
            1,
        );
        state.seed_pool(vec![PlayerCard {
            id: "rb1".into(),
            name: "Back".into(),
            category: Category::RunningBack,
            rank: 1,
            age: 22,
            college: "Test U".into(),
        }]);

        let err = LlmAdvisor::Disabled
            .propose(&state, 0, NO_SIGNALS_SUMMARY)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}

// WebSocket server for operator clients and spectators.
//
// Each connected client can issue `Command` messages and receives a `Reply`
// per command; every client also receives the broadcast `DraftEvent` stream,
// so spectators see picks and deviations as they commit. Connections are
// independent: a slow spectator lags its own event subscription without
// affecting anyone else.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};

use crate::errors::ArenaError;
use crate::orchestrator::Orchestrator;
use crate::protocol::{ArchetypeAssignment, Command, Reply, StateView};
use crate::recorder::CommitResult;

/// Run the WebSocket server on the given port.
///
/// Binds a TCP listener on `127.0.0.1:{port}` and spawns one task per
/// accepted connection. The server runs until the task is cancelled or the
/// process exits.
pub async fn run(port: u16, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("WebSocket server listening on {}", listener.local_addr()?);

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("accepted connection from {addr_str}");

        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };
            serve_client(ws_stream, orchestrator, &addr_str).await;
        });
    }
}

/// Serve one client: answer its commands and forward broadcast events.
///
/// Generic over the stream type so it can be exercised with in-memory
/// streams without opening TCP ports.
pub async fn serve_client<S>(
    ws_stream: WebSocketStream<S>,
    orchestrator: Arc<Orchestrator>,
    addr: &str,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();
    let mut events = orchestrator.subscribe();

    loop {
        tokio::select! {
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let reply = handle_command_text(&orchestrator, &text).await;
                    if !send_json(&mut write, &reply).await {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("client {addr} disconnected");
                    break;
                }
                Some(Ok(_)) => {
                    // Ignore Binary, Ping, Pong, Frame variants.
                }
                Some(Err(e)) => {
                    warn!("WebSocket error from {addr}: {e}");
                    break;
                }
            },

            event = events.recv() => match event {
                Ok(event) => {
                    if !send_json(&mut write, &event).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("client {addr} lagged, dropped {n} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Serialize `value` and send it as a text frame. Returns `false` when the
/// connection is gone and the caller should stop.
async fn send_json<S, T>(
    write: &mut futures_util::stream::SplitSink<WebSocketStream<S>, Message>,
    value: &T,
) -> bool
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: Serialize,
{
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize outgoing message: {e}");
            return true;
        }
    };
    write.send(Message::Text(json.into())).await.is_ok()
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Parse one incoming text frame and dispatch it. Unparseable input gets a
/// validation error reply instead of dropping the connection.
pub async fn handle_command_text(orchestrator: &Orchestrator, text: &str) -> Reply {
    let command: Command = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            return Reply::Error {
                code: "validation".into(),
                message: format!("unrecognized command: {e}"),
                state: None,
            };
        }
    };
    dispatch(orchestrator, command).await
}

/// Map one command onto the orchestrator's public operations and shape the
/// outcome into a reply.
pub async fn dispatch(orchestrator: &Orchestrator, command: Command) -> Reply {
    match command {
        Command::StartDraft => match orchestrator.start_draft().await {
            Ok(state) => Reply::DraftStarted {
                draft_id: state.draft_id.clone(),
                pool_size: state.pool.len(),
                state: StateView::from_state(&state),
            },
            Err(e) => error_reply(e),
        },
        Command::AdvanceTurn => match orchestrator.advance_turn().await {
            Ok(result) => commit_reply(result),
            Err(e) => error_reply(e),
        },
        Command::HumanPick { item_id, rationale } => {
            match orchestrator.human_pick(&item_id, &rationale) {
                Ok(result) => commit_reply(result),
                Err(e) => error_reply(e),
            }
        }
        Command::GetState => match orchestrator.get_state() {
            Ok(state) => Reply::State {
                state: StateView::from_state(&state),
            },
            Err(e) => error_reply(e),
        },
        Command::GetAvailable => match orchestrator.get_available() {
            Ok(items) => Reply::Available { items },
            Err(e) => error_reply(e),
        },
        Command::GetDeviations => {
            let state = match orchestrator.get_state() {
                Ok(state) => state,
                Err(e) => return error_reply(e),
            };
            match orchestrator.get_deviations() {
                Ok(deviations) => Reply::Deviations {
                    assignments: state
                        .seats
                        .iter()
                        .map(|s| ArchetypeAssignment {
                            seat: s.seat,
                            display_name: s.display_name.clone(),
                            archetype: s.archetype.clone(),
                        })
                        .collect(),
                    deviations,
                },
                Err(e) => error_reply(e),
            }
        }
    }
}

fn commit_reply(result: CommitResult) -> Reply {
    match result {
        CommitResult::Committed(outcome) => Reply::PickCommitted {
            pick: outcome.record,
            deviation: outcome.deviation,
            board_summary: outcome.board_summary,
            state: StateView::from_state(&outcome.state),
        },
        CommitResult::Rejected(rejected) => Reply::Error {
            code: rejected.error.code().into(),
            message: rejected.error.to_string(),
            state: rejected.state.as_ref().map(StateView::from_state),
        },
    }
}

fn error_reply(err: anyhow::Error) -> Reply {
    let code = err
        .downcast_ref::<ArenaError>()
        .map(ArenaError::code)
        .unwrap_or("internal");
    Reply::Error {
        code: code.into(),
        message: format!("{err:#}"),
        state: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::BestAvailableAdvisor;
    use crate::board::SignalConfig;
    use crate::config::{AdvisorConfig, ArenaConfig, Config, CredentialsConfig, SeatSpec};
    use crate::store::SqliteStore;
    use std::path::PathBuf;

    const TEST_CSV: &str = "\
id,name,position,rank,age,college
rb-01,Deshawn Carter,RB,1,22,Alabama
wr-01,Tyler Brooks,WR,2,21,Ohio State
qb-01,Mason Reeves,QB,3,21,Oregon
te-01,Sam Okafor,TE,4,23,Iowa
rb-02,Jalen Price,RB,5,23,Georgia
wr-02,Marcus Hill,WR,6,22,USC
";

    fn write_temp_catalog(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ws_server_catalog_{}_{}.csv",
            tag,
            std::process::id()
        ));
        std::fs::write(&path, TEST_CSV).unwrap();
        path
    }

    fn test_orchestrator(seats: Vec<(&str, &str)>, rounds: u32, tag: &str) -> (Orchestrator, PathBuf) {
        let catalog = write_temp_catalog(tag);
        let config = Config {
            arena: ArenaConfig {
                name: "Test Arena".into(),
                rounds,
                auto_advance_secs: 0,
                seats: seats
                    .into_iter()
                    .map(|(name, archetype)| SeatSpec {
                        name: name.into(),
                        archetype: archetype.into(),
                    })
                    .collect(),
            },
            signals: SignalConfig::default(),
            advisor: AdvisorConfig {
                model: "claude-sonnet-4-5-20250929".into(),
                max_tokens: 400,
            },
            credentials: CredentialsConfig {
                anthropic_api_key: None,
            },
            ws_port: 9100,
            db_path: ":memory:".into(),
            catalog_path: catalog.to_string_lossy().into_owned(),
        };
        let store: std::sync::Arc<SqliteStore> =
            std::sync::Arc::new(SqliteStore::open(":memory:").unwrap());
        (
            Orchestrator::new(config, store, std::sync::Arc::new(BestAvailableAdvisor)),
            catalog,
        )
    }

    #[tokio::test]
    async fn unparseable_text_gets_validation_reply() {
        let (orch, catalog) = test_orchestrator(
            vec![("A", "human"), ("B", "value-hawk")],
            1,
            "unparseable",
        );

        let reply = handle_command_text(&orch, "not json at all").await;
        match reply {
            Reply::Error { code, state, .. } => {
                assert_eq!(code, "validation");
                assert!(state.is_none());
            }
            other => panic!("expected Error reply, got {other:?}"),
        }

        let _ = std::fs::remove_file(&catalog);
    }

    #[tokio::test]
    async fn start_draft_command_replies_with_view() {
        let (orch, catalog) = test_orchestrator(
            vec![("A", "human"), ("B", "value-hawk")],
            2,
            "start_cmd",
        );

        let reply = handle_command_text(&orch, r#"{"type": "start_draft"}"#).await;
        match reply {
            Reply::DraftStarted {
                draft_id,
                pool_size,
                state,
            } => {
                assert!(draft_id.starts_with("draft_"));
                assert_eq!(pool_size, 6);
                assert_eq!(state.total_picks, 4);
                assert_eq!(state.on_clock_seat, Some(0));
            }
            other => panic!("expected DraftStarted, got {other:?}"),
        }

        let _ = std::fs::remove_file(&catalog);
    }

    #[tokio::test]
    async fn get_state_without_draft_is_not_found() {
        let (orch, catalog) = test_orchestrator(
            vec![("A", "human"), ("B", "value-hawk")],
            1,
            "no_draft",
        );

        let reply = handle_command_text(&orch, r#"{"type": "get_state"}"#).await;
        match reply {
            Reply::Error { code, .. } => assert_eq!(code, "not_found"),
            other => panic!("expected Error reply, got {other:?}"),
        }

        let _ = std::fs::remove_file(&catalog);
    }

    #[tokio::test]
    async fn advance_command_commits_and_shapes_reply() {
        let (orch, catalog) = test_orchestrator(
            vec![("Hawk", "value-hawk"), ("Fader", "run-fader")],
            1,
            "advance_cmd",
        );
        handle_command_text(&orch, r#"{"type": "start_draft"}"#).await;

        let reply = handle_command_text(&orch, r#"{"type": "advance_turn"}"#).await;
        match reply {
            Reply::PickCommitted {
                pick,
                board_summary,
                state,
                ..
            } => {
                assert_eq!(pick.pick_number, 1);
                assert_eq!(pick.item_id, "rb-01");
                assert!(!board_summary.is_empty());
                assert_eq!(state.next_pick, 2);
                assert_eq!(state.pool_remaining, 5);
            }
            other => panic!("expected PickCommitted, got {other:?}"),
        }

        let _ = std::fs::remove_file(&catalog);
    }

    #[tokio::test]
    async fn rejected_human_pick_reply_carries_fresh_state() {
        // AI seat on the clock: a human_pick must be rejected, and the
        // reply must include the authoritative state for resync.
        let (orch, catalog) = test_orchestrator(
            vec![("Hawk", "value-hawk"), ("Operator", "human")],
            1,
            "reject_state",
        );
        handle_command_text(&orch, r#"{"type": "start_draft"}"#).await;

        let reply = handle_command_text(
            &orch,
            r#"{"type": "human_pick", "item_id": "rb-01"}"#,
        )
        .await;
        match reply {
            Reply::Error { code, state, .. } => {
                assert_eq!(code, "validation");
                let state = state.expect("fresh state must ride along");
                assert_eq!(state.next_pick, 1);
                assert_eq!(state.on_clock_seat, Some(0));
            }
            other => panic!("expected Error reply, got {other:?}"),
        }

        let _ = std::fs::remove_file(&catalog);
    }

    #[tokio::test]
    async fn get_deviations_reports_assignments() {
        let (orch, catalog) = test_orchestrator(
            vec![("Contrarian", "zero-rb"), ("Fader", "run-fader")],
            1,
            "deviations_cmd",
        );
        handle_command_text(&orch, r#"{"type": "start_draft"}"#).await;
        // zero-rb takes the rank-1 RB: a guaranteed strategy break.
        handle_command_text(&orch, r#"{"type": "advance_turn"}"#).await;

        let reply = handle_command_text(&orch, r#"{"type": "get_deviations"}"#).await;
        match reply {
            Reply::Deviations {
                assignments,
                deviations,
            } => {
                assert_eq!(assignments.len(), 2);
                assert_eq!(assignments[0].archetype, "zero-rb");
                assert_eq!(deviations.len(), 1);
                assert_eq!(deviations[0].pick_number, 1);
            }
            other => panic!("expected Deviations, got {other:?}"),
        }

        let _ = std::fs::remove_file(&catalog);
    }

    #[tokio::test]
    async fn replies_serialize_to_client_json() {
        let (orch, catalog) = test_orchestrator(
            vec![("A", "human"), ("B", "value-hawk")],
            1,
            "serialize",
        );
        let reply = handle_command_text(&orch, r#"{"type": "get_available"}"#).await;

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "not_found");

        let _ = std::fs::remove_file(&catalog);
    }
}

// Draft arena entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the store, check for crash recovery
// 4. Build the advisor (Claude-backed when an API key is configured)
// 5. Build the orchestrator
// 6. Spawn the WebSocket server task
// 7. Spawn the auto-advance timer task
// 8. Wait for Ctrl+C
// 9. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use draft_arena::advisor::client::LlmAdvisor;
use draft_arena::config;
use draft_arena::orchestrator::Orchestrator;
use draft_arena::store::SqliteStore;
use draft_arena::ws_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Draft arena starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: arena={}, {} seats, {} rounds",
        config.arena.name,
        config.arena.seats.len(),
        config.arena.rounds
    );

    // 3. Open the store
    let store = Arc::new(
        SqliteStore::open(&config.db_path).context("failed to open store")?,
    );
    info!("Store opened at {}", config.db_path);

    // 4. Build the advisor
    let advisor = LlmAdvisor::from_config(&config);
    match &advisor {
        LlmAdvisor::Active(_) => info!("LLM advisor initialized (API key configured)"),
        LlmAdvisor::Disabled => {
            info!("LLM advisor disabled (no API key); using deterministic fallback")
        }
    }

    // 5. Build the orchestrator
    let ws_port = config.ws_port;
    let orchestrator = Arc::new(Orchestrator::new(config, store, Arc::new(advisor)));

    // Check for crash recovery
    match orchestrator.recover() {
        Ok(Some(state)) => info!(
            "Draft {} restored from previous session at pick {}",
            state.draft_id, state.next_pick
        ),
        Ok(None) => info!("No draft in progress; waiting for start_draft"),
        Err(e) => {
            error!("Crash recovery failed: {e:#}");
            return Err(e.context("crash recovery failed"));
        }
    }

    // 6. Spawn the WebSocket server task
    let ws_orchestrator = Arc::clone(&orchestrator);
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, ws_orchestrator).await {
            error!("WebSocket server error: {e:#}");
        }
    });

    // 7. Spawn the auto-advance timer task
    let advance_handle = tokio::spawn(Arc::clone(&orchestrator).run_auto_advance());

    info!("Arena ready. WebSocket server listening on 127.0.0.1:{ws_port}");

    // 8. Wait for Ctrl+C
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // 9. Cleanup: both background tasks loop forever, abort them.
    advance_handle.abort();
    ws_handle.abort();

    info!("Draft arena shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, keeping the terminal free for the
/// operator.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draft-arena.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("draft_arena=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

// Bracket draft client entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open the rotation database and restore any saved rotation
// 4. Create mpsc channels
// 5. Spawn app logic task
// 6. Run the console until the user quits
// 7. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use bracket_draft_app::api::HttpDraftApi;
use bracket_draft_app::{app, config, console};
use bracket_draft_core::db::Database;
use bracket_draft_core::{DraftRotationEngine, KeyValueStore, RotationStateStore};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Bracket draft starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: server={}, {} participants, default {} draft",
        config.server.base_url,
        config.participants.len(),
        config.draft.default_type
    );

    // 3. Open database and restore the rotation
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);
    let store: Box<dyn KeyValueStore> = Box::new(db);
    let engine = DraftRotationEngine::restore(RotationStateStore::new(store));
    if engine.is_active() {
        info!("Draft rotation restored from previous session");
    } else {
        info!("No active draft rotation found");
    }

    let api = Arc::new(HttpDraftApi::new(&config.server.base_url));
    let app_state = app::AppState::new(config, engine, api);

    // 4. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 5. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 6. Blocks until the user quits or stdin closes.
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    // 7. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Bracket draft shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file, keeping the terminal for the console.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("bracket-draft.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bracket_draft=info,warn")),
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

// Classwheel entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config (writing defaults on first run)
// 3. Create mpsc channels
// 4. Build the notifier and the application state
// 5. Spawn app logic task
// 6. Run the TUI until the user quits
// 7. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use classwheel_app::app;
use classwheel_core::config;
use classwheel_core::credentials::CredentialStore;
use classwheel_core::notifier::Notifier;
use classwheel_tui::audio::{self, AudioPlayer};
use classwheel_tui::tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Classwheel starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded from {}: {} names, {} questions",
        config.config_dir.display(),
        config.classroom.names.len(),
        config.classroom.questions.len()
    );

    let (llm_tx, llm_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (cue_tx, cue_rx) = mpsc::channel(64);

    let voice = config.settings.voice.clone();
    let notifier: Arc<dyn Notifier> = Arc::new(audio::channel_notifier(cue_tx, voice.enabled));
    let credentials = CredentialStore::new(config.credentials_path());

    let app_state = app::AppState::new(config, credentials, notifier, llm_tx.clone());
    if app_state.llm_client.is_active() {
        info!("LLM client initialized (API key configured)");
    } else {
        info!("LLM client disabled (no API key)");
    }

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(llm_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // AppState holds its own clone for spawning generation tasks.
    drop(llm_tx);

    let player = AudioPlayer::new(std::io::stdout(), voice.command);
    if let Err(e) = tui::run(ui_rx, cmd_tx, cue_rx, player).await {
        error!("TUI error: {}", e);
    }

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Classwheel shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("classwheel.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "classwheel=info,classwheel_app=info,classwheel_core=info,\
                 classwheel_llm=info,classwheel_tui=info,warn",
            )
        }))
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

mod audio;
mod command;
mod session;

use crate::audio::RodioBackend;
use crate::command::Command;
use crate::session::Session;
use cadenza_core::{
    backend_channel, http, CadenzaConfig, CoreError, ExternalCatalog, NotificationLevel, Player,
    PlayerEvent, PlayerHandle, SearchService,
};
use cadenza_deezer::DeezerCatalog;
use cadenza_library::LibraryClient;
use std::fs::File;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    let config = match CadenzaConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created config template at {}, continuing with defaults",
                path.display()
            );
            CadenzaConfig::default()
        }
        Err(e) => {
            error!("{e}");
            eprintln!(
                "Fix or remove {} and start again.",
                CadenzaConfig::config_path().display()
            );
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    if let Err(e) = runtime.block_on(run(config, cancel_token)) {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: CadenzaConfig, cancel_token: CancellationToken) -> Result<(), CoreError> {
    let library = Arc::new(LibraryClient::new(&config.server)?);
    info!("Library server: {}", library.base_url());

    let catalog = create_catalog(&config);

    let (backend_tx, backend_rx) = backend_channel();
    let backend = RodioBackend::open(http::build_client(&config.server)?, backend_tx)?;

    let (player, handle) = Player::new(
        backend,
        backend_rx,
        library.clone(),
        Some(cancel_token.clone()),
    );
    let player_task = player.with_autoplay(config.player.autoplay).start();
    tokio::spawn(log_player_events(handle.clone()));

    handle.set_volume(config.player.volume).await?;

    let search = SearchService::new(library.clone(), catalog)
        .with_limits(config.search.local_limit, config.search.external_limit);
    let session = Session::new(handle, search, library);

    println!("Cadenza ready. Type \"help\" for commands.");
    read_commands(session, cancel_token.clone()).await;

    cancel_token.cancel();
    let _ = player_task.await;
    info!("Goodbye");
    Ok(())
}

fn create_catalog(config: &CadenzaConfig) -> Option<Arc<dyn ExternalCatalog>> {
    match DeezerCatalog::new(&config.server) {
        Ok(catalog) => {
            info!("Initializing {} catalog", config.search.platform);
            Some(Arc::new(catalog.with_platform(config.search.platform.clone())))
        }
        Err(e) => {
            warn!("Catalog search disabled: {}", e);
            None
        }
    }
}

/// Read commands from stdin until quit, EOF or cancellation
async fn read_commands(mut session: Session, cancel_token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match session.execute(command).await {
            Ok(ControlFlow::Continue(())) => {}
            Ok(ControlFlow::Break(())) => break,
            Err(e) => {
                error!("{e}");
                break;
            }
        }
    }
}

/// Print notifications and log player events to the console
async fn log_player_events(handle: PlayerHandle) {
    let mut rx = handle.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                PlayerEvent::TrackLoaded { index, track } => {
                    info!(
                        "Track loaded: {} - {} [{}] (entry {})",
                        track.artist,
                        track.title,
                        track.platform,
                        index + 1
                    );
                }
                PlayerEvent::PlayStateChanged { is_playing } => {
                    debug!("Playing: {}", is_playing);
                }
                PlayerEvent::Progress { .. } => {
                    // Shown on demand by the status command
                }
                PlayerEvent::DurationKnown { duration } => {
                    debug!("Duration known: {:?}", duration);
                }
                PlayerEvent::Notification(notification) => {
                    let marker = match notification.level {
                        NotificationLevel::Info => "i",
                        NotificationLevel::Success => "+",
                        NotificationLevel::Error => "!",
                    };
                    println!("[{marker}] {}", notification.message);
                }
            },
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                info!("Player event channel closed");
                break;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} player events", n);
            }
        }
    }
}

/// Check if file logging is enabled by reading the config file.
/// This is done before full config loading to set up tracing first.
/// Returns `false` if config doesn't exist or can't be parsed.
fn check_file_logging_enabled() -> bool {
    #[derive(serde::Deserialize)]
    struct PartialConfig {
        #[serde(default)]
        logging: PartialLoggingConfig,
    }

    #[derive(serde::Deserialize, Default)]
    struct PartialLoggingConfig {
        #[serde(default)]
        enabled: bool,
    }

    let Ok(content) = std::fs::read_to_string(CadenzaConfig::config_path()) else {
        return false;
    };

    toml::from_str::<PartialConfig>(&content)
        .map(|c| c.logging.enabled)
        .unwrap_or(false)
}

/// Initialize tracing with console output and optional file logging
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,symphonia=warn"));

    // Logs go to stderr so they do not interleave with command output
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = cadenza_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

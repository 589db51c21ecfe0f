//! Reel Client - terminal front end for the fishing session controller
//!
//! Reads commands from stdin and drives a manual fishing session and the
//! autofish loop against the configured fishing service.
//! Commands: cast, catch, auto, stop, status, quit

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use reel_client::config::load_config;
use reel_client::events::{self, FishingEvent};
use reel_client::history::{history_path, log_catch, CatchLogEntry};
use reel_client::{
    get_data_dir, AutofishLoop, FishingError, FishingService, HttpFishingService,
    SessionController, SessionOutcome,
};

// Log filter configuration:
// - Sets default level to 'info'
// - Sets verbose external crates to 'warn'
const LOG_FILTER: &str = "info,reel_client=info,reqwest=warn,hyper=warn,hyper_util=warn,mio=warn,want=warn,rustls=warn";

fn init_logging(base: &Path) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_dir = base.join("debug").join("log");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file_path = log_dir.join("debug.log");
    let file_result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LOG_FILTER));

    match file_result {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE);

            let stdout_layer = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stdout_layer)
                .init();

            tracing::info!("[INIT] Logging initialized, file: {:?}", log_file_path);
        }
        Err(e) => {
            // Fallback: stdout-only logging with same filter
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new(LOG_FILTER))
                .init();
            eprintln!(
                "[INIT] Failed to create debug log file at {:?}: {}",
                log_file_path, e
            );
        }
    }
}

fn describe(outcome: &SessionOutcome) -> String {
    let fish = outcome
        .fish()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "nothing".to_string());
    match outcome {
        SessionOutcome::Success(s) => match s.reaction_time {
            Some(rt) => format!("Caught {} in {}ms", fish, rt),
            None => format!("Caught {}", fish),
        },
        SessionOutcome::Failure(f) => match &f.message {
            Some(message) => format!("Missed {}: {}", fish, message),
            None => format!("Missed {}", fish),
        },
    }
}

/// Print UI notifications and append results to the history file
fn report(history: &Path, event: FishingEvent) {
    match event {
        FishingEvent::CastSucceeded(resp) => println!("Line cast (session {})", resp.session_id),
        FishingEvent::PhaseChanged(phase) => println!("> {}", phase.description()),
        FishingEvent::CatchResolved(outcome) => {
            println!("{}", describe(&outcome));
            log_catch(history, CatchLogEntry::from_outcome(&outcome));
        }
        FishingEvent::AutofishAttempt(record) => {
            let fish = record
                .fish
                .as_ref()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "nothing".to_string());
            println!(
                "[auto] {} {}",
                if record.success { "caught" } else { "missed" },
                fish
            );
            log_catch(history, CatchLogEntry::from_attempt(&record));
        }
        FishingEvent::ChallengeCompleted(challenge) => println!(
            "Challenge completed: {}",
            challenge.name.as_deref().unwrap_or(&challenge.id)
        ),
        FishingEvent::DailyLimitReached(daily) => {
            println!("Daily limit reached ({}/{})", daily.used, daily.limit)
        }
        FishingEvent::DataRefreshed(_) => tracing::debug!("[UI] Auxiliary data refreshed"),
        FishingEvent::Error(message) => println!("Error: {}", message),
    }
}

fn print_help() {
    println!("Commands: cast | catch | auto | stop | status | quit");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base = get_data_dir();
    init_logging(&base);

    println!("Reel Client {}", env!("CARGO_PKG_VERSION"));
    println!("================================");

    let config = load_config();
    tracing::info!("[INIT] Fishing service at {}", config.api_base_url);

    let service: Arc<dyn FishingService> = Arc::new(HttpFishingService::from_config(&config)?);
    let (tx, mut rx) = events::channel();
    let session = SessionController::new(service.clone(), tx.clone(), config.session_timing());
    let autofish = AutofishLoop::new(service, tx, config.autofish_settings());

    let history = history_path();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            report(&history, event);
        }
    });

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "cast" => {
                let session = session.clone();
                tokio::spawn(async move {
                    // Remote failures already arrive as events
                    if let Err(
                        e @ (FishingError::SessionBusy { .. }
                        | FishingError::QuotaExceeded { .. }
                        | FishingError::Cancelled),
                    ) = session.start_cast().await
                    {
                        println!("Cannot cast: {}", e);
                    }
                });
            }
            "catch" => {
                let session = session.clone();
                tokio::spawn(async move {
                    if let Ok(None) = session.catch_now().await {
                        tracing::debug!("[UI] Nothing to catch right now");
                    }
                });
            }
            "auto" => match autofish.toggle() {
                Ok(true) => println!("Autofish on"),
                Ok(false) => println!("Autofish off"),
                Err(e) => println!("Cannot start autofish: {}", e),
            },
            "stop" => {
                autofish.stop();
                session.cancel_session();
            }
            "status" => {
                let state = session.snapshot();
                println!("Session: {}", state.phase.description());
                if let Some(last) = &state.last_result {
                    println!("Last: {}", describe(last));
                }
                let status = autofish.status();
                println!(
                    "Autofish: {} ({} recent attempts{})",
                    if status.active { "on" } else { "off" },
                    status.log.len(),
                    status
                        .daily
                        .map(|d| format!(", {} left today", d.remaining))
                        .unwrap_or_default()
                );
            }
            "quit" | "exit" => break,
            "" => {}
            other => {
                println!("Unknown command: {}", other);
                print_help();
            }
        }
    }

    // Cleanup
    println!("App is closing, cleaning up...");
    autofish.stop();
    session.cancel_session();
    drop(session);
    drop(autofish);
    let _ = printer.await;
    Ok(())
}

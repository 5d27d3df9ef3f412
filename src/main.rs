//! Token Sniper
//!
//! Watches the Solana transaction stream for new token launches and prints
//! every candidate that passes the filters as a JSON line on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use token_sniper::adapters::cli::{self, CliApp, Command, RunCmd, ValidateCmd};
use token_sniper::adapters::stream::WebSocketConnector;
use token_sniper::adapters::token_api::TokenApiClient;
use token_sniper::application::SniperController;
use token_sniper::config::{load_config, AppConfig};
use token_sniper::ports::{ChannelObserver, SniperEvent};

const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = cli::init();

    match &app.command {
        Command::Run(cmd) => run_command(&app, cmd).await,
        Command::Validate(cmd) => validate_command(&app, cmd),
    }
}

/// Logs go to stderr; stdout carries the candidate stream.
fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load(path: &std::path::Path) -> Result<AppConfig> {
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn validate_command(app: &CliApp, cmd: &ValidateCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(app.log_level(&config.logging.level), config.logging.json);

    let settings = config.sniper_settings();
    info!(
        ws_url = %settings.stream.ws_url,
        programs = settings.stream.subscribe_programs.len(),
        config = ?settings.sniper,
        "Configuration valid"
    );
    println!("✓ {} is valid", cmd.config.display());
    Ok(())
}

async fn run_command(app: &CliApp, cmd: &RunCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    init_logging(app.log_level(&config.logging.level), config.logging.json);

    info!("Starting token sniper...");

    let limiter = Arc::new(config.rate_limiter());
    let api = TokenApiClient::new(config.token_api_config(), limiter)
        .context("Failed to create token API client")?;
    if api.config().api_key.is_none() {
        warn!("No API key configured - upstream rate limits may be stricter");
    }

    let (observer, mut events) = ChannelObserver::new();
    let controller = SniperController::new(config.sniper_settings(), Arc::new(api), Arc::new(observer))
        .context("Failed to create sniper controller")?;
    controller
        .init(Arc::new(WebSocketConnector::new()))
        .await
        .context("Failed to install stream connector")?;

    if cmd.dry_run {
        info!("Dry run - configuration and wiring OK, not connecting");
        return Ok(());
    }

    controller.start().await.context("Failed to start sniper")?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut metrics_tick = tokio::time::interval(METRICS_LOG_INTERVAL);
    metrics_tick.tick().await;

    let outcome = loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break Ok(());
            }
            _ = metrics_tick.tick() => {
                let m = controller.get_performance_metrics();
                info!(
                    detections = m.detections,
                    duplicates = m.duplicates,
                    attempts = m.total_attempts,
                    successes = m.successes,
                    filtered = m.filtered,
                    failures = m.failures,
                    success_rate = m.success_rate,
                    avg_api_ms = m.average_api_response_time_ms,
                    "Performance"
                );
            }
            event = events.recv() => match event {
                Some(SniperEvent::NewToken { candidate }) => {
                    match serde_json::to_string(&candidate) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!(error = %e, "Failed to serialize candidate"),
                    }
                }
                Some(SniperEvent::Filtered { candidate }) => {
                    debug!(
                        mint = %candidate.mint_address,
                        reason = candidate.filter_reason().unwrap_or_default(),
                        "Filtered"
                    );
                }
                Some(SniperEvent::Connected) => info!("Stream connected"),
                Some(SniperEvent::Disconnected) => warn!("Stream disconnected"),
                Some(SniperEvent::Error { message }) => break Err(anyhow!(message)),
                None => break Ok(()),
            }
        }
    };

    controller.stop().await;

    let m = controller.get_performance_metrics();
    info!(
        detections = m.detections,
        successes = m.successes,
        success_rate = m.success_rate,
        "Token sniper stopped"
    );

    outcome.context("Stream connection failed permanently")
}

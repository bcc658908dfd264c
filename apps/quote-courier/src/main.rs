//! Quote Courier Binary
//!
//! Mails a freshly generated quote twice a day.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-courier              # run the daily schedule
//! cargo run --bin quote-courier -- once somber  # dispatch one letter now
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `INFERENCE_APP_ID`, `INFERENCE_API_KEY`, `INFERENCE_API_SECRET`: API credentials
//! - `INFERENCE_URL`: Streaming endpoint (`wss://...`)
//! - `MAIL_FROM`, `MAIL_TO`: Letter addresses
//!
//! ## Optional
//! - `INFERENCE_MODEL`: Model name (default: x1)
//! - `INFERENCE_WEB_SEARCH`: Offer the web search tool (default: true)
//! - `QUOTE_TIMEOUT_SECS`: Bound on one generation call (default: 10)
//! - `MAIL_OUTBOX_DIR`: Spool directory for `.eml` files (default: outbox)
//! - `MAIL_SMTP_HOST`: Deliver through this SMTP relay instead of the outbox
//! - `MAIL_SMTP_SECURITY`: `tls`, `starttls` or `plain` (default: tls)
//! - `MAIL_SMTP_PORT`: Relay port (default: 465, 587 or 25 by security)
//! - `MAIL_SMTP_USERNAME`, `MAIL_SMTP_PASSWORD`: Relay login
//! - `MAIL_SMTP_TIMEOUT_SECS`: Bound on each SMTP command (default: 30)
//! - `SCHEDULE_UPBEAT_AT`: Morning letter, `HH:MM` or `off` (default: 08:00)
//! - `SCHEDULE_SOMBER_AT`: Midnight letter, `HH:MM` or `off` (default: 00:00)
//! - `COURIER_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: quote-courier)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use quote_courier::infrastructure::health::{HealthServer, HealthServerState};
use quote_courier::infrastructure::telemetry;
use quote_courier::{
    CourierConfig, DailyTrigger, LetterTemplate, QuoteClient, QuoteDispatcher, QuoteStyle,
    init_metrics, run_daily, transport_for,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "quote-courier", version, about = "Mails a generated quote twice a day")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daily schedule until interrupted (default).
    Run,
    /// Dispatch a single letter now and exit.
    Once {
        /// `upbeat` or `somber`.
        style: QuoteStyle,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Already installed is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    let _metrics_handle = init_metrics()?;

    let config = CourierConfig::from_env()?;
    log_config(&config);

    let dispatcher = Arc::new(QuoteDispatcher::new(
        Arc::new(QuoteClient::websocket(config.inference.clone())),
        Arc::new(LetterTemplate::new()?),
        transport_for(&config.mail.delivery)?,
        config.mail.from.clone(),
        config.mail.to.clone(),
    ));

    if let Some(Command::Once { style }) = cli.command {
        tracing::info!(style = %style, "Dispatching one letter");
        dispatcher.dispatch(style).await?;
        return Ok(());
    }

    tracing::info!("Starting Quote Courier");

    let shutdown_token = CancellationToken::new();
    let mut tasks = Vec::new();

    if config.server.health_port == 0 {
        tracing::info!("Health server disabled");
    } else {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            dispatcher.log(),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tasks.push(tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        }));
    }

    let schedule = [
        (QuoteStyle::Upbeat, config.schedule.upbeat_at),
        (QuoteStyle::Somber, config.schedule.somber_at),
    ];
    for (style, at) in schedule {
        let Some(at) = at else {
            tracing::info!(style = %style, "Trigger disabled");
            continue;
        };
        tasks.push(spawn_trigger(
            style,
            at,
            Arc::clone(&dispatcher),
            shutdown_token.clone(),
        ));
    }

    tracing::info!("Quote courier ready");

    await_shutdown(shutdown_token).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, futures_util::future::join_all(tasks))
        .await
        .is_err()
    {
        tracing::warn!("Tasks still running at shutdown timeout");
    }

    tracing::info!("Quote courier stopped");
    Ok(())
}

fn spawn_trigger(
    style: QuoteStyle,
    at: NaiveTime,
    dispatcher: Arc<QuoteDispatcher>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_daily(
        style.as_str(),
        DailyTrigger::new(at),
        cancel,
        move || {
            let dispatcher = Arc::clone(&dispatcher);
            async move {
                // Failures are logged and recorded by the dispatcher.
                let _ = dispatcher.dispatch(style).await;
            }
        },
    ))
}

fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

fn log_config(config: &CourierConfig) {
    let fmt_time = |t: Option<NaiveTime>| {
        t.map_or_else(|| "off".to_string(), |t| t.format("%H:%M").to_string())
    };

    tracing::info!(
        model = %config.inference.model,
        timeout_secs = config.inference.timeout.as_secs(),
        web_search = config.inference.web_search,
        delivery = %config.mail.delivery,
        upbeat_at = %fmt_time(config.schedule.upbeat_at),
        somber_at = %fmt_time(config.schedule.somber_at),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        endpoint = %config.inference.endpoint_url,
        credentials = ?config.inference.credentials,
        "Inference endpoint"
    );
}

async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}

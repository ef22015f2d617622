use std::path::Path;

use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use signal_alert::api::router::create_router;
use signal_alert::config::AppConfig;
use signal_alert::execution::{run_control_loop, AlertDispatcher, ControlCommand};
use signal_alert::ingestion::FeedSupervisor;
use signal_alert::models::FeedEvent;
use signal_alert::services::{load_settings, ConsoleRenderer};
use signal_alert::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let _log_guard = init_tracing(&config.log_dir);

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let metrics_handle = signal_alert::metrics::init_metrics()?;

    let settings = load_settings(&config.settings_path);
    tracing::info!(
        sound = %settings.sound,
        volume = settings.volume,
        repeat = settings.repeat,
        show_popup = settings.show_popup,
        popup_timeout = settings.popup_timeout,
        "Settings loaded"
    );

    // --- Control task: feed events + user commands, serialized ---
    let (feed_tx, feed_rx) = mpsc::channel::<FeedEvent>(1000);
    let (cmd_tx, cmd_rx) = mpsc::channel::<ControlCommand>(64);

    let dispatcher = AlertDispatcher::new(
        config.dispatcher_config(),
        settings,
        ConsoleRenderer::new(),
    );
    let supervisor = FeedSupervisor::new(config.feed_config(), feed_tx);

    let state = AppState {
        commands: cmd_tx.clone(),
        connection: supervisor.subscribe(),
        status: dispatcher.subscribe(),
        thresholds: config.dispatcher_config(),
        metrics_handle,
        api_token: config.api_token.clone(),
    };

    tracing::info!(
        min_payout = config.min_payout,
        min_popup_win_rate = config.min_popup_win_rate,
        feed = %config.feed_url,
        "Signal alert starting"
    );

    let control = tokio::spawn(run_control_loop(
        dispatcher,
        supervisor,
        feed_rx,
        cmd_rx,
        config.settings_path.clone(),
    ));

    if config.auto_connect {
        cmd_tx.send(ControlCommand::Connect).await?;
    } else {
        tracing::info!("AUTO_CONNECT=false, waiting for POST /api/connect");
    }

    // --- Local control surface ---
    let addr = format!("{}:{}", config.host, config.port);
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Control API listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(cmd_tx))
        .await?;

    control.await?;
    Ok(())
}

async fn shutdown_signal(cmd_tx: mpsc::Sender<ControlCommand>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        return;
    }
    tracing::info!("Ctrl-C received, shutting down");
    let _ = cmd_tx.send(ControlCommand::Shutdown).await;
}

/// Stdout plus a daily-rolling log file in `log_dir`.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let file_appender = tracing_appender::rolling::daily(log_dir, "signal_alert.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("LOG_JSON")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false));

    if json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    guard
}

use anyhow::{Context, Result};
use dotenv::dotenv;
use live_monitor_rust::{
    render_startup_message, Config, DedupStateStore, MonitorSettings, MonitoringLoop,
};
use std::sync::Arc;
use tippzone_rust_core::clients::{SportMonksClient, TelegramClient};
use tippzone_rust_core::retry::{LinearJitterBackoff, RetryPolicy};
use tippzone_rust_core::NotificationChannel;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting TippZone Live Monitor...");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("{:?}", config);

    // Channel
    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_base_url,
        &config.telegram_bot_token,
        config.http_timeout,
    ));
    match telegram.verify().await {
        Ok(bot) => info!(
            "Telegram bot verified: id={} username={}",
            bot.id,
            bot.username.as_deref().unwrap_or("-")
        ),
        Err(e) if e.is_transient() => warn!("Telegram bot check failed, continuing: {}", e),
        Err(e) => return Err(anyhow::Error::new(e).context("Telegram bot verification failed")),
    }

    // Data source
    let sportmonks = Arc::new(
        SportMonksClient::new(
            &config.sportmonks_base_url,
            &config.sportmonks_api_token,
            config.http_timeout,
        )
        .with_retry_policy(RetryPolicy::new(
            config.fetch_max_attempts,
            LinearJitterBackoff::default(),
        )),
    );

    if config.startup_message_enabled {
        let text = render_startup_message(config.poll_interval, config.league_allowlist.len());
        if let Err(e) = telegram.send(&config.telegram_channel_id, &text).await {
            warn!("Startup message failed: {}", e);
        }
    }

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Unable to listen for shutdown signal: {}", e);
                // keep the sender alive so the monitor keeps running
                std::future::pending::<()>().await;
            }
        }
    });

    let mut monitor = MonitoringLoop::new(
        sportmonks,
        telegram,
        Arc::new(DedupStateStore::new()),
        MonitorSettings::from_config(&config),
    );
    monitor.run(shutdown_rx).await;

    Ok(())
}

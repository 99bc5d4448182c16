// =============================================================================
// QuantFlow Engine — Main Entry Point
// =============================================================================
//
// The engine starts with the bot disarmed regardless of the saved config.
// Users arm it explicitly from the dashboard or API.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod advisor;
mod api;
mod app_state;
mod bot;
mod indicators;
mod market_data;
mod runtime_config;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;

/// On-disk location of the hot-reloadable runtime config.
const CONFIG_PATH: &str = "quantflow_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║            QuantFlow Engine — Starting Up               ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // SAFETY: the bot never auto-arms across a restart.
    config.bot_active = false;

    // Override the instrument from env if requested.
    if let Ok(symbol) = std::env::var("QUANTFLOW_SYMBOL") {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() {
            config.symbol = symbol;
        }
    }

    info!(
        symbol = %config.symbol,
        strategy = %config.strategy,
        tick_ms = config.tick_interval_ms,
        "Simulation configured"
    );

    // ── 2. Build shared state (bootstraps the candle history) ────────────
    let state = Arc::new(AppState::new(config));
    info!(
        candles = state.candles().len(),
        last_price = state.last_price(),
        "Bootstrap history generated"
    );

    // ── 3. Simulation tick loop ──────────────────────────────────────────
    let tick_state = state.clone();
    tokio::spawn(async move {
        loop {
            // Re-read each pass so dashboard edits take effect immediately.
            let period = tick_state.runtime_config.read().tick_interval_ms.max(50);
            tokio::time::sleep(tokio::time::Duration::from_millis(period)).await;

            tick_state.tick();
        }
    });

    // ── 4. Bot evaluation loop (every second) ────────────────────────────
    let bot_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(1));
        loop {
            interval.tick().await;

            let config = bot_state.runtime_config.read().clone();
            if !config.bot_active {
                continue;
            }

            let snapshot = bot_state.indicator_snapshot();
            let price = bot_state.last_price();

            if let Some(trade) = bot::execute(&config, &snapshot, price) {
                info!(
                    symbol = %trade.symbol,
                    side = %trade.side,
                    price = trade.entry_price,
                    profit = trade.profit,
                    "simulated fill"
                );
                bot_state.push_trade(trade);
            }
        }
    });

    // ── 5. API server ────────────────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = std::env::var("QUANTFLOW_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("QuantFlow Engine shut down complete.");
    Ok(())
}

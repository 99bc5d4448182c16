// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. CORS is configured permissively so the
// dashboard dev server can talk to the engine from any origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;
use crate::types::{RiskLevel, StrategyKind};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/candles", get(candles))
        .route("/api/v1/indicators", get(indicators))
        .route("/api/v1/trades", get(trades))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config", post(set_config))
        .route("/api/v1/control/start", post(control_start))
        .route("/api/v1/control/stop", post(control_stop))
        .route("/api/v1/advisor/analyze", post(advisor_analyze))
        .route("/api/v1/advisor/generate", post(advisor_generate))
        .route("/api/v1/advisor/fix", post(advisor_fix))
        // ── WebSocket (handled in the ws module, mounted here) ──────────
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Read endpoints
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

async fn candles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.candles())
}

async fn indicators(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.indicator_snapshot())
}

async fn trades(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.trades.read().clone())
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.runtime_config.read().clone())
}

// =============================================================================
// Config update
// =============================================================================

/// Partial config update from the dashboard; absent fields stay untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub lot_size: Option<f64>,
    #[serde(default)]
    pub stop_loss_pips: Option<f64>,
    #[serde(default)]
    pub take_profit_pips: Option<f64>,
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub tick_interval_ms: Option<u64>,
}

/// Apply `update` onto `config`. Returns whether the instrument changed (the
/// caller must rebuild the candle history) and a change list for the log.
pub fn apply_update(config: &mut RuntimeConfig, update: &ConfigUpdate) -> (bool, Vec<String>) {
    let mut changes = Vec::new();
    let mut symbol_changed = false;

    if let Some(symbol) = &update.symbol {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() && symbol != config.symbol {
            changes.push(format!("symbol: {} -> {}", config.symbol, symbol));
            config.symbol = symbol;
            symbol_changed = true;
        }
    }

    macro_rules! apply_field {
        ($field:ident) => {
            if let Some(val) = update.$field {
                if config.$field != val {
                    changes.push(format!(
                        "{}: {:?} -> {:?}",
                        stringify!($field),
                        config.$field,
                        val
                    ));
                    config.$field = val;
                }
            }
        };
    }

    apply_field!(lot_size);
    apply_field!(stop_loss_pips);
    apply_field!(take_profit_pips);
    apply_field!(strategy);
    apply_field!(risk_level);
    apply_field!(tick_interval_ms);

    (symbol_changed, changes)
}

async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> impl IntoResponse {
    let (symbol_changed, changes, config_clone) = {
        let mut config = state.runtime_config.write();
        let (symbol_changed, changes) = apply_update(&mut config, &update);
        (symbol_changed, changes, config.clone())
    };

    if symbol_changed {
        info!(symbol = %config_clone.symbol, "instrument changed — rebuilding history");
        state.reset_market();
    }

    if !changes.is_empty() {
        info!(changes = ?changes, "runtime config updated");

        // Persist best-effort; the engine keeps running on failure.
        if let Err(e) = config_clone.save("quantflow_config.json") {
            warn!(error = %e, "failed to save runtime config");
            state.push_error(format!("config save failed: {e}"));
        }

        state.increment_version();
    }

    Json(serde_json::json!({
        "config": config_clone,
        "changes": changes,
    }))
}

// =============================================================================
// Bot control
// =============================================================================

#[derive(Serialize)]
struct ControlResponse {
    bot_active: bool,
    message: String,
}

async fn control_start(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    {
        let mut config = state.runtime_config.write();
        config.bot_active = true;
    }
    state.increment_version();
    info!("bot STARTED via API");

    Json(ControlResponse {
        bot_active: true,
        message: "Bot started".to_string(),
    })
}

async fn control_stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    {
        let mut config = state.runtime_config.write();
        config.bot_active = false;
    }
    state.increment_version();
    info!("bot STOPPED via API");

    Json(ControlResponse {
        bot_active: false,
        message: "Bot stopped".to_string(),
    })
}

// =============================================================================
// AI advisor
// =============================================================================

async fn advisor_analyze(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (symbol, strategy) = {
        let config = state.runtime_config.read();
        (config.symbol.clone(), config.strategy)
    };
    let snapshot = state.indicator_snapshot();
    let price = state.last_price();

    let analysis = state
        .advisor
        .analyze_market(&symbol, price, strategy, &snapshot)
        .await;

    Json(analysis)
}

#[derive(Deserialize)]
struct GenerateRequest {
    description: String,
}

async fn advisor_generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> impl IntoResponse {
    let code = state.advisor.generate_strategy_code(&req.description).await;
    Json(serde_json::json!({ "code": code }))
}

#[derive(Deserialize)]
struct FixRequest {
    code: String,
    error: String,
}

async fn advisor_fix(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FixRequest>,
) -> impl IntoResponse {
    let code = state.advisor.fix_strategy_code(&req.code, &req.error).await;
    Json(serde_json::json!({ "code": code }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_update_changes_only_present_fields() {
        let mut config = RuntimeConfig::default();
        let update = ConfigUpdate {
            lot_size: Some(0.5),
            ..Default::default()
        };

        let (symbol_changed, changes) = apply_update(&mut config, &update);
        assert!(!symbol_changed);
        assert_eq!(changes.len(), 1);
        assert_eq!(config.lot_size, 0.5);
        assert_eq!(config.symbol, "EURUSD");
    }

    #[test]
    fn apply_update_normalises_and_flags_symbol_change() {
        let mut config = RuntimeConfig::default();
        let update = ConfigUpdate {
            symbol: Some("btcusd".into()),
            ..Default::default()
        };

        let (symbol_changed, _) = apply_update(&mut config, &update);
        assert!(symbol_changed);
        assert_eq!(config.symbol, "BTCUSD");
    }

    #[test]
    fn apply_update_ignores_noop_and_empty_symbol() {
        let mut config = RuntimeConfig::default();
        let update = ConfigUpdate {
            symbol: Some("  ".into()),
            lot_size: Some(0.1), // already the default
            ..Default::default()
        };

        let (symbol_changed, changes) = apply_update(&mut config, &update);
        assert!(!symbol_changed);
        assert!(changes.is_empty());
    }

    #[test]
    fn config_update_deserialises_from_partial_json() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{ "strategy": "MA_CROSS", "risk_level": "LOW" }"#).unwrap();
        assert_eq!(update.strategy, Some(StrategyKind::MaCross));
        assert_eq!(update.risk_level, Some(RiskLevel::Low));
        assert!(update.symbol.is_none());
    }
}

//! HTTP shell for the on-chain intelligence pipeline (spec.md §6): starts
//! the C10 scheduler in the background and serves the three read-only
//! routes over axum. Grounded stylistically on the `axum::Router` /
//! `State` / `Query` / `Path` extractor pattern used by other example
//! services in the retrieval pack.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;

use onchain_service::{Config, Error, QueryService, Scheduler, SchedulerHandle};
use onchain_signal::{EmptyTagSource, SignalWeights, TierThresholds};
use onchain_sources::MultiSourceProvider;
use onchain_types::{AssetType, TimeframeType};

#[derive(Parser, Debug)]
#[command(name = "onchain-serve", about = "On-chain intelligence pipeline service")]
struct Cli {
    /// Comma-separated asset/timeframe pairs to schedule, e.g. "BTC:1h,BTC:1d".
    #[arg(long, default_value = "BTC:1h,BTC:4h,BTC:1d")]
    schedule: String,
}

struct AppState {
    pool: sqlx::PgPool,
    weights: SignalWeights,
    kill_switch: onchain_signal::KillSwitchConfig,
    scheduler_handles: Vec<SchedulerHandle>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => ApiError::NotFound(err.to_string()),
            Error::InvalidEnum(_) | Error::InvalidTimestamp(_) => {
                ApiError::BadRequest(err.to_string())
            }
            // PersistenceError (spec.md §7): the store itself is unreachable
            // or a query failed against it; a consumer should back off
            // rather than treat this as a programmer bug.
            Error::Store(onchain_store::Error::NotFound { .. }) => ApiError::NotFound(err.to_string()),
            Error::Store(_) => ApiError::ServiceUnavailable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct ContextQuery {
    asset: String,
    timeframe: String,
    timestamp: Option<String>,
}

async fn get_context(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContextQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let asset: AssetType = query
        .asset
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid asset: {}", query.asset)))?;
    let timeframe: TimeframeType = query
        .timeframe
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid timeframe: {}", query.timeframe)))?;
    let timestamp = match query.timestamp {
        Some(ts) => Some(
            DateTime::parse_from_rfc3339(&ts)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| ApiError::BadRequest(format!("invalid timestamp: {ts}")))?,
        ),
        None => None,
    };

    let service = QueryService::new(&state.pool, state.weights, state.kill_switch);
    let context = service.get_context(asset, timeframe, timestamp).await?;
    Ok(Json(context))
}

#[derive(Deserialize)]
struct AuditQuery {
    asset: String,
    timeframe: String,
}

async fn get_audit(
    State(state): State<Arc<AppState>>,
    Path(timestamp): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let asset: AssetType = query
        .asset
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid asset: {}", query.asset)))?;
    let timeframe: TimeframeType = query
        .timeframe
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid timeframe: {}", query.timeframe)))?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp: {timestamp}")))?;

    let service = QueryService::new(&state.pool, state.weights, state.kill_switch);
    let record = service.get_audit(asset, timeframe, timestamp).await?;
    Ok(Json(record))
}

/// Non-normative operational diagnostics (SPEC_FULL.md §10): per-`(asset,
/// timeframe)` scheduler tick state. Not part of the public `Context` wire
/// shape from spec.md §6.
async fn scheduler_diagnostics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut entries = Vec::with_capacity(state.scheduler_handles.len());
    for handle in &state.scheduler_handles {
        let (tick_state, tick_skipped) = handle.snapshot().await;
        entries.push(serde_json::json!({
            "asset": handle.asset.to_string(),
            "timeframe": handle.timeframe.to_string(),
            "last_run": tick_state.last_run,
            "next_run": tick_state.next_run,
            "status": tick_state.status,
            "duration_ms": tick_state.duration_ms,
            "error_message": tick_state.error_message,
            "tick_skipped": tick_skipped,
        }));
    }
    Json(entries)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn parse_schedule(spec: &str) -> Result<Vec<(AssetType, TimeframeType)>, Error> {
    spec.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|pair| {
            let (asset, timeframe) = pair
                .split_once(':')
                .ok_or_else(|| Error::Config(format!("malformed schedule entry: {pair}")))?;
            Ok((asset.trim().parse()?, timeframe.trim().parse()?))
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pairs = parse_schedule(&cli.schedule)?;
    log::info!("starting onchain-serve with schedule {pairs:?}");

    let pool = onchain_store::connect(
        &config.database_url(),
        config.db_pool_min,
        config.db_pool_max,
    )
    .await?;

    let provider = Arc::new(MultiSourceProvider::from_env());
    let tags = Arc::new(EmptyTagSource);
    let weights = SignalWeights::default();

    let scheduler = Scheduler::start(
        pairs,
        config.scheduler_interval,
        Arc::clone(&provider),
        pool.clone(),
        TierThresholds::default(),
        tags,
        config.kill_switch,
    );

    let state = Arc::new(AppState {
        pool,
        weights,
        kill_switch: config.kill_switch,
        scheduler_handles: scheduler.diagnostics_handles(),
    });

    let app = Router::new()
        .route("/api/v1/onchain/context", get(get_context))
        .route("/api/v1/onchain/audit/:timestamp", get(get_audit))
        .route("/api/v1/onchain/diagnostics/scheduler", get(scheduler_diagnostics))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    log::info!("listening on {}", config.listen_addr);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    scheduler.stop().await;
    Ok(())
}

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use server_stats_engine::{
    logging, providers::SteamServerList, storage::TableStats, Config, DailyMax, Database,
    HourlyAverage, ServedSnapshot, ServiceOptions, StatsError, StatsService,
};

#[derive(Clone)]
struct AppState {
    service: Arc<StatsService>,
}

#[derive(Debug, Deserialize)]
struct HourlyParams {
    #[serde(default = "default_hours")]
    hours: u32,
}

#[derive(Debug, Deserialize)]
struct DailyParams {
    #[serde(default = "default_days")]
    days: u32,
}

fn default_hours() -> u32 { 24 }
fn default_days() -> u32 { 7 }

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct HourlyResponse {
    hours: Vec<HourlyAverage>,
}

/// Chart payload: `{"players": [{"date": "...", "players": N}]}`
#[derive(Debug, Serialize)]
struct DailyResponse {
    players: Vec<DailyMax>,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: TableStats,
    history: TableStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(false);

    let config_path = std::env::var("SERVER_STATS_CONFIG").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8090);

    tracing::info!("🚀 Starting server stats API");
    tracing::info!("📦 Database: {}", config.db_path);
    tracing::info!("🎮 Watching: {}", config.server);

    let db = Database::open(&config.db_path)?;
    let fetcher = Arc::new(SteamServerList::new(&config)?);
    let service = StatsService::with_database(db, fetcher, ServiceOptions::from(&config));

    let state = AppState {
        service: Arc::new(service),
    };

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/current", get(current_handler))
        .route("/v1/history/hourly", get(hourly_handler))
        .route("/v1/history/daily", get(daily_handler))
        .route("/v1/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("🔌 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: server_stats_engine::VERSION.to_string(),
    })
}

async fn current_handler(State(state): State<AppState>) -> Json<ServedSnapshot> {
    let served = state.service.get_server_info().await;
    tracing::debug!("current → {} players via {}", served.snapshot.players, served.source);
    Json(served)
}

async fn hourly_handler(
    State(state): State<AppState>,
    Query(params): Query<HourlyParams>,
) -> Json<HourlyResponse> {
    Json(HourlyResponse {
        hours: state.service.hourly_history(params.hours).await,
    })
}

async fn daily_handler(
    State(state): State<AppState>,
    Query(params): Query<DailyParams>,
) -> Json<DailyResponse> {
    Json(DailyResponse {
        players: state.service.daily_max(params.days).await,
    })
}

async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let (cache, history) = state.service.table_stats().await?;
    Ok(Json(StatsResponse { cache, history }))
}

// Error handling
struct AppError(StatsError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_storage() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = self.0.to_string();

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<StatsError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::app::AppState;
use crate::util::time::{started_at, uptime_secs};
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{GameStateSnapshot, VisiblePhase};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/state", get(state_handler))
        .route("/join-link", get(join_link_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the display and phone front ends. `*` allows any origin,
/// otherwise a comma-separated allow list.
fn cors_layer(client_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return base.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| match s.trim().parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = s, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    started_at: Option<DateTime<Utc>>,
    phase: VisiblePhase,
    players: usize,
    connections: usize,
    observers: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.race.latest_snapshot();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        started_at: started_at(),
        phase: snapshot.status,
        players: snapshot.players.len(),
        connections: state.connection_count(),
        observers: state.race.observer_count(),
    })
}

// ============================================================================
// Race endpoints
// ============================================================================

/// Latest published state, for displays that poll instead of subscribing
async fn state_handler(State(state): State<AppState>) -> Json<GameStateSnapshot> {
    Json(state.race.latest_snapshot())
}

#[derive(Serialize)]
struct JoinLinkResponse {
    url: String,
}

/// The URL phones open to join; rendering it as a QR code is up to the display
async fn join_link_handler(State(state): State<AppState>) -> Json<JoinLinkResponse> {
    Json(JoinLinkResponse {
        url: join_url(&state.config.public_base_url),
    })
}

fn join_url(public_base_url: &str) -> String {
    format!("{}/play", public_base_url.trim_end_matches('/'))
}

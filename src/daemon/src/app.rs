use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{extract::State, http::StatusCode, Json, Router};
use tokio_util::sync::CancellationToken;

use sfbridge_client::ForwarderCounters;

use crate::structs::{BridgeInfo, InfoResponse};

#[derive(Clone)]
struct AppState {
    info: Arc<BridgeInfo>,
    counters: Arc<ForwarderCounters>,
    cancellation_token: CancellationToken,
}

pub fn get_app(
    info: Arc<BridgeInfo>,
    counters: Arc<ForwarderCounters>,
    cancellation_token: CancellationToken,
) -> Router {
    let state = AppState {
        info,
        counters,
        cancellation_token,
    };

    Router::new()
        .route("/info", get(info_handler))
        .route("/health", get(health))
        .route("/terminate", post(terminate))
        .with_state(state)
}

async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse::new(&state.info, &state.counters))
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn terminate(State(state): State<AppState>) -> impl IntoResponse {
    state.cancellation_token.cancel();
    "Terminating..."
}

//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{ErrorResponse, HistoryQuery, StateResponse};
use crate::sim::StepRecord;

/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        scenario: state.scenario.clone(),
        config: state.config.clone(),
        summary: state.summary.clone(),
        latest_step: state.history.last().cloned(),
    })
}

/// Returns step records, optionally filtered by step range.
///
/// `GET /history` → 200 + `Vec<StepRecord>` JSON
/// `GET /history?from=N&to=M` → filtered range (inclusive)
/// `GET /history?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<StepRecord> = state
        .history
        .iter()
        .filter(|r| r.step >= from && r.step <= to)
        .cloned()
        .collect();

    Ok(Json(records))
}

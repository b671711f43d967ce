//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::config::ScenarioInfo;
use crate::sim::{RunSummary, SimConfig, StepRecord};

/// Combined state response.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub scenario: ScenarioInfo,
    pub config: SimConfig,
    pub summary: RunSummary,
    /// Last step of the run; `null` for an empty history.
    pub latest_step: Option<StepRecord>,
}

/// Optional range query parameters for the history endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// First step (inclusive).
    pub from: Option<usize>,
    /// Last step (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

//! REST API handlers.
//!
//! Successful calls return the bare payload the simulator expects; failures
//! use the `{success: false, error}` envelope with a matching status code.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, warn};

use tap_core::{GridSnapshot, HeartbeatInfo};

use crate::ApiState;

/// Error envelope.
#[derive(serde::Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: msg.to_string(),
        }),
    )
}

// ── Control ────────────────────────────────────────────────────

/// POST /calculateControl/
pub async fn calculate_control(
    State(state): State<ApiState>,
    payload: Result<Json<GridSnapshot>, JsonRejection>,
) -> impl IntoResponse {
    let snapshot = match payload {
        Ok(Json(snapshot)) => snapshot,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected control request");
            return error_response(&rejection.body_text(), rejection.status()).into_response();
        }
    };

    if let Err(e) = snapshot.validate() {
        warn!(error = %e, task = %snapshot.task_id, "invalid grid snapshot");
        return error_response(&e.to_string(), StatusCode::UNPROCESSABLE_ENTITY).into_response();
    }

    if let Some(matriculation) = snapshot.matriculation_number.as_deref().filter(|m| !m.is_empty()) {
        debug!(%matriculation, task = %snapshot.task_id, "control request");
    }

    let decision = state.controller.decide(&snapshot);
    Json(decision).into_response()
}

// ── Heartbeat ──────────────────────────────────────────────────

/// GET /heartbeat/
pub async fn heartbeat() -> Json<HeartbeatInfo> {
    debug!("heartbeat");
    Json(HeartbeatInfo { is_alive: true })
}

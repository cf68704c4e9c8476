//! Session save/restore endpoints.
//!
//! A client that goes away (page reload, app suspend) fetches the saved session
//! before leaving and posts it back when it returns.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use beacon_core::{DeviceRecord, SavedSession};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::discovery::DiscoveryStatusResponse;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Saved session with the time it was captured.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "active": true,
    "devices": [
        {
            "hardware_address": "AA:BB:CC:DD:EE:01",
            "advertised_name": "Foo",
            "display_name": "Foo"
        }
    ],
    "saved_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct SavedSessionResponse {
    /// Whether discovery was running.
    #[schema(example = true)]
    pub active: bool,

    /// Devices known at save time.
    pub devices: Vec<DeviceRecord>,

    /// When the session was saved.
    #[schema(example = "2025-01-15T03:30:00Z")]
    pub saved_at_utc: String,
}

impl From<SavedSession> for SavedSessionResponse {
    fn from(saved: SavedSession) -> Self {
        Self {
            active: saved.active,
            devices: saved.devices,
            saved_at_utc: Utc::now().to_rfc3339(),
        }
    }
}

/// Save the session.
#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    operation_id = "saveSession",
    summary = "Save the discovery session",
    description = "Returns what a client needs to rebuild the session later: \
        whether discovery is running and the devices seen so far. Discovery \
        keeps running.",
    responses(
        (status = 200, description = "Saved session", body = SavedSessionResponse)
    )
)]
pub async fn save_session(State(state): State<SharedState>) -> Json<SavedSessionResponse> {
    Json(state.session.save_state().into())
}

/// Restore a saved session.
#[utoipa::path(
    post,
    path = "/session/restore",
    tag = "session",
    operation_id = "restoreSession",
    summary = "Restore a saved session",
    description = "Merges the saved devices into the current list, then resumes \
        discovery if it was running when saved. Saved records replace current \
        records with the same hardware address.",
    request_body = SavedSession,
    responses(
        (status = 200, description = "Session restored", body = DiscoveryStatusResponse),
        (status = 400, description = "Body is not a valid saved session", body = ErrorResponse),
        (status = 503, description = "Saved session was active but discovery could not resume", body = ErrorResponse)
    )
)]
pub async fn restore_session(
    State(state): State<SharedState>,
    payload: Result<Json<SavedSession>, JsonRejection>,
) -> ApiResult<Json<DiscoveryStatusResponse>> {
    let Json(saved) = payload?;
    info!(
        active = saved.active,
        devices = saved.devices.len(),
        "restoring saved session"
    );

    let active = saved.active;
    let mut events = state.session.subscribe();
    let outcome = state.session.restore_saved(saved);
    if active {
        super::discovery::check_outcome(outcome, &mut events)?;
    }

    Ok(Json(DiscoveryStatusResponse::of(&state)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_session_response_keeps_fields() {
        let response = SavedSessionResponse::from(SavedSession {
            active: true,
            devices: vec![],
        });
        assert!(response.active);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["saved_at_utc"].is_string());
    }
}

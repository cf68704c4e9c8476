//! Discovery API endpoints.
//!
//! Exposes the device snapshot, drives the discovery session, and streams its
//! events to clients over Server-Sent Events.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use beacon_core::{BeaconError, DeviceRecord, DiscoveryEvent, SessionState};
use chrono::Utc;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::{AppState, SharedState};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Current device list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "devices": [
        {
            "hardware_address": "AA:BB:CC:DD:EE:01",
            "advertised_name": "Foo",
            "display_name": "Foo"
        }
    ],
    "count": 1,
    "state": "scanning",
    "generated_at_utc": "2025-01-15T03:30:00Z"
}))]
pub struct DevicesResponse {
    /// Devices in first-seen order.
    pub devices: Vec<DeviceRecord>,

    /// Number of devices.
    #[schema(example = 1)]
    pub count: usize,

    /// Discovery state when the snapshot was taken.
    pub state: SessionState,

    /// When the snapshot was taken.
    #[schema(example = "2025-01-15T03:30:00Z")]
    pub generated_at_utc: String,
}

/// Discovery status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "state": "scanning",
    "active": true,
    "device_count": 3,
    "scan_id": "01928f6e-3c1a-7000-8000-000000000000"
}))]
pub struct DiscoveryStatusResponse {
    /// Current state.
    pub state: SessionState,

    /// Whether discovery is running.
    #[schema(example = true)]
    pub active: bool,

    /// Number of devices discovered so far.
    #[schema(example = 3)]
    pub device_count: usize,

    /// Identifier of the open subscription.
    #[schema(nullable)]
    pub scan_id: Option<Uuid>,
}

impl DiscoveryStatusResponse {
    pub(crate) fn of(state: &AppState) -> Self {
        let session = &state.session;
        Self {
            state: session.state(),
            active: session.is_active(),
            device_count: session.snapshot().len(),
            scan_id: session.scan_id(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List discovered devices.
#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    operation_id = "listDevices",
    summary = "List discovered devices",
    description = "Returns every device discovered since the last fresh start, \
        deduplicated by hardware address and in first-seen order.",
    responses(
        (status = 200, description = "Current device list", body = DevicesResponse)
    )
)]
pub async fn list_devices(State(state): State<SharedState>) -> Json<DevicesResponse> {
    let devices = state.session.snapshot();

    Json(DevicesResponse {
        count: devices.len(),
        devices,
        state: state.session.state(),
        generated_at_utc: Utc::now().to_rfc3339(),
    })
}

/// Get discovery status.
#[utoipa::path(
    get,
    path = "/discovery",
    tag = "discovery",
    operation_id = "getDiscoveryStatus",
    summary = "Get discovery status",
    responses(
        (status = 200, description = "Discovery status", body = DiscoveryStatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<DiscoveryStatusResponse> {
    Json(DiscoveryStatusResponse::of(&state))
}

/// Start a fresh discovery.
#[utoipa::path(
    post,
    path = "/discovery/start",
    tag = "discovery",
    operation_id = "startDiscovery",
    summary = "Start a fresh discovery",
    description = "Clears the device list and starts scanning. If discovery is \
        already running it is restarted.",
    responses(
        (status = 200, description = "Discovery started", body = DiscoveryStatusResponse),
        (status = 503, description = "Radio disabled or scanner failed to start", body = ErrorResponse)
    )
)]
pub async fn start_discovery(
    State(state): State<SharedState>,
) -> ApiResult<Json<DiscoveryStatusResponse>> {
    let mut events = state.session.subscribe();
    let outcome = state.session.start_discovery();
    check_outcome(outcome, &mut events)?;
    Ok(Json(DiscoveryStatusResponse::of(&state)))
}

/// Resume discovery keeping known devices.
#[utoipa::path(
    post,
    path = "/discovery/resume",
    tag = "discovery",
    operation_id = "resumeDiscovery",
    summary = "Resume discovery",
    description = "Starts scanning without clearing the device list.",
    responses(
        (status = 200, description = "Discovery resumed", body = DiscoveryStatusResponse),
        (status = 503, description = "Radio disabled or scanner failed to start", body = ErrorResponse)
    )
)]
pub async fn resume_discovery(
    State(state): State<SharedState>,
) -> ApiResult<Json<DiscoveryStatusResponse>> {
    let mut events = state.session.subscribe();
    let outcome = state.session.resume_discovery();
    check_outcome(outcome, &mut events)?;
    Ok(Json(DiscoveryStatusResponse::of(&state)))
}

/// Stop discovery.
#[utoipa::path(
    post,
    path = "/discovery/stop",
    tag = "discovery",
    operation_id = "stopDiscovery",
    summary = "Stop discovery",
    description = "Stops scanning. Safe to call when discovery is not running. \
        The device list is kept.",
    responses(
        (status = 200, description = "Discovery stopped", body = DiscoveryStatusResponse)
    )
)]
pub async fn stop_discovery(State(state): State<SharedState>) -> Json<DiscoveryStatusResponse> {
    state.session.stop_discovery();
    Json(DiscoveryStatusResponse::of(&state))
}

/// Stream discovery events.
#[utoipa::path(
    get,
    path = "/discovery/events",
    tag = "discovery",
    operation_id = "streamDiscoveryEvents",
    summary = "Stream discovery events",
    description = "Server-Sent Events stream. Each event is named after its \
        `type` (`started`, `stopped`, `radio_unavailable`, `updated`) and \
        carries the JSON-encoded event as data. Slow clients skip events \
        they fell behind on.",
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream", body = DiscoveryEvent)
    )
)]
pub async fn stream_events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("event stream opened");
    Sse::new(event_stream(state.session.subscribe())).keep_alive(KeepAlive::default())
}

// ============================================================================
// Helpers
// ============================================================================

/// Turn an `Idle` outcome into the error that caused it.
///
/// The cause is read from events published during the attempt; `events` must
/// have been subscribed before the attempt.
pub(crate) fn check_outcome(
    outcome: SessionState,
    events: &mut broadcast::Receiver<DiscoveryEvent>,
) -> Result<(), BeaconError> {
    if outcome == SessionState::Scanning {
        return Ok(());
    }

    let mut cause = None;
    while let Ok(event) = events.try_recv() {
        match event {
            DiscoveryEvent::RadioUnavailable => cause = Some(BeaconError::RadioUnavailable),
            DiscoveryEvent::Stopped {
                cause: Some(failure),
            } => cause = Some(BeaconError::ScanFailed(failure)),
            DiscoveryEvent::Started { .. } => cause = None,
            DiscoveryEvent::Stopped { cause: None } | DiscoveryEvent::Updated { .. } => {}
        }
    }

    cause.map_or(Ok(()), Err)
}

/// SSE name for an event.
const fn event_name(event: &DiscoveryEvent) -> &'static str {
    match event {
        DiscoveryEvent::Started { .. } => "started",
        DiscoveryEvent::Stopped { .. } => "stopped",
        DiscoveryEvent::RadioUnavailable => "radio_unavailable",
        DiscoveryEvent::Updated { .. } => "updated",
    }
}

fn to_sse(event: &DiscoveryEvent) -> Event {
    Event::default()
        .event(event_name(event))
        .json_data(event)
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to encode discovery event");
            Event::default().event("error").data(e.to_string())
        })
}

/// Adapt a broadcast receiver into an SSE stream, skipping lagged events.
fn event_stream(
    receiver: broadcast::Receiver<DiscoveryEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((Ok(to_sse(&event)), receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged, events dropped");
                }
                Err(RecvError::Closed) => {
                    debug!("event stream closed");
                    return None;
                }
            }
        }
    })
}

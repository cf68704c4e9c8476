//! OpenAPI specification generation for the beacon API.
//!
//! The document is served at `/api/openapi.json` and written to the workspace
//! root by the `gen-openapi` binary for client generation.

use axum::Json;
use beacon_core::{
    CallbackKind, DeviceRecord, DiscoveryEvent, HealthResponse, SavedSession, ScanFailure,
    SessionState,
};
use utoipa::OpenApi;

use super::discovery::{DevicesResponse, DiscoveryStatusResponse};
use super::error::ErrorResponse;
use super::session::SavedSessionResponse;

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for beacon.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "beacon API",
        version = "0.1.0",
        description = r#"
# beacon API

beacon discovers nearby Bluetooth Low Energy devices and keeps a deduplicated
list of everything it has seen.

## Overview

1. **Discovery**: start, resume, or stop scanning. A fresh start clears the
   device list; resume keeps it.
2. **Devices**: one entry per hardware address, in the order devices were
   first seen. Devices without a name are shown as `Unknown Device`.
3. **Events**: `/api/discovery/events` streams every state change and every
   updated device list as Server-Sent Events.
4. **Session**: save the session before a client goes away and restore it
   when the client returns.

Starting discovery while the radio is off fails with `radio_unavailable`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local beacon server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "devices", description = "Discovered devices"),
        (name = "discovery", description = "Discovery control and event stream"),
        (name = "session", description = "Saving and restoring the discovery session")
    ),
    nest(
        (path = "/api", api = ApiRoutes)
    ),
    paths(
        super::health::health_check,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            SessionState,
            CallbackKind,
            ScanFailure,
            DeviceRecord,
            DiscoveryEvent,
            SavedSession,
            DevicesResponse,
            DiscoveryStatusResponse,
            SavedSessionResponse,
        )
    )
)]
pub struct ApiDoc;

/// Routes mounted under `/api`.
#[derive(OpenApi)]
#[openapi(paths(
    super::discovery::list_devices,
    super::discovery::get_status,
    super::discovery::start_discovery,
    super::discovery::resume_discovery,
    super::discovery::stop_discovery,
    super::discovery::stream_events,
    super::session::save_session,
    super::session::restore_session,
))]
struct ApiRoutes;

//! Shared types and OpenAPI schemas.
//!
//! Most API types are defined next to the code that produces them (device,
//! session, scan). This module holds the ones that belong to no component.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::SessionState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "backend": "bluez",
    "discovery": "scanning"
}))]
pub struct HealthResponse {
    /// Service status.
    #[schema(example = "ok")]
    pub status: String,

    /// Service version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Scan backend in use (`bluez` or `mock`).
    #[schema(example = "bluez")]
    pub backend: String,

    /// Current discovery state.
    pub discovery: SessionState,
}

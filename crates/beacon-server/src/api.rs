//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `health` - Service health checks
//! - `discovery` - Device list, discovery control, and the event stream
//! - `session` - Saving and restoring the discovery session
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod discovery;
pub mod error;
pub mod health;
pub mod openapi;
pub mod session;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                  - Health check
/// /api
/// ├── /devices             - Discovered devices
/// ├── /discovery           - Discovery status
/// │   ├── /start           - Fresh start
/// │   ├── /resume          - Start keeping known devices
/// │   ├── /stop            - Stop
/// │   └── /events          - Server-Sent Events stream
/// ├── /session             - Save the session
/// │   └── /restore         - Restore a saved session
/// └── /openapi.json        - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest(
            "/api",
            Router::new()
                .route("/devices", get(discovery::list_devices))
                .route("/discovery", get(discovery::get_status))
                .route("/discovery/start", post(discovery::start_discovery))
                .route("/discovery/resume", post(discovery::resume_discovery))
                .route("/discovery/stop", post(discovery::stop_discovery))
                .route("/discovery/events", get(discovery::stream_events))
                .route("/session", get(session::save_session))
                .route("/session/restore", post(session::restore_session))
                .route("/openapi.json", get(openapi::get_openapi_spec)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(all(test, any(feature = "mock-bluetooth", not(feature = "bluetooth"))))]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use beacon_core::bluetooth::{MockRadio, MockScanSource};
    use beacon_core::{
        CallbackKind, Config, DiscoverySession, RawScanResult, ScanEvent, ScanFailure,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::AppState;

    struct TestApp {
        router: Router,
        source: Arc<MockScanSource>,
        radio: Arc<MockRadio>,
        state: SharedState,
    }

    fn test_app() -> TestApp {
        let source = Arc::new(MockScanSource::new());
        let radio = Arc::new(MockRadio::new(true));
        let session = DiscoverySession::new(source.clone(), radio.clone());
        let state = AppState::new(Config::default(), session, "mock").shared();
        TestApp {
            router: create_router(Arc::clone(&state)),
            source,
            radio,
            state,
        }
    }

    async fn send(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Rejections produced by axum itself are plain text.
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    fn found(address: &str, name: &str) -> ScanEvent {
        ScanEvent::Result {
            kind: CallbackKind::AllMatches,
            result: RawScanResult::new(address).with_device_name(name),
        }
    }

    #[tokio::test]
    async fn test_health_reports_backend_and_state() {
        let app = test_app();
        let (status, body) = send(&app.router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "mock");
        assert_eq!(body["discovery"], "idle");
    }

    #[tokio::test]
    async fn test_start_then_list_devices() {
        let app = test_app();

        let (status, body) = send(&app.router, "POST", "/api/discovery/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "scanning");
        assert_eq!(body["active"], true);
        assert!(body["scan_id"].is_string());

        app.source.emit(found("AA:BB", "Foo"));
        app.source.emit(found("AA:BB", "Foo again"));
        app.source.emit(ScanEvent::Batch(vec![RawScanResult::new("CC:DD")]));

        let (status, body) = send(&app.router, "GET", "/api/devices", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["devices"][0]["display_name"], "Foo");
        assert_eq!(body["devices"][1]["display_name"], "Unknown Device");
    }

    #[tokio::test]
    async fn test_start_with_radio_off_is_unavailable() {
        let app = test_app();
        app.radio.set_enabled(false);

        let (status, body) = send(&app.router, "POST", "/api/discovery/start", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "radio_unavailable");
        assert!(!app.state.session.is_active());
    }

    #[tokio::test]
    async fn test_start_failure_is_reported() {
        let app = test_app();
        app.source.fail_on_start(Some(ScanFailure::AlreadyStarted));

        let (status, body) = send(&app.router, "POST", "/api/discovery/start", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "scan_failed");
        assert_eq!(body["details"], "code 1");
    }

    #[tokio::test]
    async fn test_stop_keeps_devices() {
        let app = test_app();
        send(&app.router, "POST", "/api/discovery/start", None).await;
        app.source.emit(found("AA:BB", "Foo"));

        let (status, body) = send(&app.router, "POST", "/api/discovery/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "idle");
        assert_eq!(body["device_count"], 1);
        assert!(body["scan_id"].is_null());
        assert!(!app.source.is_subscribed());
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_ok() {
        let app = test_app();
        let (status, body) = send(&app.router, "POST", "/api/discovery/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "idle");
    }

    #[tokio::test]
    async fn test_resume_keeps_devices_start_clears() {
        let app = test_app();
        send(&app.router, "POST", "/api/discovery/start", None).await;
        app.source.emit(found("AA:BB", "Foo"));
        send(&app.router, "POST", "/api/discovery/stop", None).await;

        let (_, body) = send(&app.router, "POST", "/api/discovery/resume", None).await;
        assert_eq!(body["device_count"], 1);

        let (_, body) = send(&app.router, "POST", "/api/discovery/start", None).await;
        assert_eq!(body["device_count"], 0);
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let app = test_app();
        send(&app.router, "POST", "/api/discovery/start", None).await;
        app.source.emit(found("AA:BB", "Foo"));

        let (status, saved) = send(&app.router, "GET", "/api/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["active"], true);
        assert!(saved["saved_at_utc"].is_string());

        let other = test_app();
        let payload = json!({ "active": saved["active"], "devices": saved["devices"] });
        let (status, body) =
            send(&other.router, "POST", "/api/session/restore", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "scanning");
        assert_eq!(body["device_count"], 1);
        assert_eq!(other.state.session.snapshot()[0].display_name(), "Foo");
    }

    #[tokio::test]
    async fn test_restore_inactive_session_stays_idle() {
        let app = test_app();
        let payload = json!({
            "active": false,
            "devices": [{ "hardware_address": "AA:BB", "advertised_name": null }]
        });

        let (status, body) =
            send(&app.router, "POST", "/api/session/restore", Some(payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "idle");
        assert_eq!(body["device_count"], 1);
        assert_eq!(app.source.start_count(), 0);
    }

    #[tokio::test]
    async fn test_restore_rejects_blank_address() {
        let app = test_app();
        let payload = json!({
            "active": false,
            "devices": [{ "hardware_address": "  ", "advertised_name": "Foo" }]
        });

        let (status, body) =
            send(&app.router, "POST", "/api/session/restore", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_body");
        assert!(app.state.session.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_restore_without_json_content_type_is_rejected() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/session/restore")
            .body(Body::from(r#"{"active":false,"devices":[]}"#))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.source.start_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route_body_is_not_json() {
        let app = test_app();
        let (status, body) = send(&app.router, "GET", "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_null() || body.is_string());
    }

    #[tokio::test]
    async fn test_openapi_route() {
        let app = test_app();
        let (status, body) = send(&app.router, "GET", "/api/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["info"]["title"], "beacon API");
        assert!(body["paths"]["/api/discovery/start"].is_object());
    }
}

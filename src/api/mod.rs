//! HTTP layer: route handlers, DTOs, OpenAPI document, and router
//! composition.
//!
//! Relay endpoints are mounted under the configured route prefix
//! (`/api/websocket-relay` by default). `/health` and the Swagger UI
//! live at the root. Any other path, or a wrong method on a relay path,
//! gets a JSON 404 listing the relay routes.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the relay routes, nested under `prefix` unless it is empty.
pub fn build_router(prefix: &str) -> Router<AppState> {
    let relay = handlers::routes().method_not_allowed_fallback(handlers::system::not_found);
    let router = if prefix.is_empty() {
        relay
    } else {
        Router::new().nest(prefix, relay)
    };
    router.merge(handlers::system::health_routes())
}

/// Builds the complete application: routes, fallback, body limit,
/// tracing, and permissive CORS on every response.
pub fn build_app(state: AppState) -> Router {
    let router = build_router(&state.config.route_prefix);

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
        .fallback(handlers::system::not_found)
        .method_not_allowed_fallback(handlers::system::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    use super::*;
    use crate::config::RelayConfig;
    use crate::error::ErrorResponse;
    use crate::store::MemoryStore;

    fn make_app(config: RelayConfig) -> Router {
        let state = AppState::new(
            config,
            Arc::new(MemoryStore::default()),
            CancellationToken::new(),
        );
        build_app(state)
    }

    async fn send(app: Router, method: Method, uri: &str, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
        let Ok(request) = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
        else {
            panic!("bad request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn unknown_path_lists_routes() {
        let app = make_app(RelayConfig::default());
        let (status, body) = send(app, Method::GET, "/api/websocket-relay/nope", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let Ok(error) = serde_json::from_slice::<ErrorResponse>(&body) else {
            panic!("not an error body");
        };
        assert_eq!(error.code, 2001);
        assert!(error.error.contains("/wokwi"));
        assert!(error.error.contains("/telemetry"));
    }

    #[tokio::test]
    async fn wrong_method_is_not_found() {
        let app = make_app(RelayConfig::default());
        let (status, _) = send(app, Method::PUT, "/api/websocket-relay/status", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn body_over_limit_is_payload_too_large() {
        let config = RelayConfig {
            max_body_bytes: 32,
            ..RelayConfig::default()
        };
        let app = make_app(config);
        let body = format!(r#"{{"pad":"{}"}}"#, "x".repeat(64));
        let (status, body) = send(app, Method::POST, "/api/websocket-relay/wokwi", body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let Ok(error) = serde_json::from_slice::<ErrorResponse>(&body) else {
            panic!("not an error body");
        };
        assert_eq!(error.code, 1003);
    }

    #[tokio::test]
    async fn custom_prefix_is_honored() {
        let config = RelayConfig {
            route_prefix: "/relay".to_string(),
            ..RelayConfig::default()
        };
        let app = make_app(config);
        let (status, _) = send(app.clone(), Method::GET, "/relay/status", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(app, Method::GET, "/api/websocket-relay/status", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_poll_returns_null_command() {
        let app = make_app(RelayConfig::default());
        let (status, body) = send(app, Method::GET, "/api/websocket-relay/command", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) else {
            panic!("not JSON");
        };
        assert_eq!(value["command"], serde_json::Value::Null);
        assert!(value["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn telemetry_is_empty_object_before_first_push() {
        let app = make_app(RelayConfig::default());
        let (status, body) = send(app, Method::GET, "/api/websocket-relay/telemetry", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"{}");
    }

    #[tokio::test]
    async fn telemetry_returns_last_pushed_snapshot() {
        let app = make_app(RelayConfig::default());
        for bat in [90, 88] {
            let body = format!(r#"{{"bat":{bat},"mot":1}}"#);
            let (status, _) = send(app.clone(), Method::POST, "/api/websocket-relay/wokwi", body).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(app, Method::GET, "/api/websocket-relay/telemetry", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) else {
            panic!("not JSON");
        };
        assert_eq!(value["bat"], 88);
        assert_eq!(value["mot"], 1);
        assert!(value["timestamp"].is_i64());
    }
}

//! HTTP transport: each `POST` carries one JSON-RPC message.
//!
//! Requests get their JSON-RPC response as the body; notifications get
//! `202 Accepted` with no body.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::McpHandler;
use crate::signals::ShutdownSignal;

/// Builds the router serving MCP at `path`.
pub fn router(handler: Arc<McpHandler>, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_post))
        .with_state(handler)
}

async fn handle_post(State(handler): State<Arc<McpHandler>>, body: String) -> Response {
    match handler.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Binds `config.host:config.port` and serves until shutdown.
pub async fn serve_http(
    handler: Arc<McpHandler>,
    config: &ServerConfig,
    shutdown: ShutdownSignal,
) -> ServerResult<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::bind(addr.clone(), e))?;

    info!(addr = %addr, path = %config.path, "MCP server listening on http");

    axum::serve(listener, router(handler, &config.path))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    info!("HTTP transport stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transport;
    use crate::service::CalendarTools;
    use crate::signals::SignalHandler;
    use crate::testing::{FakeCalendar, FakeSource};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn app() -> Router {
        let calendar = FakeCalendar::new()
            .with_calendar("work", "Work")
            .with_event("work", "Review", "2026-01-26T20:30:00Z");
        let handler = Arc::new(McpHandler::new(CalendarTools::new(FakeSource::new(calendar))));
        router(handler, "/mcp")
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn tool_call_over_http() {
        let response = app()
            .oneshot(post_json(
                "/mcp",
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"check_availability","arguments":{"start_iso":"2026-01-26T20:00:00","end_iso":"2026-01-26T21:00:00"}}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(
            body["result"]["content"][0]["text"],
            "Conflicts found: Review (on Work) at 2026-01-26T20:30:00Z"
        );
    }

    #[tokio::test]
    async fn notification_is_accepted() {
        let response = app()
            .oneshot(post_json(
                "/mcp",
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let response = app().oneshot(post_json("/mcp", "not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let response = app()
            .oneshot(post_json("/rpc", r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_is_not_allowed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let handler = Arc::new(McpHandler::new(CalendarTools::new(FakeSource::new(
            FakeCalendar::new(),
        ))));
        let config = ServerConfig::new(Transport::Http).with_port(port);
        let signals = SignalHandler::new();

        let err = serve_http(handler, &config, signals.shutdown())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert!(err.to_string().contains(&port.to_string()));
    }
}

//! MCP request dispatch.
//!
//! Turns one incoming JSON-RPC message into at most one response.
//! Notifications and stray responses produce nothing.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{Span, debug, warn};

use calagent_protocol::{
    CallToolResult, Incoming, InitializeResult, JsonRpcResponse, ResourceContents,
    ResourceDefinition, RpcError, ServerInfo, ToolDefinition,
};

use crate::service::CalendarTools;

/// URI of the static summary resource.
pub const SUMMARY_RESOURCE_URI: &str = "calendar://summary";

const SUMMARY_RESOURCE_NAME: &str = "calendar_summary";
const TEXT_MIME: &str = "text/plain";

const CHECK_AVAILABILITY: &str = "check_availability";
const GET_FREE_TIME: &str = "get_free_time";

/// Routes MCP methods to the calendar tools.
pub struct McpHandler {
    tools: CalendarTools,
    server_info: ServerInfo,
}

impl McpHandler {
    pub fn new(tools: CalendarTools) -> Self {
        Self {
            tools,
            server_info: ServerInfo {
                name: "calagent".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Handles one raw message. Returns `None` when no reply is due.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match Incoming::parse(raw) {
            Ok(incoming) => self.handle(incoming).await,
            Err(response) => {
                warn!(error = ?response.error, "rejected malformed message");
                Some(*response)
            }
        }
    }

    /// Handles one parsed message.
    #[tracing::instrument(skip_all, fields(method, duration_ms))]
    pub async fn handle(&self, incoming: Incoming) -> Option<JsonRpcResponse> {
        let (id, method, params) = match incoming {
            Incoming::Request { id, method, params } => (id, method, params),
            Incoming::Notification { method, .. } => {
                debug!(%method, "ignoring notification");
                return None;
            }
            Incoming::Response => {
                debug!("ignoring response from client");
                return None;
            }
        };

        Span::current().record("method", method.as_str());
        let start = std::time::Instant::now();

        let response = match self.dispatch(&method, &params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(code = error.code, message = %error.message, "request failed");
                JsonRpcResponse::error(id, error)
            }
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            let duration = start.elapsed();
            Span::current().record("duration_ms", duration.as_millis());
            debug!(duration_ms = duration.as_millis(), "request handled");
        }

        Some(response)
    }

    async fn dispatch(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => to_value(&InitializeResult::new(self.server_info.clone())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => {
                let result = self.call_tool(params).await?;
                to_value(&result)
            }
            "resources/list" => Ok(json!({ "resources": [summary_resource()] })),
            "resources/read" => {
                let uri = string_field(params, "uri")?;
                if uri != SUMMARY_RESOURCE_URI {
                    return Err(RpcError::invalid_params(format!("Unknown resource: {}", uri)));
                }
                let contents = ResourceContents {
                    uri: SUMMARY_RESOURCE_URI.to_string(),
                    mime_type: TEXT_MIME.to_string(),
                    text: self.tools.summary().to_string(),
                };
                Ok(json!({ "contents": [contents] }))
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }

    async fn call_tool(&self, params: &Value) -> Result<CallToolResult, RpcError> {
        let name = string_field(params, "name")?;
        let no_arguments = Value::Null;
        let arguments = params.get("arguments").unwrap_or(&no_arguments);
        debug!(tool = name, "calling tool");

        let text = match name {
            CHECK_AVAILABILITY => {
                let start = string_field(arguments, "start_iso")?;
                let end = string_field(arguments, "end_iso")?;
                self.tools.check_availability(start, end).await
            }
            GET_FREE_TIME => {
                let date = string_field(arguments, "date_str")?;
                self.tools.get_free_time(date).await
            }
            other => return Err(RpcError::invalid_params(format!("Unknown tool: {}", other))),
        };

        Ok(CallToolResult::text(text))
    }
}

/// Descriptors advertised by `tools/list`.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::with_string_params(
            CHECK_AVAILABILITY,
            "Check whether the user is free between two times. Lists any events \
             found across all of the user's calendars.",
            &[
                ("start_iso", "Start of the window, ISO 8601 (e.g. 2026-01-26T20:00:00)"),
                ("end_iso", "End of the window, ISO 8601 (e.g. 2026-01-26T21:00:00)"),
            ],
        ),
        ToolDefinition::with_string_params(
            GET_FREE_TIME,
            "List the free time slots on the user's primary calendar for one day (UTC).",
            &[("date_str", "The day to inspect, YYYY-MM-DD")],
        ),
    ]
}

fn summary_resource() -> ResourceDefinition {
    ResourceDefinition {
        uri: SUMMARY_RESOURCE_URI.to_string(),
        name: SUMMARY_RESOURCE_NAME.to_string(),
        description: Some("Overview of the calendar tools".to_string()),
        mime_type: TEXT_MIME.to_string(),
    }
}

fn string_field<'a>(params: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RpcError::invalid_params(format!(
            "Argument '{}' must be a string",
            key
        ))),
        None => Err(RpcError::invalid_params(format!(
            "Missing required argument '{}'",
            key
        ))),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::internal(format!("failed to serialize result: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCalendar, FakeSource};

    fn handler() -> McpHandler {
        let calendar = FakeCalendar::new()
            .with_calendar("work", "Work")
            .with_event("work", "Standup", "2026-01-26T20:15:00Z")
            .with_busy("primary", "2026-01-26T09:00:00Z", "2026-01-26T17:00:00Z");
        McpHandler::new(CalendarTools::new(FakeSource::new(calendar)))
    }

    async fn request(handler: &McpHandler, raw: &str) -> JsonRpcResponse {
        handler.handle_message(raw).await.unwrap()
    }

    fn error_code(response: &JsonRpcResponse) -> i64 {
        response.error.as_ref().unwrap().code
    }

    #[tokio::test]
    async fn initialize() {
        let response = request(
            &handler(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"0"}}}"#,
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "calagent");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn ping() {
        let response = request(&handler(), r#"{"jsonrpc":"2.0","id":"p","method":"ping"}"#).await;
        assert_eq!(response.id, json!("p"));
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let handler = handler();
        assert!(
            handler
                .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .await
                .is_none()
        );
        assert!(
            handler
                .handle_message(r#"{"jsonrpc":"2.0","id":4,"result":{}}"#)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn tools_list() {
        let response =
            request(&handler(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();

        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["check_availability", "get_free_time"]);
        assert_eq!(
            tools[0]["inputSchema"]["required"],
            json!(["start_iso", "end_iso"])
        );
        assert_eq!(tools[1]["inputSchema"]["required"], json!(["date_str"]));
    }

    #[tokio::test]
    async fn call_check_availability() {
        let response = request(
            &handler(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"check_availability","arguments":{"start_iso":"2026-01-26T20:00:00","end_iso":"2026-01-26T21:00:00"}}}"#,
        )
        .await;

        assert_eq!(
            response.result.unwrap(),
            json!({
                "content": [{
                    "type": "text",
                    "text": "Conflicts found: Standup (on Work) at 2026-01-26T20:15:00Z"
                }],
                "isError": false
            })
        );
    }

    #[tokio::test]
    async fn call_get_free_time() {
        let response = request(
            &handler(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_free_time","arguments":{"date_str":"2026-01-26"}}}"#,
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(
            result["content"][0]["text"],
            "Free slots:\n00:00 - 09:00\n17:00 - 23:59"
        );
    }

    #[tokio::test]
    async fn tool_errors_are_text_results() {
        let response = request(
            &handler(),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"get_free_time","arguments":{"date_str":"soon"}}}"#,
        )
        .await;

        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        assert!(
            result["content"][0]["text"]
                .as_str()
                .unwrap()
                .starts_with("Error checking free time:")
        );
    }

    #[tokio::test]
    async fn bad_tool_arguments() {
        let handler = handler();

        let missing = request(
            &handler,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"check_availability","arguments":{"start_iso":"2026-01-26T20:00:00"}}}"#,
        )
        .await;
        assert_eq!(error_code(&missing), -32602);
        assert!(missing.error.unwrap().message.contains("end_iso"));

        let wrong_type = request(
            &handler,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"get_free_time","arguments":{"date_str":20260126}}}"#,
        )
        .await;
        assert_eq!(error_code(&wrong_type), -32602);

        let unknown = request(
            &handler,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"book_meeting","arguments":{}}}"#,
        )
        .await;
        assert_eq!(error_code(&unknown), -32602);
        assert_eq!(unknown.id, json!(7));
    }

    #[tokio::test]
    async fn resources() {
        let handler = handler();

        let list =
            request(&handler, r#"{"jsonrpc":"2.0","id":8,"method":"resources/list"}"#).await;
        assert_eq!(
            list.result.unwrap()["resources"],
            json!([{
                "uri": "calendar://summary",
                "name": "calendar_summary",
                "description": "Overview of the calendar tools",
                "mimeType": "text/plain"
            }])
        );

        let read = request(
            &handler,
            r#"{"jsonrpc":"2.0","id":9,"method":"resources/read","params":{"uri":"calendar://summary"}}"#,
        )
        .await;
        let result = read.result.unwrap();
        assert_eq!(result["contents"][0]["uri"], "calendar://summary");
        assert_eq!(result["contents"][0]["mimeType"], "text/plain");
        assert!(!result["contents"][0]["text"].as_str().unwrap().is_empty());

        let unknown = request(
            &handler,
            r#"{"jsonrpc":"2.0","id":10,"method":"resources/read","params":{"uri":"calendar://other"}}"#,
        )
        .await;
        assert_eq!(error_code(&unknown), -32602);
    }

    #[tokio::test]
    async fn protocol_errors() {
        let handler = handler();

        let unknown = request(&handler, r#"{"jsonrpc":"2.0","id":11,"method":"prompts/list"}"#).await;
        assert_eq!(error_code(&unknown), -32601);
        assert_eq!(
            unknown.error.unwrap().message,
            "Method not found: prompts/list"
        );

        let malformed = request(&handler, "{\"jsonrpc\":").await;
        assert_eq!(error_code(&malformed), -32700);
        assert_eq!(malformed.id, Value::Null);

        let old = request(&handler, r#"{"jsonrpc":"1.0","id":12,"method":"ping"}"#).await;
        assert_eq!(error_code(&old), -32600);
    }
}

//! Gemini `generateContent` client with function calling.
//!
//! The conversation is driven manually: each reply that contains function
//! calls is answered with `functionResponse` parts until the model replies
//! with text.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use calagent_providers::BoxFuture;

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Function-calling rounds allowed before giving up on a final answer.
pub const MAX_ROUNDS: usize = 8;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Executes the functions the model asks for.
pub trait FunctionExecutor: Send + Sync {
    fn declarations(&self) -> Vec<FunctionDeclaration>;

    /// Runs one call and returns its textual result. Failures are
    /// reported in the text so the model can read them.
    fn call<'a>(&'a self, name: &'a str, args: &'a Value) -> BoxFuture<'a, String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    fn function_calls(&self) -> Vec<FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| p.function_call.clone())
            .collect()
    }

    fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// One part of a message.
///
/// Fields this client does not use (such as `thoughtSignature`) are kept
/// so the model turn can be sent back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn function_response(name: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response: json!({ "result": result.into() }),
            }),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(format!("calagent/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `query` and resolves function calls until the model answers
    /// with text.
    pub async fn chat(
        &self,
        system_instruction: &str,
        query: &str,
        functions: &dyn FunctionExecutor,
    ) -> ClientResult<String> {
        let declarations = functions.declarations();
        let mut contents = vec![Content::user(vec![Part::text(query)])];

        for round in 1..=MAX_ROUNDS {
            let reply = self
                .generate(system_instruction, &contents, &declarations)
                .await?;

            let calls = reply.function_calls();
            if calls.is_empty() {
                let text = reply.text();
                if text.trim().is_empty() {
                    return Err(ClientError::Llm("model returned an empty reply".into()));
                }
                return Ok(text);
            }

            debug!(round, calls = calls.len(), "model requested function calls");
            contents.push(reply);

            let mut responses = Vec::with_capacity(calls.len());
            for call in calls {
                debug!(name = %call.name, args = %call.args, "calling function");
                let result = functions.call(&call.name, &call.args).await;
                debug!(name = %call.name, %result, "function returned");
                responses.push(Part::function_response(call.name, result));
            }
            contents.push(Content::user(responses));
        }

        Err(ClientError::Llm(format!(
            "no answer after {} rounds of function calls",
            MAX_ROUNDS
        )))
    }

    async fn generate(
        &self,
        system_instruction: &str,
        contents: &[Content],
        declarations: &[FunctionDeclaration],
    ) -> ClientResult<Content> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "contents": contents,
        });
        if !declarations.is_empty() {
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Llm(format!(
                "Gemini API error ({}): {}",
                status, text
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Llm(format!("invalid Gemini response: {}", e)))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Llm("Gemini returned no candidates".into()))?;

        candidate.content.ok_or_else(|| {
            ClientError::Llm(format!(
                "Gemini returned no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::Mutex;

    /// Records calls and answers with a fixed string.
    struct Recorder {
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl FunctionExecutor for Recorder {
        fn declarations(&self) -> Vec<FunctionDeclaration> {
            vec![FunctionDeclaration {
                name: "check_availability".into(),
                description: "Check availability".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "start_iso": { "type": "string" },
                        "end_iso": { "type": "string" }
                    },
                    "required": ["start_iso", "end_iso"]
                }),
            }]
        }

        fn call<'a>(&'a self, name: &'a str, args: &'a Value) -> BoxFuture<'a, String> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), args.clone()));
            Box::pin(async { "You are completely free across all your calendars.".to_string() })
        }
    }

    fn client(server: &mockito::Server) -> GeminiClient {
        GeminiClient::new("test-key", DEFAULT_MODEL)
            .unwrap()
            .with_base_url(server.url())
    }

    const PATH: &str = "/models/gemini-2.5-flash-lite:generateContent";

    #[tokio::test]
    async fn executes_function_call_then_returns_text() {
        let mut server = mockito::Server::new_async().await;

        let first = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Am I free?" }] }],
                "tools": [{ "functionDeclarations": [{ "name": "check_availability" }] }]
            })))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{
                                "functionCall": {
                                    "name": "check_availability",
                                    "args": {
                                        "start_iso": "2026-01-26T20:00:00",
                                        "end_iso": "2026-01-26T21:00:00"
                                    }
                                },
                                "thoughtSignature": "sig"
                            }]
                        },
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let second = server
            .mock("POST", PATH)
            .match_body(Matcher::PartialJson(json!({
                "contents": [
                    { "role": "user" },
                    { "role": "model", "parts": [{ "thoughtSignature": "sig" }] },
                    { "role": "user", "parts": [{
                        "functionResponse": {
                            "name": "check_availability",
                            "response": { "result": "You are completely free across all your calendars." }
                        }
                    }] }
                ]
            })))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": { "role": "model", "parts": [{ "text": "Yes, you are free." }] }
                    }]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let recorder = Recorder::new();
        let reply = client(&server)
            .chat("You are a calendar assistant.", "Am I free?", &recorder)
            .await
            .unwrap();

        assert_eq!(reply, "Yes, you are free.");
        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "check_availability");
        assert_eq!(calls[0].1["start_iso"], "2026-01-26T20:00:00");

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn plain_answer_needs_no_function() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_body(Matcher::PartialJson(json!({
                "systemInstruction": { "parts": [{ "text": "sys" }] }
            })))
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"},{"text":" there"}]}}]}"#,
            )
            .create_async()
            .await;

        let recorder = Recorder::new();
        let reply = client(&server).chat("sys", "hi", &recorder).await.unwrap();
        assert_eq!(reply, "Hello there");
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gives_up_after_max_rounds() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_body(
                r#"{"candidates":[{"content":{"role":"model","parts":[{"functionCall":{"name":"check_availability","args":{}}}]}}]}"#,
            )
            .expect(MAX_ROUNDS)
            .create_async()
            .await;

        let recorder = Recorder::new();
        let err = client(&server).chat("sys", "loop", &recorder).await.unwrap_err();
        assert!(err.to_string().contains("rounds"));
        assert_eq!(recorder.calls.lock().unwrap().len(), MAX_ROUNDS);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(400)
            .with_body(r#"{"error":{"message":"API key not valid"}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .chat("sys", "hi", &Recorder::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Llm(_)));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn blocked_reply_without_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_body(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
            .create_async()
            .await;

        let err = client(&server)
            .chat("sys", "hi", &Recorder::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn part_keeps_unknown_fields() {
        let part: Part =
            serde_json::from_value(json!({ "text": "hi", "thoughtSignature": "abc" })).unwrap();
        assert_eq!(part.text.as_deref(), Some("hi"));
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({ "text": "hi", "thoughtSignature": "abc" })
        );
    }
}

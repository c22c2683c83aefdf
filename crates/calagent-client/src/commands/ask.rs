//! `calagent ask`: one question to Gemini with `check_availability`
//! available as a function.

use chrono::{Local, NaiveDateTime};
use serde_json::{Value, json};
use tracing::info;

use calagent_providers::BoxFuture;
use calagent_server::CalendarTools;

use crate::commands::tools::interactive_tools;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::llm::{FunctionDeclaration, FunctionExecutor, GeminiClient};

/// Asked when no query is given on the command line.
pub const DEFAULT_QUERY: &str = "Am I free on Monday 26th January 2026 at from 8pm to 9pm?";

pub async fn run(
    config: &ClientConfig,
    query: Option<String>,
    model: Option<String>,
) -> ClientResult<()> {
    let api_key = config.llm.resolve_api_key().map_err(ClientError::Config)?;
    let model = model.unwrap_or_else(|| config.llm.model.clone());

    let mut gemini = GeminiClient::new(api_key, model)?;
    if let Some(ref url) = config.llm.base_url {
        gemini = gemini.with_base_url(url);
    }

    let tools = interactive_tools(config)?;
    let query = query.unwrap_or_else(|| DEFAULT_QUERY.to_string());
    info!(model = gemini.model(), "asking Gemini");

    println!("User: {}", query);
    let reply = gemini
        .chat(&system_instruction(Local::now().naive_local()), &query, &tools)
        .await?;
    println!("AI: {}", reply);

    Ok(())
}

/// Gives the model the current local date and time so it can resolve
/// relative dates.
pub fn system_instruction(now: NaiveDateTime) -> String {
    format!(
        "You are a helpful calendar assistant. The current date/time is {}. \
         Use the check_availability tool to answer user questions about their schedule.",
        now.format("%Y-%m-%dT%H:%M:%S")
    )
}

impl FunctionExecutor for CalendarTools {
    fn declarations(&self) -> Vec<FunctionDeclaration> {
        vec![FunctionDeclaration {
            name: "check_availability".to_string(),
            description: "Check the user's calendars for events between two times. \
                          Returns the conflicting events, or says the user is free."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "start_iso": {
                        "type": "string",
                        "description": "Start of the window, ISO 8601 (e.g. 2026-01-26T20:00:00)"
                    },
                    "end_iso": {
                        "type": "string",
                        "description": "End of the window, ISO 8601 (e.g. 2026-01-26T21:00:00)"
                    }
                },
                "required": ["start_iso", "end_iso"]
            }),
        }]
    }

    fn call<'a>(&'a self, name: &'a str, args: &'a Value) -> BoxFuture<'a, String> {
        Box::pin(async move {
            if name != "check_availability" {
                return format!("Unknown function: {}", name);
            }
            match (
                args.get("start_iso").and_then(Value::as_str),
                args.get("end_iso").and_then(Value::as_str),
            ) {
                (Some(start), Some(end)) => self.check_availability(start, end).await,
                _ => "Missing required arguments 'start_iso' and 'end_iso'".to_string(),
            }
        })
    }
}

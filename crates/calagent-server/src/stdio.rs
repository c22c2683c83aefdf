//! stdio transport: one JSON-RPC message per line on stdin, replies on
//! stdout.
//!
//! Requests are served one at a time. End of input is a clean shutdown.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

use calagent_protocol::{JsonRpcResponse, LineReader, LineWriter, ProtocolError, RpcError};

use crate::error::ServerResult;
use crate::handler::McpHandler;
use crate::signals::ShutdownSignal;

/// Serves MCP over a pair of byte streams until EOF or shutdown.
pub async fn serve_stdio<R, W>(
    handler: Arc<McpHandler>,
    input: R,
    output: W,
    shutdown: ShutdownSignal,
) -> ServerResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = LineReader::new(BufReader::new(input));
    let mut writer = LineWriter::new(output);

    let shutdown = shutdown.wait();
    tokio::pin!(shutdown);

    info!("MCP server ready on stdio");

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, closing stdio transport");
                return Ok(());
            }
            line = reader.read_line() => line,
        };

        let response = match line {
            Ok(Some(line)) => {
                debug!(bytes = line.len(), "received message");
                handler.handle_message(&line).await
            }
            Ok(None) => {
                info!("stdin closed, stopping");
                return Ok(());
            }
            Err(ProtocolError::MessageTooLarge { size, max }) => {
                warn!(size, max, "dropping oversized message");
                Some(JsonRpcResponse::error(
                    Value::Null,
                    RpcError::invalid_request(format!(
                        "message too large: {} bytes (max: {})",
                        size, max
                    )),
                ))
            }
            Err(ProtocolError::InvalidUtf8) => {
                warn!("dropping message that is not valid UTF-8");
                Some(JsonRpcResponse::error(
                    Value::Null,
                    RpcError::parse_error("message is not valid UTF-8"),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(response) = response {
            match writer.write_message(&response).await {
                Err(ProtocolError::MessageTooLarge { size, max }) => {
                    warn!(size, max, "reply too large, answering with an error");
                    let reply = JsonRpcResponse::error(
                        response.id,
                        RpcError::internal(format!(
                            "result too large: {} bytes (max: {})",
                            size, max
                        )),
                    );
                    writer.write_message(&reply).await?;
                }
                written => written?,
            }
        }
    }
}

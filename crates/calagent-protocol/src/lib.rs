//! Model Context Protocol messages for calagent.
//!
//! MCP is JSON-RPC 2.0. Over stdio, each message is one line of JSON
//! terminated by `\n`; over HTTP, each request body is one message.
//!
//! # Example
//!
//! ```rust
//! use calagent_protocol::{Incoming, JsonRpcResponse, encode_line};
//! use serde_json::json;
//!
//! let msg = Incoming::parse(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
//! assert!(matches!(msg, Incoming::Request { .. }));
//!
//! let line = encode_line(&JsonRpcResponse::success(json!(1), json!({}))).unwrap();
//! assert_eq!(line.last(), Some(&b'\n'));
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{LineReader, LineWriter, encode_line};
pub use types::{
    CallToolResult, ErrorCode, Incoming, InitializeResult, JsonRpcResponse, ResourceContents,
    ResourceDefinition, RpcError, ServerInfo, ToolContent, ToolDefinition,
};

/// MCP revision implemented by the server.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Value of the `jsonrpc` member in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Maximum message size (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

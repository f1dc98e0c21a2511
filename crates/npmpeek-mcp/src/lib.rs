//! Model Context Protocol server exposing npm package sources.
//!
//! The server speaks JSON-RPC 2.0 (MCP protocol version `2024-11-05`) over
//! either stdio or HTTP. Tool calls are handed to `npmpeek-operations` on the
//! blocking thread pool.

pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use error::{McpError, Result};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::{serve_stdio, HttpTransport};

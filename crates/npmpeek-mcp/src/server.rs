//! Request dispatch.

use std::{sync::Arc, time::Instant};

use npmpeek_operations::{popular::popular_packages, NpmContext};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION},
    tools::{operation_error, text_content, tool_definitions, ToolCall},
};

pub const SERVER_NAME: &str = "npmpeek";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const POPULAR_PACKAGES_URI: &str = "npm://popular-packages";

const INSTRUCTIONS: &str = "Read the source of npm packages. Use search_packages to find a \
                            package, get_package_info for its metadata, list_package_files to \
                            see its files and fetch_package_code to read them.";

/// Answers MCP requests against one [`NpmContext`].
///
/// Operations block on network and disk, so each tool call runs on the
/// blocking thread pool.
#[derive(Clone)]
pub struct McpServer {
    ctx: Arc<NpmContext>,
}

impl McpServer {
    pub fn new(ctx: Arc<NpmContext>) -> Self {
        Self {
            ctx,
        }
    }

    pub fn context(&self) -> &NpmContext {
        &self.ctx
    }

    /// Handles one raw message. Returns `None` when nothing should be sent
    /// back, which is the case for every notification.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match JsonRpcRequest::parse(raw) {
            Ok(request) => self.handle(request).await,
            Err(response) => {
                warn!("rejected message: {:?}", response.error);
                Some(response)
            }
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            debug!("notification: {}", request.method);
            return None;
        };

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize(request.params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(request.params).await,
            "resources/list" => Ok(resource_list()),
            "resources/templates/list" => Ok(json!({ "resourceTemplates": [] })),
            "resources/read" => self.read_resource(request.params.as_ref()).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let client = params
            .and_then(|p| p.pointer("/clientInfo/name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown client");
        info!("initialize from {}", client);

        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "subscribe": false, "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            },
            "instructions": INSTRUCTIONS
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let call = ToolCall::from_params(params)?;
        let tool = call.name();
        let ctx = Arc::clone(&self.ctx);
        let started = Instant::now();

        let outcome = tokio::task::spawn_blocking(move || call.execute(&ctx))
            .await
            .map_err(|err| JsonRpcError::internal(format!("Tool task failed: {err}")))?;

        match outcome {
            Ok(text) => {
                info!("{} finished in {:?}", tool, started.elapsed());
                Ok(text_content(text))
            }
            Err(err) => {
                warn!("{} failed: {}", tool, err);
                Err(operation_error(&err))
            }
        }
    }

    async fn read_resource(&self, params: Option<&Value>) -> Result<Value, JsonRpcError> {
        let uri = params
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params("Missing resource uri"))?;
        if uri != POPULAR_PACKAGES_URI {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown resource: {uri}"
            )));
        }

        let ctx = Arc::clone(&self.ctx);
        let digest = tokio::task::spawn_blocking(move || popular_packages(&ctx))
            .await
            .map_err(|err| JsonRpcError::internal(format!("Resource task failed: {err}")))?
            .map_err(|err| {
                warn!("popular packages refresh failed: {}", err);
                operation_error(&err)
            })?;

        Ok(json!({
            "contents": [{
                "uri": POPULAR_PACKAGES_URI,
                "mimeType": "text/markdown",
                "text": digest
            }]
        }))
    }
}

fn resource_list() -> Value {
    json!({
        "resources": [{
            "uri": POPULAR_PACKAGES_URI,
            "name": "Popular npm packages",
            "description": "The most popular packages on the registry, refreshed daily",
            "mimeType": "text/markdown"
        }]
    })
}

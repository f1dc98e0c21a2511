//! JSON-RPC 2.0 message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Decodes one message. Failures come back as the error response to send.
    pub fn parse(raw: &str) -> Result<Self, JsonRpcResponse> {
        let value: Value = serde_json::from_str(raw).map_err(|err| {
            JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("Parse error: {err}")),
            )
        })?;

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        if !value.is_object() {
            return Err(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(INVALID_REQUEST, "Invalid request: expected a single object"),
            ));
        }

        let request: Self = serde_json::from_value(value).map_err(|err| {
            JsonRpcResponse::failure(
                id.clone(),
                JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {err}")),
            )
        })?;

        if request.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("Invalid request: unsupported jsonrpc version `{}`", request.jsonrpc),
                ),
            ));
        }

        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_request_and_notification() {
        let request =
            JsonRpcRequest::parse(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert_eq!(request.id, Some(json!(7)));
        assert!(!request.is_notification());

        let notification =
            JsonRpcRequest::parse(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(notification.is_notification());
        assert!(notification.params.is_none());
    }

    #[test]
    fn test_parse_errors() {
        let err = JsonRpcRequest::parse("{not json").unwrap_err();
        assert_eq!(err.error.unwrap().code, PARSE_ERROR);
        assert_eq!(err.id, Value::Null);

        let err = JsonRpcRequest::parse(r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#)
            .unwrap_err();
        assert_eq!(err.error.unwrap().code, INVALID_REQUEST);

        let err = JsonRpcRequest::parse(r#"{"jsonrpc":"2.0","id":"a"}"#).unwrap_err();
        assert_eq!(err.id, json!("a"));
        assert_eq!(err.error.unwrap().code, INVALID_REQUEST);

        let err = JsonRpcRequest::parse(r#"{"jsonrpc":"1.0","id":2,"method":"ping"}"#)
            .unwrap_err();
        assert_eq!(err.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn test_response_serialization() {
        let ok = JsonRpcResponse::success(json!(1), json!({}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({ "jsonrpc": "2.0", "id": 1, "result": {} })
        );

        let err = JsonRpcResponse::failure(json!(2), JsonRpcError::method_not_found("nope"));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": { "code": -32601, "message": "Method not found: nope" }
            })
        );
    }
}

//! Tool catalogue and argument decoding.

use npmpeek_operations::{
    fetch::fetch_package_code, info::get_package_info, list::list_package_files,
    search::search_packages, ErrorKind, NpmContext, OperationError,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::protocol::JsonRpcError;

pub const FETCH_PACKAGE_CODE: &str = "fetch_package_code";
pub const LIST_PACKAGE_FILES: &str = "list_package_files";
pub const GET_PACKAGE_INFO: &str = "get_package_info";
pub const SEARCH_PACKAGES: &str = "search_packages";

fn package_properties() -> serde_json::Map<String, Value> {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "name".into(),
        json!({
            "type": "string",
            "description": "Package name, e.g. `lodash` or `@types/node`"
        }),
    );
    properties.insert(
        "version".into(),
        json!({
            "type": "string",
            "description": "Exact version, dist-tag or semver range. Defaults to `latest`."
        }),
    );
    properties
}

/// The `tools/list` payload.
pub fn tool_definitions() -> Value {
    let mut fetch = package_properties();
    fetch.insert(
        "file_path".into(),
        json!({
            "type": "string",
            "description": "File to return, relative to the package root. Omit to get the main source files."
        }),
    );

    json!([
        {
            "name": FETCH_PACKAGE_CODE,
            "description": "Fetch source code from an npm package. Returns one file when `file_path` is given, otherwise package.json, the README, the entry point and other source files.",
            "inputSchema": {
                "type": "object",
                "properties": fetch,
                "required": ["name"]
            }
        },
        {
            "name": LIST_PACKAGE_FILES,
            "description": "List every file in an npm package with its size.",
            "inputSchema": {
                "type": "object",
                "properties": package_properties(),
                "required": ["name"]
            }
        },
        {
            "name": GET_PACKAGE_INFO,
            "description": "Get metadata for an npm package version: entry points, license, dependencies, dist details and dist-tags.",
            "inputSchema": {
                "type": "object",
                "properties": package_properties(),
                "required": ["name"]
            }
        },
        {
            "name": SEARCH_PACKAGES,
            "description": "Search the npm registry.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search text. Supports qualifiers such as `keywords:react` or `author:sindresorhus`."
                    },
                    "size": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Number of results (default 20, capped at 250)"
                    },
                    "from": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Offset for pagination"
                    }
                },
                "required": ["query"]
            }
        }
    ])
}

#[derive(Debug, Deserialize)]
struct PackageArgs {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FetchArgs {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    size: Option<usize>,
    #[serde(default)]
    from: Option<usize>,
}

/// A decoded `tools/call` request.
#[derive(Debug)]
pub enum ToolCall {
    FetchPackageCode {
        name: String,
        version: Option<String>,
        file_path: Option<String>,
    },
    ListPackageFiles {
        name: String,
        version: Option<String>,
    },
    GetPackageInfo {
        name: String,
        version: Option<String>,
    },
    SearchPackages {
        query: String,
        size: Option<usize>,
        from: Option<usize>,
    },
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments).map_err(|err| {
        JsonRpcError::invalid_params(format!("Invalid arguments for {tool}: {err}"))
    })
}

impl ToolCall {
    /// Decodes the `params` of a `tools/call` request.
    pub fn from_params(params: Option<Value>) -> Result<Self, JsonRpcError> {
        let mut params = params.unwrap_or(Value::Null);
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| JsonRpcError::invalid_params("Missing tool name"))?;
        let arguments = match params.get_mut("arguments").map(Value::take) {
            None | Some(Value::Null) => json!({}),
            Some(arguments) => arguments,
        };

        match name.as_str() {
            FETCH_PACKAGE_CODE => {
                let args: FetchArgs = decode(&name, arguments)?;
                Ok(Self::FetchPackageCode {
                    name: args.name,
                    version: args.version,
                    file_path: args.file_path,
                })
            }
            LIST_PACKAGE_FILES => {
                let args: PackageArgs = decode(&name, arguments)?;
                Ok(Self::ListPackageFiles {
                    name: args.name,
                    version: args.version,
                })
            }
            GET_PACKAGE_INFO => {
                let args: PackageArgs = decode(&name, arguments)?;
                Ok(Self::GetPackageInfo {
                    name: args.name,
                    version: args.version,
                })
            }
            SEARCH_PACKAGES => {
                let args: SearchArgs = decode(&name, arguments)?;
                Ok(Self::SearchPackages {
                    query: args.query,
                    size: args.size,
                    from: args.from,
                })
            }
            other => Err(JsonRpcError::method_not_found(&format!("tool `{other}`"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchPackageCode { .. } => FETCH_PACKAGE_CODE,
            Self::ListPackageFiles { .. } => LIST_PACKAGE_FILES,
            Self::GetPackageInfo { .. } => GET_PACKAGE_INFO,
            Self::SearchPackages { .. } => SEARCH_PACKAGES,
        }
    }

    /// Runs the operation and renders its text. Blocks on network and disk.
    pub fn execute(&self, ctx: &NpmContext) -> Result<String, OperationError> {
        match self {
            Self::FetchPackageCode {
                name,
                version,
                file_path,
            } => {
                fetch_package_code(ctx, name, version.as_deref(), file_path.as_deref())
                    .map(|report| report.to_string())
            }
            Self::ListPackageFiles {
                name,
                version,
            } => list_package_files(ctx, name, version.as_deref()).map(|l| l.to_string()),
            Self::GetPackageInfo {
                name,
                version,
            } => get_package_info(ctx, name, version.as_deref()).map(|i| i.to_string()),
            Self::SearchPackages {
                query,
                size,
                from,
            } => search_packages(ctx, query, *size, *from).map(|r| r.to_string()),
        }
    }
}

/// Maps a failed operation onto the JSON-RPC error code for its kind.
pub fn operation_error(err: &OperationError) -> JsonRpcError {
    match err.kind() {
        ErrorKind::InvalidInput => JsonRpcError::invalid_params(err.to_string()),
        ErrorKind::Internal => JsonRpcError::internal(err.to_string()),
    }
}

/// Wraps tool output as MCP text content.
pub fn text_content(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

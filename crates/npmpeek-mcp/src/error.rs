use miette::Diagnostic;
use npmpeek_config::error::ConfigError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum McpError {
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(
        code(npmpeek_mcp::bind),
        help("Pick another address with `--bind` or `NPMPEEK_BIND`")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport I/O failed: {0}")]
    #[diagnostic(code(npmpeek_mcp::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to encode response: {0}")]
    #[diagnostic(code(npmpeek_mcp::encode))]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, McpError>;

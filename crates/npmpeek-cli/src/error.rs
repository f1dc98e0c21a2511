use miette::Diagnostic;
use npmpeek_config::error::ConfigError;
use npmpeek_mcp::McpError;
use npmpeek_operations::OperationError;
use npmpeek_utils::error::PathError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error("Invalid proxy `{proxy}`: {reason}")]
    #[diagnostic(
        code(npmpeek::invalid_proxy),
        help("Proxies look like `http://host:port` or `socks5://host:port`")
    )]
    InvalidProxy { proxy: String, reason: String },

    #[error("Invalid header `{0}`")]
    #[diagnostic(code(npmpeek::invalid_header), help("Headers look like `Name: value`"))]
    InvalidHeader(String),

    #[error("Failed to {action}: {source}")]
    #[diagnostic(code(npmpeek::io))]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    #[diagnostic(code(npmpeek::task))]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Mcp(#[from] McpError),
}

pub type CliResult<T> = std::result::Result<T, CliError>;

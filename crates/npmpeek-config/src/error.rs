use miette::Diagnostic;
use npmpeek_utils::error::{BytesError, DurationError, PathError, UtilsError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(npmpeek_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(npmpeek_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(npmpeek_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(npmpeek_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid registry URL `{url}`: {reason}")]
    #[diagnostic(
        code(npmpeek_config::invalid_registry_url),
        help("Use an http(s) URL such as https://registry.npmjs.org")
    )]
    InvalidRegistryUrl { url: String, reason: String },

    #[error("Invalid value for `{field}`: {reason}")]
    #[diagnostic(code(npmpeek_config::invalid_value))]
    InvalidValue { field: &'static str, reason: String },

    #[error("Unknown transport `{0}`")]
    #[diagnostic(
        code(npmpeek_config::unknown_transport),
        help("Supported transports are `stdio` and `http`")
    )]
    UnknownTransport(String),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(npmpeek_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(npmpeek_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Utils(#[from] UtilsError),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<BytesError> for ConfigError {
    fn from(err: BytesError) -> Self {
        Self::Utils(UtilsError::Bytes(err))
    }
}

impl From<DurationError> for ConfigError {
    fn from(err: DurationError) -> Self {
        Self::Utils(UtilsError::Duration(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

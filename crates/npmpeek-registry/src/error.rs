//! Error types for the registry crate.

use miette::Diagnostic;
use npmpeek_dl::error::DownloadError;
use thiserror::Error;

/// Errors raised while validating input or talking to the registry.
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Invalid package name `{name}`: {reason}")]
    #[diagnostic(
        code(npmpeek_registry::invalid_name),
        help("Package names look like `lodash` or `@scope/name`")
    )]
    InvalidName { name: String, reason: String },

    #[error("Invalid version `{version}`: {reason}")]
    #[diagnostic(code(npmpeek_registry::invalid_version))]
    InvalidVersion { version: String, reason: String },

    #[error("Invalid search query: {0}")]
    #[diagnostic(code(npmpeek_registry::invalid_query))]
    InvalidQuery(String),

    #[error("Package `{0}` not found in the registry")]
    #[diagnostic(
        code(npmpeek_registry::package_not_found),
        help("Check the spelling, or use search_packages to find the right name")
    )]
    PackageNotFound(String),

    #[error("Version `{version}` of `{name}` not found")]
    #[diagnostic(
        code(npmpeek_registry::version_not_found),
        help("Available dist-tags: {}", .tags.join(", "))
    )]
    VersionNotFound {
        name: String,
        version: String,
        tags: Vec<String>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),
}

impl RegistryError {
    /// Whether the failure was caused by the caller's input rather than by
    /// the registry or the network.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. }
                | Self::InvalidVersion { .. }
                | Self::InvalidQuery(_)
                | Self::PackageNotFound(_)
                | Self::VersionNotFound { .. }
        )
    }
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

use miette::Diagnostic;
use npmpeek_config::error::ConfigError;
use npmpeek_dl::error::DownloadError;
use npmpeek_registry::RegistryError;
use npmpeek_utils::error::{FileSystemError, PathError};
use thiserror::Error;

/// How a failed operation should be reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was wrong: bad name, unknown version, bad path.
    InvalidInput,
    /// Something failed on our side or upstream.
    Internal,
}

#[derive(Error, Diagnostic, Debug)]
pub enum OperationError {
    #[error("Invalid file path: {source}")]
    #[diagnostic(
        code(npmpeek_operations::invalid_path),
        help("Use a path relative to the package root, e.g. `lib/index.js`")
    )]
    InvalidFilePath {
        #[source]
        source: PathError,
    },

    #[error("File not found: {0}")]
    #[diagnostic(
        code(npmpeek_operations::file_not_found),
        help("Use list_package_files to see the files in this package")
    )]
    FileNotFound(String),

    #[error("Not a regular file: {0}")]
    #[diagnostic(code(npmpeek_operations::not_a_file))]
    NotAFile(String),

    #[error("`{name}@{version}` has no tarball URL")]
    #[diagnostic(code(npmpeek_operations::missing_tarball))]
    MissingTarball { name: String, version: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFilePath { .. } | Self::FileNotFound(_) | Self::NotAFile(_) => {
                ErrorKind::InvalidInput
            }
            Self::Registry(err) if err.is_invalid_input() => ErrorKind::InvalidInput,
            _ => ErrorKind::Internal,
        }
    }
}

impl From<PathError> for OperationError {
    fn from(source: PathError) -> Self {
        Self::InvalidFilePath { source }
    }
}

pub type Result<T> = std::result::Result<T, OperationError>;

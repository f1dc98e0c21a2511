use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum BytesError {
    #[error("Failed to parse `{input}` as bytes: {reason}")]
    #[diagnostic(
        code(npmpeek_utils::bytes),
        help("Use a plain number or a suffixed size such as `512KiB` or `1MB`")
    )]
    ParseFailed { input: String, reason: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum DurationError {
    #[error("Failed to parse `{input}` as a duration")]
    #[diagnostic(
        code(npmpeek_utils::duration),
        help("Use a combination of days, hours, minutes and seconds such as `1d`, `10s` or `1h30m`")
    )]
    ParseFailed { input: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum PathError {
    #[error("Failed to get current directory: {source}")]
    #[diagnostic(code(npmpeek_utils::path::current_dir))]
    CurrentDir { source: std::io::Error },

    #[error("Path is empty")]
    #[diagnostic(code(npmpeek_utils::path::empty))]
    Empty,

    #[error("Environment variable `{var}` not set in `{input}`")]
    #[diagnostic(code(npmpeek_utils::path::missing_env_var))]
    MissingEnvVar { var: String, input: String },

    #[error("Unclosed variable expression starting at `{input}`")]
    #[diagnostic(code(npmpeek_utils::path::unclosed_variable))]
    UnclosedVariable { input: String },

    #[error("Path `{path}` must be relative to the package root")]
    #[diagnostic(code(npmpeek_utils::path::absolute))]
    Absolute { path: String },

    #[error("Path `{path}` resolves outside of the package root")]
    #[diagnostic(
        code(npmpeek_utils::path::traversal),
        help("Use a path relative to the package root without leading `..` segments")
    )]
    OutsideRoot { path: String },

    #[error("Path `{path}` contains a forbidden character")]
    #[diagnostic(code(npmpeek_utils::path::invalid_character))]
    InvalidCharacter { path: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum FileSystemError {
    #[error("Failed to {action} file `{}`: {source}", .path.display())]
    #[diagnostic(code(npmpeek_utils::fs::file))]
    File {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    #[error("Failed to {action} directory `{}`: {source}", .path.display())]
    #[diagnostic(code(npmpeek_utils::fs::directory))]
    Directory {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    #[error("`{}` is not a directory", .path.display())]
    #[diagnostic(code(npmpeek_utils::fs::not_a_directory))]
    NotADirectory { path: PathBuf },

    #[error("Failed to walk `{}`: {source}", .path.display())]
    #[diagnostic(code(npmpeek_utils::fs::walk))]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

#[derive(Error, Diagnostic, Debug)]
pub enum IntegrityError {
    #[error("Malformed integrity string `{0}`")]
    #[diagnostic(
        code(npmpeek_utils::integrity::malformed),
        help("Integrity strings look like `sha512-<base64 digest>`")
    )]
    Malformed(String),

    #[error("Unsupported integrity algorithm `{0}`")]
    #[diagnostic(code(npmpeek_utils::integrity::unsupported))]
    Unsupported(String),

    #[error("Integrity mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(npmpeek_utils::integrity::mismatch),
        help("The downloaded tarball does not match the registry metadata")
    )]
    Mismatch { expected: String, actual: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum UtilsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Bytes(#[from] BytesError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Duration(#[from] DurationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Integrity(#[from] IntegrityError),
}

pub type BytesResult<T> = std::result::Result<T, BytesError>;
pub type DurationResult<T> = std::result::Result<T, DurationError>;
pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type IntegrityResult<T> = std::result::Result<T, IntegrityError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use std::{error::Error, io};

    use super::*;

    #[test]
    fn test_bytes_error_display() {
        let error = BytesError::ParseFailed {
            input: "12XB".to_string(),
            reason: "unknown suffix".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse `12XB` as bytes: unknown suffix"
        );
    }

    #[test]
    fn test_path_error_display() {
        let err = PathError::OutsideRoot {
            path: "../etc/passwd".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Path `../etc/passwd` resolves outside of the package root"
        );
        assert!(err.source().is_none());

        let err = PathError::CurrentDir {
            source: io::Error::other("gone"),
        };
        assert_eq!(err.to_string(), "Failed to get current directory: gone");
    }

    #[test]
    fn test_file_system_error_display_and_source() {
        let err = FileSystemError::File {
            path: PathBuf::from("/pkg/index.js"),
            action: "read",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read file `/pkg/index.js`: permission denied"
        );
        assert!(err.source().is_some());

        let err = FileSystemError::NotADirectory {
            path: PathBuf::from("/pkg"),
        };
        assert_eq!(err.to_string(), "`/pkg` is not a directory");
    }

    #[test]
    fn test_utils_error_is_transparent() {
        let err = UtilsError::from(IntegrityError::Unsupported("md5".into()));
        assert_eq!(err.to_string(), "Unsupported integrity algorithm `md5`");
    }
}

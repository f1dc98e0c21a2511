use miette::Diagnostic;
use npmpeek_utils::error::{FileSystemError, IntegrityError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(npmpeek_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(code(npmpeek_dl::extract_error))]
    ExtractError(#[from] compak::error::ArchiveError),

    #[error(transparent)]
    #[diagnostic(
        code(npmpeek_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(npmpeek_dl::timeout),
        help("Increase `metadata_timeout` or `download_timeout` in the config")
    )]
    Timeout { url: String },

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(npmpeek_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("Not found: {url}")]
    #[diagnostic(code(npmpeek_dl::not_found))]
    NotFound { url: String },

    #[error("Response from {url} exceeds the {limit} byte limit")]
    #[diagnostic(
        code(npmpeek_dl::too_large),
        help("Raise `max_tarball_size` or `max_metadata_size` in the config")
    )]
    TooLarge { url: String, limit: u64 },

    #[error("Invalid response from {url}: {reason}")]
    #[diagnostic(code(npmpeek_dl::invalid_response))]
    InvalidResponse { url: String, reason: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(npmpeek_dl::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl From<ureq::Error> for DownloadError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

impl DownloadError {
    /// Maps a `ureq` failure for `url` onto the closest variant.
    pub fn from_ureq(url: &str, err: ureq::Error, limit: Option<u64>) -> Self {
        match err {
            ureq::Error::StatusCode(404) => Self::NotFound {
                url: url.to_string(),
            },
            ureq::Error::StatusCode(status) => Self::HttpError {
                status,
                url: url.to_string(),
            },
            ureq::Error::Timeout(_) => Self::Timeout {
                url: url.to_string(),
            },
            ureq::Error::BodyExceedsLimit(max) => Self::TooLarge {
                url: url.to_string(),
                limit: limit.unwrap_or(max),
            },
            ureq::Error::Json(err) => Self::InvalidResponse {
                url: url.to_string(),
                reason: err.to_string(),
            },
            other => Self::from(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

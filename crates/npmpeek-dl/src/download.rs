use std::{
    fs::File,
    io::{Read as _, Write as _},
    path::{Path, PathBuf},
    time::Duration,
};

use npmpeek_utils::{
    error::IntegrityError,
    fs::{ensure_dir_exists, safe_remove},
    integrity::{Integrity, IntegrityVerifier},
};
use tracing::{debug, warn};
use ureq::{
    http::{header::CONTENT_LENGTH, Response},
    Body,
};

use crate::{
    error::{DownloadError, Result},
    http::Http,
    utils::filename_from_url,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_SIZE: u64 = 100 * 1024 * 1024;

/// Streams a package tarball to disk with a size cap and an optional
/// integrity check.
pub struct Download {
    pub url: String,
    pub output: PathBuf,
    pub max_size: u64,
    pub timeout: Duration,
    pub integrity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub size: u64,
    pub verified: bool,
}

impl Download {
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            max_size: DEFAULT_MAX_SIZE,
            timeout: DEFAULT_TIMEOUT,
            integrity: None,
        }
    }

    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the expected `dist.integrity` value. Only `sha512` entries are
    /// checked; other algorithms are skipped with a warning.
    pub fn integrity(mut self, integrity: Option<impl Into<String>>) -> Self {
        self.integrity = integrity.map(Into::into);
        self
    }

    pub fn execute(self) -> Result<Downloaded> {
        let verifier = self.verifier()?;

        let resp = Http::fetch(&self.url, self.timeout)?;
        if let Some(length) = content_length(&resp) {
            if length > self.max_size {
                return Err(DownloadError::TooLarge {
                    url: self.url,
                    limit: self.max_size,
                });
            }
        }

        if let Some(parent) = self.output.parent() {
            ensure_dir_exists(parent)?;
        }

        debug!(
            "downloading {} to {}",
            filename_from_url(&self.url).unwrap_or_else(|| self.url.clone()),
            self.output.display()
        );

        match self.download_to_file(resp, verifier) {
            Ok(downloaded) => Ok(downloaded),
            Err(err) => {
                safe_remove(&self.output)?;
                Err(err)
            }
        }
    }

    fn verifier(&self) -> Result<Option<IntegrityVerifier>> {
        let Some(value) = self.integrity.as_deref().filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };

        match Integrity::parse(value) {
            Ok(integrity) => Ok(Some(integrity.verifier())),
            Err(IntegrityError::Unsupported(algorithm)) => {
                warn!(
                    "skipping integrity check for {}: {} is not verified",
                    self.url, algorithm
                );
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn download_to_file(
        &self,
        resp: Response<Body>,
        mut verifier: Option<IntegrityVerifier>,
    ) -> Result<Downloaded> {
        let mut file = File::create(&self.output)?;
        let mut reader = resp.into_body().into_reader();
        let mut buffer = [0u8; 8192];
        let mut size = 0u64;

        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }

            size += n as u64;
            if size > self.max_size {
                return Err(DownloadError::TooLarge {
                    url: self.url.clone(),
                    limit: self.max_size,
                });
            }

            if let Some(verifier) = verifier.as_mut() {
                verifier.update(&buffer[..n]);
            }
            file.write_all(&buffer[..n])?;
        }
        file.flush()?;

        let verified = match verifier {
            Some(verifier) => {
                verifier.finish()?;
                true
            }
            None => false,
        };

        Ok(Downloaded {
            path: self.output.clone(),
            size,
            verified,
        })
    }
}

fn content_length(resp: &Response<Body>) -> Option<u64> {
    resp.headers()
        .get(CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|len| len.parse::<u64>().ok())
}

/// Extracts `archive` into `dest`, creating `dest` if needed.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    ensure_dir_exists(dest)?;
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    compak::extract_archive(&archive, &dest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use flate2::{write::GzEncoder, Compression};
    use mockito::{Server, ServerGuard};
    use npmpeek_utils::integrity::integrity_of;
    use tempfile::tempdir;

    use super::*;

    fn tarball() -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let content = b"module.exports = 42;\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "package/index.js", &content[..])
            .unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    fn serve_tarball(server: &mut ServerGuard, path: &str, body: Vec<u8>) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(body)
            .create()
    }

    #[test]
    fn test_download_and_extract() {
        let data = tarball();
        let integrity = integrity_of(&data);
        let mut server = Server::new();
        let mock = serve_tarball(&mut server, "/pkg/-/pkg-1.0.0.tgz", data.clone());
        let dir = tempdir().unwrap();
        let output = dir.path().join("pkg").join("package.tar.gz");

        let downloaded = Download::new(format!("{}/pkg/-/pkg-1.0.0.tgz", server.url()), &output)
            .integrity(Some(integrity))
            .execute()
            .unwrap();

        mock.assert();
        assert_eq!(downloaded.size, data.len() as u64);
        assert!(downloaded.verified);

        let contents = dir.path().join("pkg").join("contents");
        extract(&output, &contents).unwrap();
        let index = std::fs::read_to_string(contents.join("package").join("index.js")).unwrap();
        assert_eq!(index, "module.exports = 42;\n");
    }

    #[test]
    fn test_integrity_mismatch_removes_file() {
        let mut server = Server::new();
        let _mock = serve_tarball(&mut server, "/x.tgz", tarball());
        let dir = tempdir().unwrap();
        let output = dir.path().join("package.tar.gz");

        let err = Download::new(format!("{}/x.tgz", server.url()), &output)
            .integrity(Some(integrity_of(b"something else")))
            .execute()
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::Integrity(IntegrityError::Mismatch { .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_unsupported_integrity_is_skipped() {
        let mut server = Server::new();
        let _mock = serve_tarball(&mut server, "/x.tgz", tarball());
        let dir = tempdir().unwrap();
        let output = dir.path().join("package.tar.gz");

        let downloaded = Download::new(format!("{}/x.tgz", server.url()), &output)
            .integrity(Some("sha1-2jmj7l5rSw0yVb/vlWAYkK/YBwk="))
            .execute()
            .unwrap();

        assert!(!downloaded.verified);
        assert!(output.exists());
    }

    #[test]
    fn test_size_cap() {
        let mut server = Server::new();
        let _mock = serve_tarball(&mut server, "/x.tgz", vec![0u8; 64 * 1024]);
        let dir = tempdir().unwrap();
        let output = dir.path().join("package.tar.gz");

        let err = Download::new(format!("{}/x.tgz", server.url()), &output)
            .max_size(1024)
            .execute()
            .unwrap_err();

        assert!(matches!(err, DownloadError::TooLarge { limit: 1024, .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_not_found() {
        let mut server = Server::new();
        let _mock = server.mock("GET", "/x.tgz").with_status(404).with_body("{}").create();
        let dir = tempdir().unwrap();

        let err = Download::new(format!("{}/x.tgz", server.url()), dir.path().join("a.tgz"))
            .integrity(None::<String>)
            .execute()
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

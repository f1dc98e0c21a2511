//! Subresource integrity (`sha512-<base64>`) parsing and streaming
//! verification, as published in npm `dist.integrity` fields.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};

use crate::error::{IntegrityError, IntegrityResult};

const KNOWN_ALGORITHMS: [&str; 4] = ["sha1", "sha256", "sha384", "sha512"];

/// A parsed `sha512` integrity value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integrity {
    digest: Vec<u8>,
}

impl Integrity {
    /// Parses an SRI string, picking the first `sha512` entry.
    ///
    /// SRI strings may hold several space-separated hashes. Entries with
    /// other known algorithms are ignored as long as a `sha512` entry is
    /// present.
    ///
    /// # Errors
    ///
    /// * [`IntegrityError::Unsupported`] if only non-`sha512` hashes are present
    /// * [`IntegrityError::Malformed`] if no entry parses
    pub fn parse(value: &str) -> IntegrityResult<Self> {
        let mut unsupported = None;

        for token in value.split_whitespace() {
            let Some((algorithm, encoded)) = token.split_once('-') else {
                continue;
            };
            // Options after `?` are reserved by the SRI grammar.
            let encoded = encoded.split('?').next().unwrap_or(encoded);

            if algorithm == "sha512" {
                let digest = STANDARD
                    .decode(encoded)
                    .map_err(|_| IntegrityError::Malformed(value.to_string()))?;
                if digest.len() != 64 {
                    return Err(IntegrityError::Malformed(value.to_string()));
                }
                return Ok(Self { digest });
            }

            if KNOWN_ALGORITHMS.contains(&algorithm) && unsupported.is_none() {
                unsupported = Some(algorithm.to_string());
            }
        }

        Err(match unsupported {
            Some(algorithm) => IntegrityError::Unsupported(algorithm),
            None => IntegrityError::Malformed(value.to_string()),
        })
    }

    /// Starts a streaming check against this value.
    pub fn verifier(&self) -> IntegrityVerifier {
        IntegrityVerifier {
            expected: self.clone(),
            hasher: Sha512::new(),
        }
    }
}

impl std::fmt::Display for Integrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha512-{}", STANDARD.encode(&self.digest))
    }
}

/// Incremental hasher created by [`Integrity::verifier`].
pub struct IntegrityVerifier {
    expected: Integrity,
    hasher: Sha512,
}

impl IntegrityVerifier {
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
    }

    /// Consumes the verifier and compares the digest.
    ///
    /// # Errors
    ///
    /// * [`IntegrityError::Mismatch`] if the data does not hash to the expected value
    pub fn finish(self) -> IntegrityResult<()> {
        let actual = self.hasher.finalize();
        if actual.as_slice() == self.expected.digest.as_slice() {
            return Ok(());
        }

        Err(IntegrityError::Mismatch {
            expected: self.expected.to_string(),
            actual: format!("sha512-{}", STANDARD.encode(actual)),
        })
    }
}

/// Computes the `sha512-<base64>` integrity string of a byte slice.
pub fn integrity_of(data: &[u8]) -> String {
    format!("sha512-{}", STANDARD.encode(Sha512::digest(data)))
}

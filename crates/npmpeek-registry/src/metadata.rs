//! Packument fetching and version resolution.

use std::time::Duration;

use npmpeek_config::config::Config;
use npmpeek_dl::{http::Http, utils::join_segment};
use semver::{Version, VersionReq};
use tracing::debug;

use crate::{
    error::{RegistryError, Result},
    name::{validate_package_name, validate_version},
    package::{Packument, VersionManifest},
    search::{SearchParams, SearchResults},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_METADATA_LIMIT: u64 = 64 * 1024 * 1024;

/// Blocking client for one registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    timeout: Duration,
    max_metadata_size: u64,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_metadata_size: DEFAULT_METADATA_LIMIT,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.registry_url())
            .with_timeout(config.metadata_timeout())
            .with_metadata_limit(config.max_metadata_size())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_metadata_limit(mut self, limit: u64) -> Self {
        self.max_metadata_size = limit;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the full document for `name`.
    ///
    /// # Errors
    ///
    /// * [`RegistryError::InvalidName`] before any request is made
    /// * [`RegistryError::PackageNotFound`] when the registry answers 404
    /// * [`RegistryError::Download`] for network, timeout and decoding failures
    pub fn packument(&self, name: &str) -> Result<Packument> {
        let name = validate_package_name(name)?;
        let url = join_segment(&self.base_url, name)?;

        match Http::json::<Packument>(&url, self.timeout, self.max_metadata_size) {
            Ok(packument) => {
                debug!(
                    "fetched {} ({} versions)",
                    packument.name,
                    packument.versions.len()
                );
                Ok(packument)
            }
            Err(err) if err.is_not_found() => Err(RegistryError::PackageNotFound(name.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Fetches the packument and resolves `version` in one step.
    pub fn manifest(&self, name: &str, version: Option<&str>) -> Result<(Packument, VersionManifest)> {
        let version = validate_version(version)?;
        let packument = self.packument(name)?;
        let manifest = resolve_version(&packument, version)?.clone();
        Ok((packument, manifest))
    }

    pub fn search(&self, params: &SearchParams) -> Result<SearchResults> {
        let url = params.url(&self.base_url)?;
        Ok(Http::json(&url, self.timeout, self.max_metadata_size)?)
    }
}

fn highest_matching<'a>(
    packument: &'a Packument,
    accept: impl Fn(&Version) -> bool,
) -> Option<&'a VersionManifest> {
    packument
        .versions
        .iter()
        .filter_map(|(key, manifest)| Version::parse(key).ok().map(|v| (v, manifest)))
        .filter(|(v, _)| accept(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, manifest)| manifest)
}

/// Translates an npm range into one requirement per `||` alternative.
///
/// npm reads a bare version as exact and a partial one (`1.4`, `1.x`) as an
/// x-range, which `semver` spells with a leading `=`. Comparators are
/// separated by spaces and `a - b` is an inclusive hyphen range.
fn npm_range(range: &str) -> Option<Vec<VersionReq>> {
    range.split("||").map(|alt| npm_comparators(alt.trim())).collect()
}

fn npm_comparators(alt: &str) -> Option<VersionReq> {
    let tokens: Vec<&str> = alt.split_whitespace().collect();

    if let [low, "-", high] = tokens.as_slice() {
        return VersionReq::parse(&format!(">={}, <={}", bare(low), bare(high))).ok();
    }

    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    for token in tokens {
        let split = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(split);
        pending_op.push_str(op);
        if version.is_empty() {
            continue;
        }

        let op = std::mem::take(&mut pending_op);
        let version = bare(version);
        if matches!(version, "*" | "x" | "X") {
            continue;
        }
        let op = if op.is_empty() { "=" } else { op.as_str() };
        comparators.push(format!("{op}{version}"));
    }
    if !pending_op.is_empty() {
        return None;
    }

    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

fn bare(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// Picks the manifest a version specifier refers to.
///
/// Resolution order: no specifier means the `latest` dist-tag; then a
/// dist-tag name; then an exact published version (a leading `v` is
/// ignored); then the highest version satisfying an npm range. A full
/// version that is not published never falls back to a range match.
pub fn resolve_version<'a>(
    packument: &'a Packument,
    requested: Option<&str>,
) -> Result<&'a VersionManifest> {
    let not_found = |version: &str| RegistryError::VersionNotFound {
        name: packument.name.clone(),
        version: version.to_string(),
        tags: packument
            .dist_tags
            .iter()
            .map(|(tag, v)| format!("{tag}={v}"))
            .collect(),
    };

    let Some(requested) = requested else {
        if let Some(manifest) = packument
            .latest()
            .and_then(|latest| packument.versions.get(latest))
        {
            return Ok(manifest);
        }
        return highest_matching(packument, |v| v.pre.is_empty())
            .ok_or_else(|| not_found("latest"));
    };

    if let Some(manifest) = packument
        .dist_tags
        .get(requested)
        .and_then(|tagged| packument.versions.get(tagged))
    {
        return Ok(manifest);
    }

    let exact = bare(requested);
    if let Some(manifest) = packument
        .versions
        .get(requested)
        .or_else(|| packument.versions.get(exact))
    {
        return Ok(manifest);
    }

    if Version::parse(exact).is_ok() {
        return Err(not_found(requested));
    }

    if let Some(reqs) = npm_range(requested) {
        if let Some(manifest) =
            highest_matching(packument, |v| reqs.iter().any(|req| req.matches(v)))
        {
            return Ok(manifest);
        }
    }

    Err(not_found(requested))
}

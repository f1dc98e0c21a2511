use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use documented::{Documented, DocumentedFields};
use npmpeek_utils::{
    bytes::parse_bytes,
    path::{resolve_path, xdg_cache_home, xdg_config_home},
    time::parse_duration,
};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};
use url::Url;

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
    server::{ServerConfig, Transport, DEFAULT_BIND},
    utils::{default_exclude_dirs, default_exclude_patterns, default_include_patterns},
};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_MAX_FILES: usize = 50;
pub const DEFAULT_MAX_FILE_SIZE: &str = "1MiB";
pub const DEFAULT_MAX_TARBALL_SIZE: &str = "100MiB";
pub const DEFAULT_MAX_METADATA_SIZE: &str = "64MiB";
pub const DEFAULT_METADATA_TIMEOUT: &str = "10s";
pub const DEFAULT_DOWNLOAD_TIMEOUT: &str = "30s";
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_SEARCH_MAX: usize = 250;
pub const DEFAULT_POPULAR_QUERY: &str = "keywords:javascript";
pub const DEFAULT_POPULAR_SIZE: usize = 25;
pub const DEFAULT_POPULAR_TTL: &str = "24h";

/// npmpeek configuration
#[derive(Clone, Debug, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Base URL of the npm registry.
    /// Default: https://registry.npmjs.org
    pub registry_url: Option<String>,

    /// Directory where package tarballs are extracted.
    /// Default: $XDG_CACHE_HOME/npmpeek
    pub cache_path: Option<String>,

    /// User-Agent header sent to the registry.
    /// Default: npmpeek/<version>
    pub user_agent: Option<String>,

    /// Maximum number of files returned by a bundled fetch.
    /// Default: 50
    pub max_files: Option<usize>,

    /// Files larger than this are truncated or skipped.
    /// Default: 1MiB
    pub max_file_size: Option<String>,

    /// Downloads larger than this are aborted.
    /// Default: 100MiB
    pub max_tarball_size: Option<String>,

    /// Upper bound for a package metadata document.
    /// Default: 64MiB
    pub max_metadata_size: Option<String>,

    /// Timeout for metadata and search requests.
    /// Default: 10s
    pub metadata_timeout: Option<String>,

    /// Timeout for tarball downloads.
    /// Default: 30s
    pub download_timeout: Option<String>,

    /// Number of search results returned when no size is requested.
    /// Default: 20
    pub search_limit: Option<usize>,

    /// Upper bound for a requested search size.
    /// Default: 250
    pub search_max: Option<usize>,

    /// Search query used for the popular packages digest.
    /// Default: keywords:javascript
    pub popular_query: Option<String>,

    /// Number of packages listed in the popular packages digest.
    /// Default: 25
    pub popular_size: Option<usize>,

    /// How long the popular packages digest is reused before refreshing.
    /// Default: 24h
    pub popular_ttl: Option<String>,

    /// File-name globs included in a bundled fetch.
    pub include_patterns: Option<Vec<String>>,

    /// File-name globs excluded from a bundled fetch.
    /// Default: ["*.map", "*.min.js", "*.min.css"]
    pub exclude_patterns: Option<Vec<String>>,

    /// Directory names skipped while collecting files.
    pub exclude_dirs: Option<Vec<String>>,

    /// Settings for `npmpeek serve`.
    #[serde(default)]
    pub server: ServerConfig,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("NPMPEEK_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("npmpeek").join("config.toml"),
    })
});

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_path_buf()
}

pub fn set_config_path(path: PathBuf) {
    *CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner) = path;
}

pub fn init() -> Result<()> {
    let config = Config::new()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
}

pub fn get_config() -> Config {
    if let Some(config) = CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return config.clone();
    }

    let mut guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(Config::default_config).clone()
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            registry_url: Some(DEFAULT_REGISTRY_URL.to_string()),
            cache_path: None,
            user_agent: None,
            max_files: Some(DEFAULT_MAX_FILES),
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE.to_string()),
            max_tarball_size: Some(DEFAULT_MAX_TARBALL_SIZE.to_string()),
            max_metadata_size: Some(DEFAULT_MAX_METADATA_SIZE.to_string()),
            metadata_timeout: Some(DEFAULT_METADATA_TIMEOUT.to_string()),
            download_timeout: Some(DEFAULT_DOWNLOAD_TIMEOUT.to_string()),
            search_limit: Some(DEFAULT_SEARCH_LIMIT),
            search_max: Some(DEFAULT_SEARCH_MAX),
            popular_query: Some(DEFAULT_POPULAR_QUERY.to_string()),
            popular_size: Some(DEFAULT_POPULAR_SIZE),
            popular_ttl: Some(DEFAULT_POPULAR_TTL.to_string()),
            include_patterns: Some(default_include_patterns()),
            exclude_patterns: Some(default_exclude_patterns()),
            exclude_dirs: Some(default_exclude_dirs()),
            server: ServerConfig {
                transport: Some(Transport::Stdio),
                bind: Some(DEFAULT_BIND.to_string()),
                auth_token: None,
            },
        }
    }

    /// Loads the configuration file at [`CONFIG_PATH`], falling back to
    /// defaults when it does not exist.
    pub fn new() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loading configuration from {}", path.display());
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default_config(),
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset fields with defaults and validates the rest.
    pub fn resolve(&mut self) -> Result<()> {
        let registry = self
            .registry_url
            .get_or_insert_with(|| DEFAULT_REGISTRY_URL.to_string());
        validate_registry_url(registry)?;

        if *self.max_files.get_or_insert(DEFAULT_MAX_FILES) == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_files",
                reason: "must be at least 1".into(),
            });
        }
        if *self.search_max.get_or_insert(DEFAULT_SEARCH_MAX) == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search_max",
                reason: "must be at least 1".into(),
            });
        }
        if *self.popular_size.get_or_insert(DEFAULT_POPULAR_SIZE) == 0 {
            return Err(ConfigError::InvalidValue {
                field: "popular_size",
                reason: "must be at least 1".into(),
            });
        }
        self.search_limit.get_or_insert(DEFAULT_SEARCH_LIMIT);
        self.popular_query
            .get_or_insert_with(|| DEFAULT_POPULAR_QUERY.to_string());

        for (field, value, default) in [
            ("max_file_size", &mut self.max_file_size, DEFAULT_MAX_FILE_SIZE),
            (
                "max_tarball_size",
                &mut self.max_tarball_size,
                DEFAULT_MAX_TARBALL_SIZE,
            ),
            (
                "max_metadata_size",
                &mut self.max_metadata_size,
                DEFAULT_MAX_METADATA_SIZE,
            ),
        ] {
            let value = value.get_or_insert_with(|| default.to_string());
            if parse_bytes(value)? == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".into(),
                });
            }
        }

        for (field, value, default) in [
            (
                "metadata_timeout",
                &mut self.metadata_timeout,
                DEFAULT_METADATA_TIMEOUT,
            ),
            (
                "download_timeout",
                &mut self.download_timeout,
                DEFAULT_DOWNLOAD_TIMEOUT,
            ),
            ("popular_ttl", &mut self.popular_ttl, DEFAULT_POPULAR_TTL),
        ] {
            let value = value.get_or_insert_with(|| default.to_string());
            if parse_duration(value)?.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".into(),
                });
            }
        }

        if self.include_patterns.is_none() {
            self.include_patterns = Some(default_include_patterns());
        }
        if self.exclude_patterns.is_none() {
            self.exclude_patterns = Some(default_exclude_patterns());
        }
        if self.exclude_dirs.is_none() {
            self.exclude_dirs = Some(default_exclude_dirs());
        }

        self.server.transport.get_or_insert(Transport::Stdio);
        self.server
            .bind
            .get_or_insert_with(|| DEFAULT_BIND.to_string());

        Ok(())
    }

    /// Registry base URL without a trailing slash.
    pub fn registry_url(&self) -> String {
        env_override("NPMPEEK_REGISTRY")
            .or_else(|| self.registry_url.clone())
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn get_cache_path(&self) -> Result<PathBuf> {
        if let Some(env_path) = env_override("NPMPEEK_CACHE") {
            return Ok(resolve_path(&env_path)?);
        }
        if let Some(cache_path) = &self.cache_path {
            return Ok(resolve_path(cache_path)?);
        }
        Ok(xdg_cache_home().join("npmpeek"))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("npmpeek/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn max_files(&self) -> usize {
        self.max_files.unwrap_or(DEFAULT_MAX_FILES).max(1)
    }

    pub fn max_file_size(&self) -> u64 {
        size_or_default(self.max_file_size.as_deref(), DEFAULT_MAX_FILE_SIZE)
    }

    pub fn max_tarball_size(&self) -> u64 {
        size_or_default(self.max_tarball_size.as_deref(), DEFAULT_MAX_TARBALL_SIZE)
    }

    pub fn max_metadata_size(&self) -> u64 {
        size_or_default(
            self.max_metadata_size.as_deref(),
            DEFAULT_MAX_METADATA_SIZE,
        )
    }

    pub fn metadata_timeout(&self) -> Duration {
        duration_or_default(self.metadata_timeout.as_deref(), DEFAULT_METADATA_TIMEOUT)
    }

    pub fn download_timeout(&self) -> Duration {
        duration_or_default(self.download_timeout.as_deref(), DEFAULT_DOWNLOAD_TIMEOUT)
    }

    pub fn popular_ttl(&self) -> Duration {
        duration_or_default(self.popular_ttl.as_deref(), DEFAULT_POPULAR_TTL)
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, self.search_max())
    }

    pub fn search_max(&self) -> usize {
        self.search_max.unwrap_or(DEFAULT_SEARCH_MAX).max(1)
    }

    pub fn popular_query(&self) -> &str {
        self.popular_query.as_deref().unwrap_or(DEFAULT_POPULAR_QUERY)
    }

    pub fn popular_size(&self) -> usize {
        self.popular_size.unwrap_or(DEFAULT_POPULAR_SIZE).max(1)
    }

    pub fn include_patterns(&self) -> Vec<String> {
        self.include_patterns
            .clone()
            .unwrap_or_else(default_include_patterns)
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        self.exclude_patterns
            .clone()
            .unwrap_or_else(default_exclude_patterns)
    }

    pub fn exclude_dirs(&self) -> Vec<String> {
        self.exclude_dirs.clone().unwrap_or_else(default_exclude_dirs)
    }

    pub fn transport(&self) -> Result<Transport> {
        match env_override("NPMPEEK_TRANSPORT") {
            Some(value) => value.parse(),
            None => Ok(self.server.transport.unwrap_or_default()),
        }
    }

    pub fn bind(&self) -> String {
        env_override("NPMPEEK_BIND")
            .or_else(|| self.server.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn auth_token(&self) -> Option<String> {
        env_override("NPMPEEK_AUTH_TOKEN").or_else(|| {
            self.server
                .auth_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(String::from)
        })
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        if let Some(server_table) = doc.get_mut("server").and_then(|i| i.as_table_mut()) {
            annotate_toml_table::<ServerConfig>(server_table, false)?;
        }

        Ok(doc)
    }
}

fn validate_registry_url(value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|err| ConfigError::InvalidRegistryUrl {
        url: value.to_string(),
        reason: err.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidRegistryUrl {
            url: value.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}

fn size_or_default(value: Option<&str>, default: &str) -> u64 {
    value
        .and_then(|v| parse_bytes(v).ok())
        .or_else(|| parse_bytes(default).ok())
        .unwrap_or_default()
}

fn duration_or_default(value: Option<&str>, default: &str) -> Duration {
    value
        .and_then(|v| parse_duration(v).ok())
        .or_else(|| parse_duration(default).ok())
        .unwrap_or_default()
}

/// Writes an annotated default configuration to [`CONFIG_PATH`] and returns
/// where it was written.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, annotated_doc.to_string())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}

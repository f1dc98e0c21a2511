use npmpeek_config::config::Config;
use npmpeek_registry::RegistryClient;

use crate::{cache::TtlCell, filter::FileFilter};

/// Shared state for all operations: configuration, the registry client and
/// the memoized popular packages digest.
pub struct NpmContext {
    config: Config,
    registry: RegistryClient,
    filter: FileFilter,
    popular: TtlCell<String>,
}

impl NpmContext {
    pub fn new(config: Config) -> Self {
        let registry = RegistryClient::from_config(&config);
        let filter = FileFilter::from_config(&config);
        let popular = TtlCell::new(config.popular_ttl());

        Self {
            config,
            registry,
            filter,
            popular,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    pub fn popular(&self) -> &TtlCell<String> {
        &self.popular
    }
}

use std::collections::HashSet;

use fast_glob::glob_match;
use npmpeek_config::config::Config;

/// Decides which files of an extracted package are worth returning in a
/// bundled fetch. Globs match the lowercased file name.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Vec<String>,
    exclude: Vec<String>,
    exclude_dirs: HashSet<String>,
}

impl FileFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>, exclude_dirs: Vec<String>) -> Self {
        Self {
            include: include.iter().map(|g| g.to_lowercase()).collect(),
            exclude: exclude.iter().map(|g| g.to_lowercase()).collect(),
            exclude_dirs: exclude_dirs.into_iter().collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.include_patterns(),
            config.exclude_patterns(),
            config.exclude_dirs(),
        )
    }

    pub fn skips_dir(&self, name: &str) -> bool {
        self.exclude_dirs.contains(name)
    }

    /// Whether the `/`-separated relative path passes the directory deny-list
    /// and the include/exclude globs.
    pub fn matches(&self, relative: &str) -> bool {
        let mut components: Vec<&str> = relative.split('/').collect();
        let Some(file_name) = components.pop() else {
            return false;
        };
        if components.iter().any(|dir| self.skips_dir(dir)) {
            return false;
        }

        let file_name = file_name.to_lowercase();
        self.include.iter().any(|g| glob_match(g, &file_name))
            && !self.exclude.iter().any(|g| glob_match(g, &file_name))
    }
}

//! Validation of package names, version specifiers and search queries.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RegistryError, Result};

pub const MAX_NAME_LEN: usize = 214;
pub const MAX_VERSION_LEN: usize = 256;
pub const MAX_QUERY_LEN: usize = 256;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:@[a-z0-9\-~][a-z0-9\-._~]*/)?[a-z0-9\-~][a-z0-9\-._~]*$")
        .expect("package name pattern is valid")
});

fn invalid_name(name: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidName {
        name: name.escape_debug().to_string(),
        reason: reason.to_string(),
    }
}

/// Checks `name` against the npm naming rules and returns it unchanged.
pub fn validate_package_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(invalid_name(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid_name(
            name,
            &format!("name is longer than {MAX_NAME_LEN} characters"),
        ));
    }
    if name.contains("..") {
        return Err(invalid_name(name, "name contains `..`"));
    }
    if name.contains(['\0', '\n', '\r']) {
        return Err(invalid_name(name, "name contains a control character"));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(invalid_name(
            name,
            "only lowercase letters, digits, `-`, `.`, `_`, `~` and one `@scope/` prefix are allowed",
        ));
    }

    Ok(name)
}

/// Normalizes an optional version specifier. Blank input means "latest".
pub fn validate_version(version: Option<&str>) -> Result<Option<&str>> {
    let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if version.len() > MAX_VERSION_LEN {
        return Err(RegistryError::InvalidVersion {
            version: version.chars().take(32).collect::<String>() + "...",
            reason: format!("longer than {MAX_VERSION_LEN} characters"),
        });
    }
    if version.chars().any(char::is_control) {
        return Err(RegistryError::InvalidVersion {
            version: version.escape_debug().to_string(),
            reason: "contains a control character".into(),
        });
    }

    Ok(Some(version))
}

/// Trims a search query and checks its length.
pub fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(RegistryError::InvalidQuery("query is empty".into()));
    }
    if query.chars().count() > MAX_QUERY_LEN {
        return Err(RegistryError::InvalidQuery(format!(
            "query is longer than {MAX_QUERY_LEN} characters"
        )));
    }
    Ok(query)
}

/// Directory-safe form of a package name: `@scope/name` becomes `scope+name`.
pub fn name_slug(name: &str) -> String {
    name.trim_start_matches('@').replace('/', "+")
}

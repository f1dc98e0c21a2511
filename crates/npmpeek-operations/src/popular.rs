use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use npmpeek_registry::search::{SearchParams, SearchResults};
use tracing::info;

use crate::{context::NpmContext, error::Result};

/// Renders the popular packages digest as markdown.
pub fn render_digest(query: &str, results: &SearchResults, updated: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Popular npm packages");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Last updated: {}",
        updated.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "Ranked by popularity for `{query}`.");

    if results.objects.is_empty() {
        let _ = write!(out, "\nNo packages returned by the registry.");
        return out;
    }

    let _ = writeln!(out);
    for (idx, object) in results.objects.iter().enumerate() {
        let package = &object.package;
        let _ = write!(out, "{}. **{}@{}**", idx + 1, package.name, package.version);
        if let Some(description) = package.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, " - {description}");
        }
        let link = package
            .links
            .npm
            .clone()
            .unwrap_or_else(|| format!("https://www.npmjs.com/package/{}", package.name));
        let _ = writeln!(out, "\n   {link}");
    }

    out
}

/// The popular packages digest, refreshed from the registry once the cached
/// copy is older than the configured TTL.
pub fn popular_packages(ctx: &NpmContext) -> Result<String> {
    ctx.popular().get_or_refresh(|| {
        let config = ctx.config();
        let params =
            SearchParams::new(config.popular_query(), config.popular_size()).popularity_only();
        let results = ctx.registry().search(&params)?;
        info!(
            "refreshed popular packages digest ({} entries)",
            results.objects.len()
        );
        Ok(render_digest(config.popular_query(), &results, Utc::now()))
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_render_digest() {
        let results: SearchResults = serde_json::from_value(json!({
            "objects": [
                { "package": { "name": "react", "version": "18.2.0", "description": "UI library", "links": {} } },
                { "package": { "name": "lodash", "version": "4.17.21", "links": { "npm": "https://npm.example/lodash" } } }
            ],
            "total": 2
        }))
        .unwrap();
        let updated = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();

        let digest = render_digest("keywords:javascript", &results, updated);
        assert!(digest.starts_with("# Popular npm packages\n\nLast updated: 2024-03-01 08:30:00 UTC\n"));
        assert!(digest.contains(
            "1. **react@18.2.0** - UI library\n   https://www.npmjs.com/package/react\n"
        ));
        assert!(digest.contains("2. **lodash@4.17.21**\n   https://npm.example/lodash\n"));
    }

    #[test]
    fn test_render_empty_digest() {
        let digest = render_digest("x", &SearchResults::default(), Utc::now());
        assert!(digest.ends_with("No packages returned by the registry."));
    }
}

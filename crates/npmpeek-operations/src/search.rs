use std::fmt;

use npmpeek_registry::{
    name::validate_query,
    search::{SearchObject, SearchParams},
};
use tracing::debug;

use crate::{context::NpmContext, error::Result};

/// One page of search results together with the query that produced it.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub query: String,
    pub from: usize,
    pub total: u64,
    pub objects: Vec<SearchObject>,
}

fn npm_link(object: &SearchObject) -> String {
    object
        .package
        .links
        .npm
        .clone()
        .unwrap_or_else(|| format!("https://www.npmjs.com/package/{}", object.package.name))
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.objects.is_empty() {
            return write!(f, "No packages found for \"{}\".", self.query);
        }

        write!(
            f,
            "# Search results for \"{}\"\nShowing {}-{} of {} packages\n",
            self.query,
            self.from.saturating_add(1),
            self.from.saturating_add(self.objects.len()),
            self.total
        )?;

        for (idx, object) in self.objects.iter().enumerate() {
            let package = &object.package;
            let rank = self.from.saturating_add(idx).saturating_add(1);
            write!(f, "\n{}. {}@{}\n", rank, package.name, package.version)?;
            if let Some(description) = package.description.as_deref().filter(|d| !d.is_empty()) {
                writeln!(f, "   {description}")?;
            }
            if !package.keywords.is_empty() {
                writeln!(f, "   Keywords: {}", package.keywords.join(", "))?;
            }

            let detail = &object.score.detail;
            writeln!(
                f,
                "   Score: {:.2} (quality {:.2}, popularity {:.2}, maintenance {:.2})",
                object.score.final_score, detail.quality, detail.popularity, detail.maintenance
            )?;
            writeln!(f, "   {}", npm_link(object))?;
        }
        Ok(())
    }
}

/// Searches the registry. `size` defaults to the configured search limit
/// and is capped at the configured maximum.
pub fn search_packages(
    ctx: &NpmContext,
    query: &str,
    size: Option<usize>,
    from: Option<usize>,
) -> Result<SearchReport> {
    let query = validate_query(query)?;
    let config = ctx.config();
    let size = size
        .unwrap_or_else(|| config.search_limit())
        .clamp(1, config.search_max());
    let from = from.unwrap_or(0);

    let params = SearchParams::new(query, size).offset(from);
    let results = ctx.registry().search(&params)?;
    debug!(
        "search \"{}\" returned {} of {} results",
        query,
        results.objects.len(),
        results.total
    );

    Ok(SearchReport {
        query: query.to_string(),
        from,
        total: results.total,
        objects: results.objects,
    })
}

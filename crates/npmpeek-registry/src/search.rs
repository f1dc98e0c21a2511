//! Registry search endpoint (`/-/v1/search`).

use npmpeek_dl::utils::with_query;
use serde::{Deserialize, Serialize};

use crate::{error::Result, name::validate_query};

pub const SEARCH_PATH: &str = "/-/v1/search";

/// Query parameters for a search request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub text: String,
    pub size: usize,
    pub from: usize,
    pub quality: Option<f64>,
    pub popularity: Option<f64>,
    pub maintenance: Option<f64>,
}

impl SearchParams {
    pub fn new(text: impl Into<String>, size: usize) -> Self {
        Self {
            text: text.into(),
            size,
            ..Default::default()
        }
    }

    pub fn offset(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Ranks purely by popularity.
    pub fn popularity_only(mut self) -> Self {
        self.quality = Some(0.0);
        self.popularity = Some(1.0);
        self.maintenance = Some(0.0);
        self
    }

    /// Full request URL against `base_url`. The query text is validated first.
    pub fn url(&self, base_url: &str) -> Result<String> {
        let text = validate_query(&self.text)?;

        let mut pairs = vec![
            ("text", text.to_string()),
            ("size", self.size.to_string()),
            ("from", self.from.to_string()),
        ];
        for (key, weight) in [
            ("quality", self.quality),
            ("popularity", self.popularity),
            ("maintenance", self.maintenance),
        ] {
            if let Some(weight) = weight {
                pairs.push((key, weight.to_string()));
            }
        }

        Ok(with_query(base_url, SEARCH_PATH, &pairs)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResults {
    #[serde(default)]
    pub objects: Vec<SearchObject>,

    #[serde(default)]
    pub total: u64,

    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchObject {
    pub package: SearchPackage,

    #[serde(default)]
    pub score: Score,

    #[serde(default, rename = "searchScore")]
    pub search_score: Option<f64>,

    #[serde(default)]
    pub downloads: Option<Downloads>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchPackage {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default)]
    pub links: Links,

    #[serde(default)]
    pub publisher: Option<Publisher>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Links {
    pub npm: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub bugs: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Publisher {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Score {
    #[serde(default, rename = "final")]
    pub final_score: f64,

    #[serde(default)]
    pub detail: ScoreDetail,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScoreDetail {
    #[serde(default)]
    pub quality: f64,

    #[serde(default)]
    pub popularity: f64,

    #[serde(default)]
    pub maintenance: f64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Downloads {
    #[serde(default)]
    pub monthly: Option<u64>,

    #[serde(default)]
    pub weekly: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_search_url() {
        let url = SearchParams::new("react state", 10)
            .offset(20)
            .url("https://registry.npmjs.org/")
            .unwrap();
        assert_eq!(
            url,
            "https://registry.npmjs.org/-/v1/search?text=react+state&size=10&from=20"
        );
    }

    #[test]
    fn test_search_url_with_weights() {
        let url = SearchParams::new("keywords:javascript", 25)
            .popularity_only()
            .url("https://registry.npmjs.org")
            .unwrap();
        assert!(url.contains("text=keywords%3Ajavascript"));
        assert!(url.ends_with("&quality=0&popularity=1&maintenance=0"));
    }

    #[test]
    fn test_search_url_rejects_empty_query() {
        assert!(matches!(
            SearchParams::new("  ", 10).url("https://registry.npmjs.org"),
            Err(RegistryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_search_results_deserialize() {
        let body = r#"{
            "objects": [{
                "package": {
                    "name": "react",
                    "version": "18.2.0",
                    "description": "React is a JavaScript library for building user interfaces.",
                    "keywords": ["react"],
                    "date": "2022-06-14T19:46:38.369Z",
                    "links": { "npm": "https://www.npmjs.com/package/react" },
                    "publisher": { "username": "gnoff" }
                },
                "score": { "final": 0.9, "detail": { "quality": 0.8, "popularity": 1.0, "maintenance": 0.7 } },
                "searchScore": 100000.3,
                "downloads": { "monthly": 1000, "weekly": 250 }
            }],
            "total": 1234,
            "time": "Wed Jan 01 2025 00:00:00 GMT+0000"
        }"#;

        let results: SearchResults = serde_json::from_str(body).unwrap();
        assert_eq!(results.total, 1234);
        let object = &results.objects[0];
        assert_eq!(object.package.name, "react");
        assert_eq!(object.score.detail.popularity, 1.0);
        assert_eq!(object.downloads.as_ref().and_then(|d| d.weekly), Some(250));
        assert_eq!(
            object.package.links.npm.as_deref(),
            Some("https://www.npmjs.com/package/react")
        );
    }
}

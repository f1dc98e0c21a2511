#![allow(dead_code)]

use flate2::{write::GzEncoder, Compression};
use mockito::{Matcher, Mock, Server, ServerGuard};
use npmpeek_config::config::Config;
use npmpeek_operations::NpmContext;
use serde_json::{json, Value};
use tempfile::TempDir;

pub const SEARCH_PATH: &str = "/-/v1/search";

/// A fake registry. Mocks created through it live as long as the registry.
pub struct FakeRegistry {
    server: ServerGuard,
    pub base_url: String,
    mocks: Vec<Mock>,
}

impl FakeRegistry {
    pub fn start() -> Self {
        let server = Server::new();
        let base_url = server.url();
        Self {
            server,
            base_url,
            mocks: Vec::new(),
        }
    }

    /// Direct access for tests that assert on hit counts.
    pub fn server(&mut self) -> &mut ServerGuard {
        &mut self.server
    }

    pub fn json(&mut self, path: &str, status: usize, body: &Value) {
        let mock = self
            .server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create();
        self.mocks.push(mock);
    }

    /// Answers `path` like the registry does for unknown packages.
    pub fn missing(&mut self, path: &str) {
        self.json(path, 404, &json!({ "error": "Not found" }));
    }

    /// Serves search results for any query string.
    pub fn search_results(&mut self, status: usize, body: &Value) -> Mock {
        self.server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create()
    }

    /// Publishes one version of `name` with the given files. The packument is
    /// served at `/{encoded name}` and the tarball under `/tarballs/`.
    pub fn publish(&mut self, name: &str, version: &str, files: &[(&str, &[u8])], extra: Value) {
        let tarball = build_tarball(files);
        let slug = name.replace('/', "%2F");
        let tarball_path = format!("/tarballs/{}-{version}.tgz", name.replace('/', "-"));

        let mut manifest = json!({
            "name": name,
            "version": version,
            "dist": {
                "tarball": format!("{}{tarball_path}", self.base_url),
                "integrity": npmpeek_utils::integrity::integrity_of(&tarball),
                "fileCount": files.len(),
            }
        });
        if let (Some(target), Value::Object(extra)) = (manifest.as_object_mut(), extra) {
            for (key, value) in extra {
                if key == "dist" {
                    if let (Some(dist), Value::Object(overrides)) =
                        (target.get_mut("dist").and_then(Value::as_object_mut), value)
                    {
                        dist.extend(overrides);
                    }
                } else {
                    target.insert(key, value);
                }
            }
        }

        let packument = json!({
            "name": name,
            "dist-tags": { "latest": version },
            "versions": { version: manifest },
            "time": { version: "2024-01-02T03:04:05.000Z" }
        });

        self.json(&format!("/{slug}"), 200, &packument);
        let mock = self
            .server
            .mock("GET", tarball_path.as_str())
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(tarball)
            .create();
        self.mocks.push(mock);
    }
}

/// A gzip tarball with every file under `package/`, like `npm pack` makes.
pub fn build_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("package/{path}"), *data)
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

pub fn context(registry: &FakeRegistry, cache: &TempDir, tweak: impl FnOnce(&mut Config)) -> NpmContext {
    let mut config = Config {
        registry_url: Some(registry.base_url.clone()),
        cache_path: Some(cache.path().to_string_lossy().into_owned()),
        ..Config::default_config()
    };
    tweak(&mut config);
    NpmContext::new(config)
}

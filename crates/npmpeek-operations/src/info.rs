use std::{collections::BTreeMap, fmt};

use npmpeek_registry::{package::Person, Packument, VersionManifest};
use npmpeek_utils::bytes::format_bytes;

use crate::{context::NpmContext, error::Result};

/// Counts of each dependency kind declared by a version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyCounts {
    pub dependencies: usize,
    pub dev: usize,
    pub peer: usize,
    pub optional: usize,
}

/// Normalized metadata summary for one version of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub latest: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub repository: Option<String>,
    pub author: Option<String>,
    pub keywords: Vec<String>,
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
    pub bin: Vec<(String, String)>,
    pub dependencies: DependencyCounts,
    pub engines: BTreeMap<String, String>,
    pub deprecated: Option<String>,
    pub published: Option<String>,
    pub tarball: Option<String>,
    pub shasum: Option<String>,
    pub integrity: Option<String>,
    pub file_count: Option<u64>,
    pub unpacked_size: Option<u64>,
    pub version_count: usize,
    pub dist_tags: BTreeMap<String, String>,
    pub maintainers: usize,
}

impl PackageInfo {
    /// Merges a version manifest with the package-level fields it may lack.
    pub fn new(packument: &Packument, manifest: &VersionManifest) -> Self {
        let name = if manifest.name.is_empty() {
            packument.name.clone()
        } else {
            manifest.name.clone()
        };

        Self {
            latest: packument.latest().map(String::from),
            description: manifest
                .description
                .clone()
                .or_else(|| packument.description.clone()),
            license: manifest
                .license_name()
                .map(String::from)
                .or_else(|| packument.license.clone()),
            homepage: manifest
                .homepage
                .clone()
                .or_else(|| packument.homepage.clone()),
            repository: manifest
                .repository
                .clone()
                .or_else(|| packument.repository.clone()),
            author: manifest
                .author
                .as_ref()
                .or(packument.author.as_ref())
                .map(Person::to_string),
            keywords: if manifest.keywords.is_empty() {
                packument.keywords.clone()
            } else {
                manifest.keywords.clone()
            },
            main: manifest.main.clone(),
            module: manifest.module.clone(),
            types: manifest.type_definitions().map(String::from),
            bin: manifest.bin_commands(),
            dependencies: DependencyCounts {
                dependencies: manifest.dependencies.len(),
                dev: manifest.dev_dependencies.len(),
                peer: manifest.peer_dependencies.len(),
                optional: manifest.optional_dependencies.len(),
            },
            engines: manifest.engines.clone(),
            deprecated: manifest.deprecated.clone(),
            published: packument.published_at(&manifest.version).map(String::from),
            tarball: manifest.dist.tarball.clone(),
            shasum: manifest.dist.shasum.clone(),
            integrity: manifest.dist.integrity.clone(),
            file_count: manifest.dist.file_count,
            unpacked_size: manifest.dist.unpacked_size,
            version_count: packument.versions.len(),
            dist_tags: packument.dist_tags.clone(),
            maintainers: packument.maintainers.len(),
            version: manifest.version.clone(),
            name,
        }
    }
}

fn line(f: &mut fmt::Formatter<'_>, label: &str, value: Option<&str>) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "{label}: {value}"),
        None => Ok(()),
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}@{}", self.name, self.version)?;
        if let Some(deprecated) = &self.deprecated {
            writeln!(f, "DEPRECATED: {deprecated}")?;
        }
        line(f, "Description", self.description.as_deref())?;

        match &self.latest {
            Some(latest) if *latest != self.version => {
                writeln!(f, "Version: {} (latest: {latest})", self.version)?;
            }
            Some(_) => writeln!(f, "Version: {} (latest)", self.version)?,
            None => writeln!(f, "Version: {}", self.version)?,
        }
        line(f, "Published", self.published.as_deref())?;
        line(f, "License", self.license.as_deref())?;
        line(f, "Homepage", self.homepage.as_deref())?;
        line(f, "Repository", self.repository.as_deref())?;
        line(f, "Author", self.author.as_deref())?;
        if !self.keywords.is_empty() {
            writeln!(f, "Keywords: {}", self.keywords.join(", "))?;
        }

        writeln!(f, "\n## Entry points")?;
        line(f, "Main", Some(self.main.as_deref().unwrap_or("index.js")))?;
        line(f, "Module", self.module.as_deref())?;
        line(f, "Types", self.types.as_deref())?;
        for (command, target) in &self.bin {
            writeln!(f, "Bin: {command} -> {target}")?;
        }

        let deps = &self.dependencies;
        writeln!(f, "\n## Dependencies")?;
        writeln!(
            f,
            "{} dependencies, {} dev, {} peer, {} optional",
            deps.dependencies, deps.dev, deps.peer, deps.optional
        )?;
        if !self.engines.is_empty() {
            let engines: Vec<String> = self
                .engines
                .iter()
                .map(|(engine, range)| format!("{engine} {range}"))
                .collect();
            writeln!(f, "Engines: {}", engines.join(", "))?;
        }

        writeln!(f, "\n## Distribution")?;
        line(f, "Tarball", self.tarball.as_deref())?;
        line(f, "Shasum", self.shasum.as_deref())?;
        line(f, "Integrity", self.integrity.as_deref())?;
        if let Some(count) = self.file_count {
            writeln!(f, "Files: {count}")?;
        }
        if let Some(size) = self.unpacked_size {
            writeln!(f, "Unpacked size: {}", format_bytes(size, 1))?;
        }

        writeln!(f, "\n## Registry")?;
        writeln!(f, "Published versions: {}", self.version_count)?;
        if !self.dist_tags.is_empty() {
            let tags: Vec<String> = self
                .dist_tags
                .iter()
                .map(|(tag, version)| format!("{tag}={version}"))
                .collect();
            writeln!(f, "Dist-tags: {}", tags.join(", "))?;
        }
        write!(f, "Maintainers: {}", self.maintainers)
    }
}

/// Resolves `version` and summarizes its metadata. Nothing is downloaded
/// besides the registry document.
pub fn get_package_info(
    ctx: &NpmContext,
    name: &str,
    version: Option<&str>,
) -> Result<PackageInfo> {
    let (packument, manifest) = ctx.registry().manifest(name, version)?;
    Ok(PackageInfo::new(&packument, &manifest))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn packument() -> Packument {
        serde_json::from_value(json!({
            "name": "left-pad",
            "description": "String left pad",
            "dist-tags": { "latest": "1.3.0", "next": "2.0.0-rc.1" },
            "license": "WTFPL",
            "maintainers": [{ "name": "a" }, "b <b@example.com>"],
            "time": { "1.3.0": "2018-04-09T01:18:59.000Z", "modified": "2022-06-19T00:00:00.000Z" },
            "versions": {
                "1.2.0": { "name": "left-pad", "version": "1.2.0" },
                "1.3.0": {
                    "name": "left-pad",
                    "version": "1.3.0",
                    "main": "index.js",
                    "typings": "index.d.ts",
                    "bin": "./cli.js",
                    "license": { "type": "WTFPL" },
                    "author": "azer",
                    "keywords": ["leftpad", "pad"],
                    "dependencies": { "a": "^1.0.0" },
                    "devDependencies": { "tape": "*", "benchmark": "*" },
                    "engines": { "node": ">=4" },
                    "deprecated": "use String.prototype.padStart()",
                    "dist": {
                        "tarball": "https://registry.example/left-pad/-/left-pad-1.3.0.tgz",
                        "shasum": "5b8a3a7765dfe001261dde915589e782f8c94d1e",
                        "fileCount": 9,
                        "unpackedSize": 9744
                    }
                },
                "2.0.0-rc.1": { "name": "left-pad", "version": "2.0.0-rc.1" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_info_from_manifest() {
        let packument = packument();
        let info = PackageInfo::new(&packument, &packument.versions["1.3.0"]);

        assert_eq!(info.latest.as_deref(), Some("1.3.0"));
        assert_eq!(info.description.as_deref(), Some("String left pad"));
        assert_eq!(info.license.as_deref(), Some("WTFPL"));
        assert_eq!(info.types.as_deref(), Some("index.d.ts"));
        assert_eq!(info.bin, vec![("left-pad".into(), "./cli.js".into())]);
        assert_eq!(
            info.dependencies,
            DependencyCounts {
                dependencies: 1,
                dev: 2,
                peer: 0,
                optional: 0
            }
        );
        assert_eq!(info.published.as_deref(), Some("2018-04-09T01:18:59.000Z"));
        assert_eq!(info.version_count, 3);
        assert_eq!(info.maintainers, 2);
    }

    #[test]
    fn test_info_display() {
        let packument = packument();
        let text = PackageInfo::new(&packument, &packument.versions["1.3.0"]).to_string();

        assert!(text.starts_with("# left-pad@1.3.0\nDEPRECATED: use String.prototype.padStart()\n"));
        assert!(text.contains("Version: 1.3.0 (latest)\n"));
        assert!(text.contains("Author: azer\n"));
        assert!(text.contains("Bin: left-pad -> ./cli.js\n"));
        assert!(text.contains("1 dependencies, 2 dev, 0 peer, 0 optional\n"));
        assert!(text.contains("Engines: node >=4\n"));
        assert!(text.contains("Unpacked size: 9.5 KiB\n"));
        assert!(text.contains("Dist-tags: latest=1.3.0, next=2.0.0-rc.1\n"));
        assert!(text.ends_with("Maintainers: 2"));
    }

    #[test]
    fn test_info_for_older_version() {
        let packument = packument();
        let info = PackageInfo::new(&packument, &packument.versions["1.2.0"]);
        let text = info.to_string();

        assert!(text.contains("Version: 1.2.0 (latest: 1.3.0)\n"));
        assert!(text.contains("License: WTFPL\n"));
        assert!(text.contains("Main: index.js\n"));
        assert!(!text.contains("Published:"));
    }
}

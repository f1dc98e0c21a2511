use std::{fmt, fs, io::ErrorKind as IoErrorKind, path::Path};

use npmpeek_registry::{name::validate_package_name, VersionManifest};
use npmpeek_utils::{
    bytes::format_bytes,
    error::{FileSystemError, PathError},
    fs::{is_binary, read_text_prefix, walk_files, FileEntry},
    path::{normalize_relative, resolve_within},
};
use tracing::debug;

use crate::{
    context::NpmContext,
    error::{OperationError, Result},
    workspace::{prepare_package, ExtractedPackage},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBody {
    Text {
        content: String,
        /// Set to the size limit when the content was cut off there.
        truncated_at: Option<u64>,
    },
    Binary,
    TooLarge {
        limit: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub size: u64,
    pub body: FileBody,
}

impl fmt::Display for FetchedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.path)?;
        match &self.body {
            FileBody::Text {
                content,
                truncated_at,
            } => {
                write!(f, "{content}")?;
                if let Some(limit) = truncated_at {
                    if !content.ends_with('\n') {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "\n[truncated: showing the first {} of {}]",
                        format_bytes(*limit, 1),
                        format_bytes(self.size, 1)
                    )?;
                }
                Ok(())
            }
            FileBody::Binary => {
                write!(
                    f,
                    "[binary file, {}; content not shown]",
                    format_bytes(self.size, 1)
                )
            }
            FileBody::TooLarge {
                limit,
            } => {
                write!(
                    f,
                    "[skipped (too large): {} exceeds the {} limit]",
                    format_bytes(self.size, 1),
                    format_bytes(*limit, 1)
                )
            }
        }
    }
}

/// Selected files of a package, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBundle {
    pub package: String,
    pub files: Vec<FetchedFile>,
    /// Number of files that passed the filter, shown or not.
    pub matched: usize,
}

impl FileBundle {
    pub fn remaining(&self) -> usize {
        self.matched.saturating_sub(self.files.len())
    }
}

impl fmt::Display for FileBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.files.is_empty() {
            return write!(
                f,
                "No source files matched in {}. Use list_package_files to see every file.",
                self.package
            );
        }

        writeln!(f, "# {}", self.package)?;
        writeln!(
            f,
            "Showing {} of {} matching files.",
            self.files.len(),
            self.matched
        )?;

        for file in &self.files {
            write!(f, "\n{file}\n")?;
        }

        let remaining = self.remaining();
        if remaining > 0 {
            write!(
                f,
                "\n... and {remaining} more files not shown. Use file_path to fetch a specific file."
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchReport {
    File { package: String, file: FetchedFile },
    Bundle(FileBundle),
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File {
                file, ..
            } => write!(f, "{file}"),
            Self::Bundle(bundle) => write!(f, "{bundle}"),
        }
    }
}

/// Fetches one file of a package, or a bundle of its source files when no
/// `file_path` is given.
///
/// The package name and the file path are both checked before anything is
/// downloaded or read. A blank `file_path` is treated as absent.
pub fn fetch_package_code(
    ctx: &NpmContext,
    name: &str,
    version: Option<&str>,
    file_path: Option<&str>,
) -> Result<FetchReport> {
    let name = validate_package_name(name)?;
    let file_path = file_path.filter(|p| !p.trim().is_empty());
    if let Some(path) = file_path {
        normalize_relative(path)?;
    }

    let (_, manifest) = ctx.registry().manifest(name, version)?;
    let package = prepare_package(ctx, name, &manifest)?;

    match file_path {
        Some(path) => {
            let file = read_single(ctx, &package, path)?;
            Ok(FetchReport::File {
                package: package.id(),
                file,
            })
        }
        None => bundle(ctx, &package, &manifest).map(FetchReport::Bundle),
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_body(path: &Path, size: u64, limit: u64) -> Result<FileBody> {
    if is_binary(path)? {
        return Ok(FileBody::Binary);
    }

    let (content, truncated) = read_text_prefix(path, limit)?;
    Ok(FileBody::Text {
        content,
        truncated_at: (truncated && size > limit).then_some(limit),
    })
}

fn read_single(ctx: &NpmContext, package: &ExtractedPackage, requested: &str) -> Result<FetchedFile> {
    let target = resolve_within(&package.root, requested)?;
    let display = slash_path(&normalize_relative(requested)?);

    let canonical = match fs::canonicalize(&target) {
        Ok(path) => path,
        Err(err) if err.kind() == IoErrorKind::NotFound => {
            return Err(OperationError::FileNotFound(display));
        }
        Err(source) => {
            return Err(FileSystemError::File {
                path: target,
                action: "resolve",
                source,
            }
            .into());
        }
    };

    let root = fs::canonicalize(&package.root).map_err(|source| {
        FileSystemError::Directory {
            path: package.root.clone(),
            action: "resolve",
            source,
        }
    })?;
    if !canonical.starts_with(&root) {
        return Err(PathError::OutsideRoot {
            path: requested.to_string(),
        }
        .into());
    }

    let metadata = fs::metadata(&canonical).map_err(|source| {
        FileSystemError::File {
            path: canonical.clone(),
            action: "stat",
            source,
        }
    })?;
    if !metadata.is_file() {
        return Err(OperationError::NotAFile(display));
    }

    let size = metadata.len();
    let body = read_body(&canonical, size, ctx.config().max_file_size())?;
    let shown = &display;
    debug!("read {} from {} ({} bytes)", shown, package.id(), size);

    Ok(FetchedFile {
        path: display,
        size,
        body,
    })
}

/// Paths that count as the package entry point, most specific first.
fn main_candidates(manifest: &VersionManifest) -> Vec<String> {
    let main = manifest
        .main
        .as_deref()
        .and_then(|m| normalize_relative(m).ok())
        .map(|p| slash_path(&p))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "index.js".to_string());

    vec![
        main.clone(),
        format!("{main}.js"),
        format!("{main}/index.js"),
    ]
}

fn rank(relative: &str, main: &[String]) -> u8 {
    if relative == "package.json" {
        0
    } else if !relative.contains('/') && relative.to_lowercase().starts_with("readme") {
        1
    } else if main.iter().any(|m| m == relative) {
        2
    } else {
        3
    }
}

/// Orders `package.json`, then top-level READMEs, then the entry point,
/// then everything else by path.
pub fn order_entries(entries: &mut [FileEntry], manifest: &VersionManifest) {
    let main = main_candidates(manifest);
    entries.sort_by(|a, b| {
        rank(&a.relative, &main)
            .cmp(&rank(&b.relative, &main))
            .then_with(|| a.relative.cmp(&b.relative))
    });
}

fn bundle(
    ctx: &NpmContext,
    package: &ExtractedPackage,
    manifest: &VersionManifest,
) -> Result<FileBundle> {
    let filter = ctx.filter();
    let max_files = ctx.config().max_files();
    let limit = ctx.config().max_file_size();

    let mut entries: Vec<FileEntry> = walk_files(&package.root, |dir| filter.skips_dir(dir))?
        .into_iter()
        .filter(|entry| filter.matches(&entry.relative))
        .collect();
    order_entries(&mut entries, manifest);

    let files = entries
        .iter()
        .take(max_files)
        .map(|entry| {
            let body = if entry.size > limit {
                FileBody::TooLarge {
                    limit,
                }
            } else {
                read_body(&entry.path, entry.size, limit)?
            };
            Ok(FetchedFile {
                path: entry.relative.clone(),
                size: entry.size,
                body,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "bundled {} of {} matching files from {}",
        files.len(),
        entries.len(),
        package.id()
    );

    Ok(FileBundle {
        package: package.id(),
        files,
        matched: entries.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn entry(relative: &str) -> FileEntry {
        FileEntry {
            relative: relative.to_string(),
            path: PathBuf::from(relative),
            size: 1,
        }
    }

    #[test]
    fn test_order_entries() {
        let manifest = VersionManifest {
            main: Some("./lib/main".into()),
            ..Default::default()
        };
        let mut entries = vec![
            entry("a.js"),
            entry("lib/main.js"),
            entry("docs/README.md"),
            entry("README.md"),
            entry("package.json"),
            entry("index.js"),
        ];
        order_entries(&mut entries, &manifest);

        let order: Vec<&str> = entries.iter().map(|e| e.relative.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "package.json",
                "README.md",
                "lib/main.js",
                "a.js",
                "docs/README.md",
                "index.js"
            ]
        );
    }

    #[test]
    fn test_default_main_is_index() {
        let mut entries = vec![entry("b.js"), entry("index.js")];
        order_entries(&mut entries, &VersionManifest::default());
        assert_eq!(entries[0].relative, "index.js");
    }

    #[test]
    fn test_bundle_display_with_remainder() {
        let bundle = FileBundle {
            package: "demo@1.0.0".into(),
            files: vec![
                FetchedFile {
                    path: "index.js".into(),
                    size: 3,
                    body: FileBody::Text {
                        content: "1;\n".into(),
                        truncated_at: None,
                    },
                },
                FetchedFile {
                    path: "big.js".into(),
                    size: 3 * 1024 * 1024,
                    body: FileBody::TooLarge {
                        limit: 1024 * 1024,
                    },
                },
            ],
            matched: 7,
        };

        let text = bundle.to_string();
        assert!(text.starts_with("# demo@1.0.0\nShowing 2 of 7 matching files.\n"));
        assert!(text.contains("=== index.js ===\n1;\n"));
        assert!(text.contains("[skipped (too large): 3.0 MiB exceeds the 1.0 MiB limit]"));
        assert!(text.ends_with(
            "... and 5 more files not shown. Use file_path to fetch a specific file."
        ));
    }

    #[test]
    fn test_truncated_file_display() {
        let file = FetchedFile {
            path: "lib/huge.js".into(),
            size: 2048,
            body: FileBody::Text {
                content: "x".repeat(1024),
                truncated_at: Some(1024),
            },
        };
        let text = file.to_string();
        assert!(text.starts_with("=== lib/huge.js ===\n"));
        assert!(text.ends_with("[truncated: showing the first 1.0 KiB of 2.0 KiB]"));
    }

    #[test]
    fn test_traversal_rejected_before_network() {
        let ctx = NpmContext::new(npmpeek_config::config::Config {
            registry_url: Some("http://127.0.0.1:9".into()),
            ..npmpeek_config::config::Config::default_config()
        });

        for path in ["../../etc/passwd", "/etc/passwd", "a/../../b", "x\0y"] {
            let err = fetch_package_code(&ctx, "react", None, Some(path)).unwrap_err();
            assert!(
                matches!(err, OperationError::InvalidFilePath { .. }),
                "{path}: {err:?}"
            );
            assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn test_invalid_name_rejected() {
        let ctx = NpmContext::new(npmpeek_config::config::Config::default_config());
        let err = fetch_package_code(&ctx, "../evil", None, None).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);
    }
}

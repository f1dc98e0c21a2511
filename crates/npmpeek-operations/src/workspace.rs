use std::{
    fs,
    path::{Path, PathBuf},
};

use npmpeek_dl::download::{extract, Download};
use npmpeek_registry::{name::name_slug, VersionManifest};
use npmpeek_utils::{
    error::FileSystemError,
    fs::{ensure_dir_exists, safe_remove},
};
use tracing::{debug, info};

use crate::{
    context::NpmContext,
    error::{OperationError, Result},
};

const ARCHIVE_NAME: &str = "package.tar.gz";
const CONTENTS_DIR: &str = "contents";

/// A package tarball extracted on local disk.
#[derive(Debug, Clone)]
pub struct ExtractedPackage {
    pub name: String,
    pub version: String,
    /// Per-package directory under the cache.
    pub dir: PathBuf,
    /// Directory holding the package's files (usually `contents/package`).
    pub root: PathBuf,
}

impl ExtractedPackage {
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

fn sanitize_version(version: &str) -> String {
    let cleaned: String = version
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.replace("..", "__")
}

/// `{cache}/packages/{scope+name}@{version}`
pub fn extraction_dir(cache_path: &Path, name: &str, version: &str) -> PathBuf {
    cache_path
        .join("packages")
        .join(format!("{}@{}", name_slug(name), sanitize_version(version)))
}

/// The package root inside an extraction: the single top-level directory
/// when that is all the archive holds, otherwise the extraction dir itself.
pub fn package_root(contents: &Path) -> Result<PathBuf> {
    let read_err = |source| FileSystemError::Directory {
        path: contents.to_path_buf(),
        action: "read",
        source,
    };

    let mut entries = fs::read_dir(contents)
        .map_err(read_err)?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(read_err)?;

    if entries.len() == 1 {
        let entry = entries.remove(0);
        if entry.file_type().map_err(read_err)?.is_dir() {
            return Ok(entry.path());
        }
    }

    Ok(contents.to_path_buf())
}

/// Downloads and extracts the tarball of `manifest`, replacing any earlier
/// extraction of the same version. `name` is the validated requested name.
pub fn prepare_package(
    ctx: &NpmContext,
    name: &str,
    manifest: &VersionManifest,
) -> Result<ExtractedPackage> {
    let config = ctx.config();
    let tarball = manifest
        .dist
        .tarball
        .as_deref()
        .ok_or_else(|| OperationError::MissingTarball {
            name: name.to_string(),
            version: manifest.version.clone(),
        })?;

    let dir = extraction_dir(&config.get_cache_path()?, name, &manifest.version);
    safe_remove(&dir)?;
    ensure_dir_exists(&dir)?;

    let archive = dir.join(ARCHIVE_NAME);
    let downloaded = Download::new(tarball, &archive)
        .max_size(config.max_tarball_size())
        .timeout(config.download_timeout())
        .integrity(manifest.dist.integrity.as_deref())
        .execute()?;
    debug!(
        "downloaded {}@{} ({} bytes, verified: {})",
        name, manifest.version, downloaded.size, downloaded.verified
    );

    let contents = dir.join(CONTENTS_DIR);
    extract(&archive, &contents)?;
    safe_remove(&archive)?;

    let root = package_root(&contents)?;
    info!("extracted {}@{} to {}", name, manifest.version, root.display());

    Ok(ExtractedPackage {
        name: name.to_string(),
        version: manifest.version.clone(),
        dir,
        root,
    })
}

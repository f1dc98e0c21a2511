use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::error::{FileSystemError, FileSystemResult};

/// Number of leading bytes inspected when sniffing for binary content.
pub const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// A regular file found under a walked root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the walked root, always `/`-separated.
    pub relative: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Removes a file or directory tree, succeeding if it does not exist.
///
/// # Errors
///
/// Returns [`FileSystemError::File`] or [`FileSystemError::Directory`] when
/// the removal fails for any reason other than the path being absent.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(|source| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "remove",
                source,
            }
        })
    } else {
        fs::remove_file(path).map_err(|source| {
            FileSystemError::File {
                path: path.to_path_buf(),
                action: "remove",
                source,
            }
        })
    }
}

/// Creates a directory and its parents if missing.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        fs::create_dir_all(path).map_err(|source| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Recursively lists the regular files under `root`, sorted by relative path.
///
/// Symlinks are not followed and are not reported. `skip_dir` receives each
/// directory name below the root; returning `true` prunes that subtree.
pub fn walk_files<F>(root: &Path, skip_dir: F) -> FileSystemResult<Vec<FileEntry>>
where
    F: Fn(&str) -> bool,
{
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !skip_dir(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = entry.map_err(|source| {
            FileSystemError::Walk {
                path: root.to_path_buf(),
                source,
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);

        entries.push(FileEntry {
            relative,
            path: entry.path().to_path_buf(),
            size,
        });
    }

    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(entries)
}

/// Returns `true` when the first [`BINARY_SNIFF_LEN`] bytes contain a NUL.
pub fn is_binary<P: AsRef<Path>>(path: P) -> FileSystemResult<bool> {
    let path = path.as_ref();
    let mut buf = Vec::with_capacity(BINARY_SNIFF_LEN);

    File::open(path)
        .and_then(|file| file.take(BINARY_SNIFF_LEN as u64).read_to_end(&mut buf))
        .map_err(|source| {
            FileSystemError::File {
                path: path.to_path_buf(),
                action: "read",
                source,
            }
        })?;

    Ok(buf.contains(&0))
}

/// Reads at most `limit` bytes of a file as lossy UTF-8.
///
/// The second element is `true` when the file was longer than `limit`.
pub fn read_text_prefix<P: AsRef<Path>>(path: P, limit: u64) -> FileSystemResult<(String, bool)> {
    let path = path.as_ref();
    let read_err = |source| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "read",
            source,
        }
    };

    let file = File::open(path).map_err(read_err)?;
    let mut buf = Vec::new();
    file.take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(read_err)?;

    let truncated = buf.len() as u64 > limit;
    if truncated {
        buf.truncate(limit as usize);
    }

    Ok((String::from_utf8_lossy(&buf).into_owned(), truncated))
}

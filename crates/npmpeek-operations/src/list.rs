use std::fmt;

use npmpeek_registry::name::validate_package_name;
use npmpeek_utils::{bytes::format_bytes, fs::walk_files};

use crate::{context::NpmContext, error::Result, workspace::prepare_package};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListing {
    pub package: String,
    pub files: Vec<ListedFile>,
}

impl FileListing {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

impl fmt::Display for FileListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "# {}\n{} files, {} total\n",
            self.package,
            self.files.len(),
            format_bytes(self.total_size(), 1)
        )?;

        let width = self.files.iter().map(|f| f.path.len()).max().unwrap_or(0);
        for file in &self.files {
            write!(
                f,
                "\n{:<width$}  {}",
                file.path,
                format_bytes(file.size, 1),
                width = width
            )?;
        }
        Ok(())
    }
}

/// Lists every regular file of a package, without any filtering.
pub fn list_package_files(
    ctx: &NpmContext,
    name: &str,
    version: Option<&str>,
) -> Result<FileListing> {
    let name = validate_package_name(name)?;
    let (_, manifest) = ctx.registry().manifest(name, version)?;
    let package = prepare_package(ctx, name, &manifest)?;

    let files = walk_files(&package.root, |_| false)?
        .into_iter()
        .map(|entry| {
            ListedFile {
                path: entry.relative,
                size: entry.size,
            }
        })
        .collect();

    Ok(FileListing {
        package: package.id(),
        files,
    })
}

//! npm registry client for npmpeek.
//!
//! This crate validates user-supplied package names, fetches package
//! documents ("packuments") and search results from an npm-compatible
//! registry, and resolves version specifiers against the published versions.
//!
//! # Example
//!
//! ```no_run
//! use npmpeek_registry::{metadata::RegistryClient, resolve_version};
//!
//! fn latest_tarball() -> npmpeek_registry::Result<String> {
//!     let client = RegistryClient::new("https://registry.npmjs.org");
//!     let packument = client.packument("left-pad")?;
//!     let manifest = resolve_version(&packument, None)?;
//!     Ok(manifest.dist.tarball.clone().unwrap_or_default())
//! }
//! ```

pub mod error;
pub mod metadata;
pub mod name;
pub mod package;
pub mod search;

pub use error::{RegistryError, Result};
pub use metadata::{resolve_version, RegistryClient};
pub use package::{Packument, VersionManifest};
pub use search::{SearchParams, SearchResults};

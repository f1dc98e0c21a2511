//! Shared helpers for npmpeek: paths, filesystem access, size and duration
//! parsing, and subresource integrity checks.

pub mod bytes;
pub mod error;
pub mod fs;
pub mod integrity;
pub mod path;
pub mod time;

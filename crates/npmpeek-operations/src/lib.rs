pub mod cache;
pub mod context;
pub mod error;
pub mod filter;
pub mod workspace;

pub mod fetch;
pub mod info;
pub mod list;
pub mod popular;
pub mod search;

pub use context::NpmContext;
pub use error::{ErrorKind, OperationError, Result};

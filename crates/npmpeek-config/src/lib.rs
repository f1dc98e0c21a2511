pub mod annotations;
pub mod config;
pub mod error;
pub mod server;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

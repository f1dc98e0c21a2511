/// Largest JSON-RPC message accepted by either transport.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::serve_stdio;

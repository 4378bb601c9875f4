// netdesk-api: Async REST client for paginated admin-portal resources

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::RestClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{ListParams, Mutation, PageResponse};

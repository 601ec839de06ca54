//! trackr Client - REST Transport
//!
//! [`RestClient`] speaks the remote tracker's REST API and implements the
//! remote capability traits from `trackr-core`. It performs no caching;
//! wrap it in `trackr_storage::CachedCollectionClient` for that.

pub mod rest;
pub mod wire;

pub use rest::{ClientConfig, ClientError, RestClient};

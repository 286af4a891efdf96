//! Stale-while-revalidate fetch client for the collection API.
//!
//! A [`QueryHandle`] observes one [`CollectionQuery`](crate::cache::CollectionQuery)
//! at a time. Cached pages are published synchronously before the network
//! request is issued, and only the newest request minted for a key may change
//! what consumers see.

mod config;
mod handle;
mod normalize;
mod transport;

pub use config::FetchConfig;
pub use handle::{FetchClient, FetchStatus, QueryHandle, QueryState};
pub use normalize::normalize;
pub use transport::{HttpTransport, NetworkError, Transport};

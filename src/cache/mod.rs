//! Session-scoped client cache for collection pages.
//!
//! A [`Session`] holds the last good page per [`RequestSignature`] together
//! with the newest request generation minted for it and the latest
//! [`Settlement`] of that generation. Every handle created from the same
//! session shares these maps.

mod keys;
mod store;

pub use keys::{CollectionQuery, RequestSignature};
pub use store::{Announcement, CacheEntry, Generation, Session, Settlement};

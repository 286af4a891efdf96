//! Application services: query processing over collection snapshots.

pub mod collections;
pub mod error;
pub mod pagination;
pub mod query;
pub mod repos;

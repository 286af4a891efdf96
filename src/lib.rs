//! DataByte: a read-only collection API and the session fetch-cache its clients use.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod infra;

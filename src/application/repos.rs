//! Repository traits describing content adapters.

use async_trait::async_trait;
use databyte_api_types::Record;
use serde_json::Value;
use thiserror::Error;

/// The single failure the content store originates; never retried.
#[derive(Debug, Error)]
pub enum StoreReadError {
    #[error("invalid collection name `{0}`")]
    InvalidName(String),
    #[error("collection `{name}` source is missing")]
    Missing { name: String },
    #[error("failed to read collection `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("collection `{name}` could not be parsed: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("collection `{name}` contains duplicate id `{id}`")]
    DuplicateId { name: String, id: String },
}

impl StoreReadError {
    pub fn collection(&self) -> &str {
        match self {
            StoreReadError::InvalidName(name)
            | StoreReadError::Missing { name }
            | StoreReadError::Io { name, .. }
            | StoreReadError::Parse { name, .. }
            | StoreReadError::DuplicateId { name, .. } => name,
        }
    }
}

/// Authoritative source of collections, read fresh on every call.
#[async_trait]
pub trait CollectionRepo: Send + Sync {
    /// Load every record of `name` in declared order.
    async fn load(&self, name: &str) -> Result<Vec<Record>, StoreReadError>;

    /// Load a free-form JSON document such as the club statistics.
    async fn load_document(&self, name: &str) -> Result<Value, StoreReadError>;
}

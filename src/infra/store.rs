//! Filesystem content store: one `<name>.json` file per collection.

use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use databyte_api_types::Record;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::application::repos::{CollectionRepo, StoreReadError};

#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreReadError> {
        if !is_plain_name(name) {
            return Err(StoreReadError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(format!("{name}.json")))
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>, StoreReadError> {
        let path = self.resolve(name)?;
        let bytes = fs::read(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreReadError::Missing {
                    name: name.to_string(),
                }
            } else {
                StoreReadError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })?;
        debug!(
            collection = name,
            path = %path.display(),
            bytes = bytes.len(),
            "content file read"
        );
        Ok(bytes)
    }
}

#[async_trait]
impl CollectionRepo for FsContentStore {
    async fn load(&self, name: &str) -> Result<Vec<Record>, StoreReadError> {
        let bytes = self.read(name).await?;
        let records: Vec<Record> =
            serde_json::from_slice(&bytes).map_err(|source| StoreReadError::Parse {
                name: name.to_string(),
                source,
            })?;

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id()) {
                return Err(StoreReadError::DuplicateId {
                    name: name.to_string(),
                    id: record.id().to_string(),
                });
            }
        }

        Ok(records)
    }

    async fn load_document(&self, name: &str) -> Result<Value, StoreReadError> {
        let bytes = self.read(name).await?;
        let document: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|source| StoreReadError::Parse {
                name: name.to_string(),
                source,
            })?;
        Ok(Value::Object(document))
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|byte| {
            byte.is_ascii_lowercase() || byte.is_ascii_digit() || matches!(byte, b'_' | b'-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FsContentStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        for (name, body) in files {
            std::fs::write(dir.path().join(format!("{name}.json")), body).expect("write");
        }
        let store = FsContentStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn loads_records_in_declared_order() {
        let (_dir, store) = store_with(&[(
            "projects",
            r#"[{"id":"b","name":"Second"},{"id":"a","name":"First"}]"#,
        )]);
        let records = store.load("projects").await.expect("load");
        let ids: Vec<_> = records.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn every_call_rereads_the_file() {
        let (dir, store) = store_with(&[("blogs", r#"[{"id":"b1"}]"#)]);
        assert_eq!(store.load("blogs").await.expect("first").len(), 1);

        std::fs::write(dir.path().join("blogs.json"), r#"[{"id":"b1"},{"id":"b2"}]"#)
            .expect("rewrite");
        assert_eq!(store.load("blogs").await.expect("second").len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.load("members").await,
            Err(StoreReadError::Missing { name }) if name == "members"
        ));
    }

    #[tokio::test]
    async fn malformed_content_is_a_parse_error() {
        let (_dir, store) = store_with(&[
            ("projects", r#"{"id":"not-an-array"}"#),
            ("members", r#"[{"name":"no id"}]"#),
            ("blogs", "[{"),
        ]);
        for name in ["projects", "members", "blogs"] {
            assert!(matches!(
                store.load(name).await,
                Err(StoreReadError::Parse { .. })
            ));
        }
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let (_dir, store) = store_with(&[("projects", r#"[{"id":"p1"},{"id":"p1"}]"#)]);
        assert!(matches!(
            store.load("projects").await,
            Err(StoreReadError::DuplicateId { id, .. }) if id == "p1"
        ));
    }

    #[tokio::test]
    async fn names_outside_the_content_root_are_refused() {
        let (_dir, store) = store_with(&[]);
        for name in ["../etc/passwd", "Projects", "", "a/b"] {
            assert!(matches!(
                store.load(name).await,
                Err(StoreReadError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn documents_must_be_objects() {
        let (_dir, store) =
            store_with(&[("stats", r#"{"members":{"total":120}}"#), ("list", "[]")]);
        let stats = store.load_document("stats").await.expect("stats");
        assert_eq!(stats["members"]["total"], 120);
        assert!(matches!(
            store.load_document("list").await,
            Err(StoreReadError::Parse { .. })
        ));
    }
}

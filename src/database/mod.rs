// Path-addressed document store used for user records and accounts.
// Paths are `/`-joined segments: the first segment names the collection,
// the remainder is the document id (`users/a@x_com`).

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoDB;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),
    #[error("invalid document path '{0}'")]
    InvalidPath(String),
    #[error("document at '{path}' could not be encoded: {reason}")]
    Encoding { path: String, reason: String },
}

/// Capability interface over the remote document store.
///
/// `write` is a full overwrite of whatever lives at `path`. `list` returns
/// every document directly under a collection path as `(id, document)`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;
    async fn write(&self, path: &str, document: Value) -> Result<(), StoreError>;
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPath<'a> {
    pub collection: &'a str,
    pub id: &'a str,
}

impl<'a> DocPath<'a> {
    pub fn parse(path: &'a str) -> Result<Self, StoreError> {
        let (collection, id) = path
            .split_once('/')
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        if collection.is_empty() || id.split('/').any(str::is_empty) {
            return Err(StoreError::InvalidPath(path.to_string()));
        }

        Ok(Self { collection, id })
    }
}

pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    if collection.is_empty() || collection.contains('/') {
        return Err(StoreError::InvalidPath(collection.to_string()));
    }
    Ok(())
}

pub const USERS: &str = "users";
pub const ACCOUNTS: &str = "accounts";

pub fn user_path(key: &str) -> String {
    format!("{}/{}", USERS, key)
}

pub fn account_path(key: &str) -> String {
    format!("{}/{}", ACCOUNTS, key)
}

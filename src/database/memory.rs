use super::{validate_collection, DocPath, DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-process document store (`STORE_BACKEND=memory` and tests).
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        DocPath::parse(path)?;
        let docs = self.documents.read().map_err(|_| Self::poisoned())?;
        Ok(docs.get(path).cloned())
    }

    async fn write(&self, path: &str, document: Value) -> Result<(), StoreError> {
        DocPath::parse(path)?;
        let mut docs = self.documents.write().map_err(|_| Self::poisoned())?;
        docs.insert(path.to_string(), document);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        DocPath::parse(path)?;
        let mut docs = self.documents.write().map_err(|_| Self::poisoned())?;
        docs.remove(path);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        validate_collection(collection)?;
        let prefix = format!("{}/", collection);
        let docs = self.documents.read().map_err(|_| Self::poisoned())?;

        Ok(docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, doc)| (path[prefix.len()..].to_string(), doc.clone()))
            .collect())
    }
}

/// Store double whose writes stop succeeding after a fixed number. Later
/// writes either fail or never complete.
#[cfg(test)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    remaining: std::sync::atomic::AtomicUsize,
    stall: bool,
}

#[cfg(test)]
impl FlakyStore {
    pub fn failing_after(successful_writes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: std::sync::atomic::AtomicUsize::new(successful_writes),
            stall: false,
        }
    }

    pub fn stalling_after(successful_writes: usize) -> Self {
        Self {
            stall: true,
            ..Self::failing_after(successful_writes)
        }
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentStore for FlakyStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, document: Value) -> Result<(), StoreError> {
        use std::sync::atomic::Ordering;

        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            if self.stall {
                futures::future::pending::<()>().await;
            }
            return Err(StoreError::Backend("PERMISSION_DENIED".to_string()));
        }
        self.inner.write(path, document).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.inner.delete(path).await
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        self.inner.list(collection).await
    }
}

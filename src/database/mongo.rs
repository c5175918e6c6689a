use super::{validate_collection, DocPath, DocumentStore, StoreError, ACCOUNTS, USERS};
use async_trait::async_trait;
use futures::stream::StreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection, Database};
use serde_json::Value;
use std::error::Error;

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = database_name(uri).unwrap_or("AccountConsole");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Email lookups on both collections
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        for name in [USERS, ACCOUNTS] {
            let index = IndexModel::builder().keys(doc! { "email": 1 }).build();

            match self.collection(name).create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}(email)", name),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

fn database_name(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("://")?;
    let (_, path) = rest.split_once('/')?;
    path.split('?').next().filter(|name| !name.is_empty())
}

fn backend(e: mongodb::error::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn to_json(mut document: Document) -> Value {
    document.remove("_id");
    Bson::Document(document).into_relaxed_extjson()
}

#[async_trait]
impl DocumentStore for MongoDB {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let path = DocPath::parse(path)?;

        let found = self
            .collection(path.collection)
            .find_one(doc! { "_id": path.id })
            .await
            .map_err(backend)?;

        Ok(found.map(to_json))
    }

    async fn write(&self, path: &str, document: Value) -> Result<(), StoreError> {
        let parsed = DocPath::parse(path)?;

        let mut replacement =
            mongodb::bson::to_document(&document).map_err(|e| StoreError::Encoding {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        replacement.insert("_id", parsed.id);

        self.collection(parsed.collection)
            .replace_one(doc! { "_id": parsed.id }, replacement)
            .upsert(true)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let path = DocPath::parse(path)?;

        self.collection(path.collection)
            .delete_one(doc! { "_id": path.id })
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        validate_collection(collection)?;

        let mut cursor = self
            .collection(collection)
            .find(doc! {})
            .await
            .map_err(backend)?;

        let mut documents = Vec::new();
        while let Some(result) = cursor.next().await {
            let document = result.map_err(backend)?;
            let id = match document.get("_id") {
                Some(Bson::String(id)) => id.clone(),
                Some(other) => other.to_string(),
                None => continue,
            };
            documents.push((id, to_json(document)));
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_strips_id() {
        let document = doc! { "_id": "a@x_com", "name": "A", "email": "a@x.com" };
        assert_eq!(to_json(document), json!({"name": "A", "email": "a@x.com"}));
    }

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name("mongodb://localhost:27017/accounts"), Some("accounts"));
        assert_eq!(database_name("mongodb://h/accounts?retryWrites=true"), Some("accounts"));
        assert_eq!(database_name("mongodb://localhost:27017"), None);
        assert_eq!(database_name("mongodb://localhost:27017/?tls=true"), None);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_roundtrip() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/AccountConsoleTest".to_string());

        let db = MongoDB::new(&uri).await.unwrap();
        db.write("users/test_user", json!({"name": "T", "email": "t@x.com", "role": "user"}))
            .await
            .unwrap();

        let read = db.read("users/test_user").await.unwrap();
        assert_eq!(read, Some(json!({"name": "T", "email": "t@x.com", "role": "user"})));

        db.delete("users/test_user").await.unwrap();
        assert_eq!(db.read("users/test_user").await.unwrap(), None);
    }
}

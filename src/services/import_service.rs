// ==================== USER IMPORT PIPELINE ====================
// Upload buffer -> parse -> validate -> derive keys -> sequential writes.
// Nothing is written unless the whole batch parses and validates.

use crate::{
    database::{user_path, DocumentStore},
    models::{non_empty, Role, UserRecord},
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid JSON file: {0}")]
    Parse(String),
    #[error("{0}")]
    Shape(String),
    #[error("{message}")]
    Write {
        written: usize,
        total: usize,
        message: String,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Reject batches where two emails map to the same storage key.
    pub reject_key_collisions: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            reject_key_collisions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ImportSummary {
    pub written: usize,
}

/// Parse an uploaded buffer as JSON. The whole buffer is rejected on failure.
pub fn parse_batch(buffer: &[u8]) -> Result<Value, ImportError> {
    let text = std::str::from_utf8(buffer).map_err(|e| ImportError::Parse(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| ImportError::Parse(e.to_string()))
}

fn text_field<'a>(user: Option<&'a Map<String, Value>>, field: &str) -> Option<&'a str> {
    user.and_then(|u| u.get(field))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Check the parsed payload's shape, stopping at the first offending element.
/// Every element must carry an email and a name before any role or
/// netlifyRepo value is looked at.
pub fn validate_batch(data: &Value) -> Result<Vec<UserRecord>, ImportError> {
    let users = data
        .as_array()
        .ok_or_else(|| ImportError::Shape("Data must be an array of users".to_string()))?;

    let mut required = Vec::with_capacity(users.len());
    for (index, user) in users.iter().enumerate() {
        let fields = user.as_object();

        let email = text_field(fields, "email").ok_or_else(|| {
            ImportError::Shape(format!("User at index {} is missing email", index))
        })?;
        let name = text_field(fields, "name").ok_or_else(|| {
            ImportError::Shape(format!("User at index {} is missing name", index))
        })?;
        required.push((fields, email, name));
    }

    let mut batch = Vec::with_capacity(required.len());
    for (index, (fields, email, name)) in required.into_iter().enumerate() {
        let role = match fields.and_then(|u| u.get("role")) {
            None | Some(Value::Null) => Some(Role::User),
            Some(Value::String(raw)) => Role::normalize(Some(raw.as_str())),
            Some(_) => None,
        }
        .ok_or_else(|| ImportError::Shape(format!("User at index {} has invalid role", index)))?;

        let netlify_repo = match fields.and_then(|u| u.get("netlifyRepo")) {
            None | Some(Value::Null) => None,
            Some(Value::String(repo)) => non_empty(Some(repo.clone())),
            Some(_) => {
                return Err(ImportError::Shape(format!(
                    "User at index {} has invalid netlifyRepo",
                    index
                )))
            }
        };

        batch.push(UserRecord {
            email: email.to_string(),
            name: name.to_string(),
            role,
            netlify_repo,
        });
    }

    Ok(batch)
}

/// Store-safe key for an email: `.`, `#`, `$`, `\` and the path separator `/`
/// become `_`.
pub fn derive_key(email: &str) -> String {
    email
        .chars()
        .map(|c| match c {
            '.' | '#' | '$' | '\\' | '/' => '_',
            other => other,
        })
        .collect()
}

/// Reject the batch when two records would land on the same storage key.
pub fn check_key_collisions(batch: &[UserRecord]) -> Result<(), ImportError> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(batch.len());

    for (index, user) in batch.iter().enumerate() {
        let key = derive_key(&user.email);
        if let Some(first) = seen.get(&key) {
            return Err(ImportError::Shape(format!(
                "Users at index {} and {} map to the same storage key {}",
                first, index, key
            )));
        }
        seen.insert(key, index);
    }

    Ok(())
}

/// Parse, validate and collision-check an upload without touching the store.
pub fn prepare_batch(buffer: &[u8], options: ImportOptions) -> Result<Vec<UserRecord>, ImportError> {
    let data = parse_batch(buffer)?;
    let batch = validate_batch(&data)?;

    if options.reject_key_collisions {
        check_key_collisions(&batch)?;
    }

    Ok(batch)
}

/// Write records one at a time, in order. The first failure aborts the rest;
/// records written before it stay written.
pub async fn import_batch(
    store: &dyn DocumentStore,
    batch: &[UserRecord],
) -> Result<ImportSummary, ImportError> {
    let total = batch.len();
    log::info!("📥 Importing {} users", total);

    for (written, user) in batch.iter().enumerate() {
        let key = derive_key(&user.email);
        let document = serde_json::to_value(user).map_err(|e| ImportError::Write {
            written,
            total,
            message: e.to_string(),
        })?;

        if let Err(e) = store.write(&user_path(&key), document).await {
            log::warn!("❌ Import aborted at {} ({}/{} written): {}", key, written, total, e);
            return Err(ImportError::Write {
                written,
                total,
                message: e.to_string(),
            });
        }

        log::debug!("   ✅ users/{}", key);
    }

    log::info!("✅ Imported {} users", total);
    Ok(ImportSummary { written: total })
}

/// One-shot upload: prepare then import.
pub async fn run_import(
    store: &dyn DocumentStore,
    buffer: &[u8],
    options: ImportOptions,
) -> Result<ImportSummary, ImportError> {
    let batch = prepare_batch(buffer, options)?;
    import_batch(store, &batch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{memory::FlakyStore, MemoryStore};
    use serde_json::json;

    fn shape_message(result: Result<Vec<UserRecord>, ImportError>) -> String {
        match result {
            Err(ImportError::Shape(message)) => message,
            other => panic!("expected shape error, got {:?}", other),
        }
    }

    fn record(email: &str, name: &str) -> UserRecord {
        UserRecord {
            email: email.into(),
            name: name.into(),
            role: Role::User,
            netlify_repo: None,
        }
    }

    #[test]
    fn test_parse_error_includes_reason() {
        let err = parse_batch(b"[{\"name\": ").unwrap_err();
        match &err {
            ImportError::Parse(reason) => assert!(!reason.is_empty()),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(err.to_string().starts_with("Invalid JSON file: "));
    }

    #[test]
    fn test_parse_rejects_non_utf8() {
        assert!(matches!(parse_batch(&[0x5b, 0xff, 0x5d]), Err(ImportError::Parse(_))));
    }

    #[test]
    fn test_non_array_top_level_rejected() {
        for data in [json!({"name": "A"}), json!({"0": {"email": "a@x.com"}}), json!("users"), json!(3), json!(null)] {
            assert_eq!(shape_message(validate_batch(&data)), "Data must be an array of users");
        }
    }

    #[test]
    fn test_missing_email_cites_lowest_index() {
        let data = json!([
            {"email": "a@x.com", "name": "A"},
            {"name": "B"},
            {"email": "", "name": "C"},
        ]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 1 is missing email");
    }

    #[test]
    fn test_missing_name_reported_when_no_earlier_email_error() {
        let data = json!([{"email": "a@x.com"}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 0 is missing name");

        // element 0 lacks name, element 1 lacks email: element 0 is reported first
        let data = json!([{"email": "a@x.com"}, {"name": "B"}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 0 is missing name");

        // email is checked before name within one element
        let data = json!([{"email": "a@x.com", "name": "A"}, {}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 1 is missing email");
    }

    #[test]
    fn test_non_object_element_has_no_email() {
        let data = json!([{"email": "a@x.com", "name": "A"}, 7]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 1 is missing email");
    }

    #[test]
    fn test_invalid_role_and_repo_rejected() {
        let data = json!([{"email": "a@x.com", "name": "A", "role": "owner"}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 0 has invalid role");

        let data = json!([{"email": "a@x.com", "name": "A", "netlifyRepo": 5}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 0 has invalid netlifyRepo");
    }

    #[test]
    fn test_missing_email_reported_before_later_invalid_role() {
        let data = json!([{"email": "a@x.com", "name": "A", "role": "owner"}, {"name": "B"}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 1 is missing email");

        let data = json!([{"email": "a@x.com", "name": "A", "netlifyRepo": 5}, {"email": "b@x.com"}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 1 is missing name");
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let data = json!([{"email": "a@x.com", "name": "   "}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 0 is missing name");

        let data = json!([{"email": " \t", "name": "A"}]);
        assert_eq!(shape_message(validate_batch(&data)), "User at index 0 is missing email");

        let data = json!([{"email": " a@x.com ", "name": " A "}]);
        assert_eq!(validate_batch(&data).unwrap()[0], record("a@x.com", "A"));
    }

    #[test]
    fn test_validation_normalizes_and_drops_extra_fields() {
        let data = json!([
            {"email": "a@x.com", "name": "A", "role": "", "netlifyRepo": "", "extra": true},
            {"email": "b@x.com", "name": "B", "role": "admin", "netlifyRepo": "https://b.netlify.app"},
        ]);
        let batch = validate_batch(&data).unwrap();

        assert_eq!(batch[0], record("a@x.com", "A"));
        assert_eq!(batch[1].role, Role::Admin);
        assert_eq!(batch[1].netlify_repo.as_deref(), Some("https://b.netlify.app"));
    }

    #[test]
    fn test_serialized_batch_survives_parse_and_validate() {
        let batch = vec![
            record("a@x.com", "A"),
            UserRecord {
                email: "b@y.org".into(),
                name: "B".into(),
                role: Role::Admin,
                netlify_repo: Some("https://github.com/b/site".into()),
            },
            record("c@z.net", "C"),
        ];
        let buffer = serde_json::to_vec(&batch).unwrap();

        let parsed = parse_batch(&buffer).unwrap();
        assert_eq!(validate_batch(&parsed).unwrap(), batch);
    }

    #[test]
    fn test_derive_key() {
        assert_eq!(derive_key("a.b#c$d\\e"), "a_b_c_d_e");
        assert_eq!(derive_key("a@x.com"), "a@x_com");
        assert_eq!(derive_key("plain@host"), "plain@host");
        assert_eq!(derive_key("c/d@x.com"), "c_d@x_com");
        assert_eq!(derive_key("b//c@x.com"), "b__c@x_com");

        let once = derive_key("first.last@mail.example.com");
        assert_eq!(derive_key(&once), once);
        assert_eq!(once.chars().count(), "first.last@mail.example.com".chars().count());
    }

    #[test]
    fn test_collisions_detected() {
        let batch = vec![record("a.b@x.com", "A"), record("c@x.com", "C"), record("a_b@x.com", "B")];
        let err = check_key_collisions(&batch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Users at index 0 and 2 map to the same storage key a_b@x_com"
        );

        assert!(check_key_collisions(&batch[..2]).is_ok());
    }

    #[test]
    fn test_prepare_batch_respects_collision_option() {
        let buffer = br#"[{"email":"a.b@x.com","name":"A"},{"email":"a_b@x.com","name":"B"}]"#;

        assert!(prepare_batch(buffer, ImportOptions::default()).is_err());

        let lenient = ImportOptions {
            reject_key_collisions: false,
        };
        assert_eq!(prepare_batch(buffer, lenient).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_single_record_with_default_role() {
        let store = MemoryStore::new();
        let summary = run_import(
            &store,
            br#"[{"name":"A","email":"a@x.com"}]"#,
            ImportOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary, ImportSummary { written: 1 });
        assert_eq!(
            store.read("users/a@x_com").await.unwrap(),
            Some(json!({"name": "A", "email": "a@x.com", "role": "user"}))
        );
    }

    #[tokio::test]
    async fn test_import_overwrites_existing_document() {
        let store = MemoryStore::new();
        store
            .write("users/a@x_com", json!({"name": "Old", "email": "a@x.com", "role": "admin", "stale": 1}))
            .await
            .unwrap();

        import_batch(&store, &[record("a@x.com", "New")]).await.unwrap();

        assert_eq!(
            store.read("users/a@x_com").await.unwrap(),
            Some(json!({"name": "New", "email": "a@x.com", "role": "user"}))
        );
    }

    #[tokio::test]
    async fn test_write_failure_aborts_remaining_batch() {
        let store = FlakyStore::failing_after(1);
        let batch = vec![record("a@x.com", "A"), record("b@x.com", "B"), record("c@x.com", "C")];

        let err = import_batch(&store, &batch).await.unwrap_err();
        match err {
            ImportError::Write { written, total, message } => {
                assert_eq!(written, 1);
                assert_eq!(total, 3);
                assert_eq!(message, "PERMISSION_DENIED");
            }
            other => panic!("expected write error, got {:?}", other),
        }

        assert!(store.read("users/a@x_com").await.unwrap().is_some());
        assert!(store.read("users/b@x_com").await.unwrap().is_none());
        assert!(store.read("users/c@x_com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slashes_in_email_import_as_flat_ids() {
        let store = MemoryStore::new();
        let summary = run_import(
            &store,
            br#"[{"name":"A","email":"a@x.com"},{"name":"B","email":"b//c@x.com"},{"name":"C","email":"c/d@x.com"}]"#,
            ImportOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary, ImportSummary { written: 3 });
        let ids: Vec<String> = store.list("users").await.unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a@x_com", "b__c@x_com", "c_d@x_com"]);
    }

    #[tokio::test]
    async fn test_invalid_upload_writes_nothing() {
        let store = MemoryStore::new();
        let err = run_import(
            &store,
            br#"[{"name":"A","email":"a@x.com"},{"email":"b@x.com"}]"#,
            ImportOptions::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "User at index 1 is missing name");
        assert_eq!(store.len(), 0);
    }
}

// ==================== USER MANAGEMENT ====================
// Profile (own record) and admin CRUD over `users/{key}`.

use crate::{
    database::{user_path, DocumentStore, StoreError, USERS},
    models::{non_empty, Principal, Role, UserRecord},
    services::import_service::derive_key,
    utils::AppError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==================== REQUEST/RESPONSE MODELS ====================

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProfileUpdateRequest {
    pub name: String,
    #[serde(rename = "netlifyRepo", default)]
    pub netlify_repo: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub email: String,
    pub profile: Option<UserRecord>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    #[serde(rename = "netlifyRepo", default)]
    pub netlify_repo: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserEntry {
    pub id: String,
    #[serde(flatten)]
    pub record: UserRecord,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListUsersResponse {
    pub success: bool,
    pub users: Vec<UserEntry>,
    pub count: usize,
}

// ==================== HELPERS ====================

fn decode_user(path: &str, document: Value) -> Result<UserRecord, StoreError> {
    serde_json::from_value(document).map_err(|e| StoreError::Encoding {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn encode_user(path: &str, user: &UserRecord) -> Result<Value, StoreError> {
    serde_json::to_value(user).map_err(|e| StoreError::Encoding {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl UserForm {
    fn into_record(self) -> Result<UserRecord, AppError> {
        let role = Role::normalize(self.role.as_deref())
            .ok_or_else(|| AppError::InvalidRequest("Role must be 'user' or 'admin'".to_string()))?;

        Ok(UserRecord {
            name: required(&self.name, "Name")?,
            email: required(&self.email, "Email")?,
            role,
            netlify_repo: non_empty(self.netlify_repo),
        })
    }
}

pub async fn load_user(store: &dyn DocumentStore, id: &str) -> Result<Option<UserRecord>, AppError> {
    let path = user_path(id);
    match store.read(&path).await? {
        Some(document) => Ok(Some(decode_user(&path, document)?)),
        None => Ok(None),
    }
}

/// Admin-only resources check the principal's own user document.
pub async fn require_admin(
    store: &dyn DocumentStore,
    principal: &Principal,
    enforce: bool,
) -> Result<(), AppError> {
    if !enforce {
        return Ok(());
    }

    match load_user(store, &principal.id).await? {
        Some(user) if user.is_admin() => Ok(()),
        _ => Err(AppError::Forbidden("Administrator access required".to_string())),
    }
}

// ==================== PROFILE ====================

pub async fn get_profile(store: &dyn DocumentStore, principal: &Principal) -> Result<ProfileResponse, AppError> {
    let profile = load_user(store, &principal.id).await?;

    Ok(ProfileResponse {
        success: true,
        email: principal.email.clone(),
        profile,
    })
}

/// Merge the edited fields over the stored record. Email always comes from
/// the session, the role is kept.
pub async fn update_profile(
    store: &dyn DocumentStore,
    principal: &Principal,
    request: ProfileUpdateRequest,
) -> Result<UserRecord, AppError> {
    let name = required(&request.name, "Name")?;
    let existing = load_user(store, &principal.id).await?;

    let updated = UserRecord {
        email: principal.email.clone(),
        name,
        role: existing.map(|user| user.role).unwrap_or_default(),
        netlify_repo: non_empty(request.netlify_repo),
    };

    let path = user_path(&principal.id);
    store.write(&path, encode_user(&path, &updated)?).await?;

    log::info!("✅ Profile updated: {}", principal.id);
    Ok(updated)
}

// ==================== ADMIN ====================

pub async fn list_users(store: &dyn DocumentStore) -> Result<ListUsersResponse, AppError> {
    let documents = store.list(USERS).await?;
    let mut users = Vec::with_capacity(documents.len());

    for (id, document) in documents {
        match decode_user(&user_path(&id), document) {
            Ok(record) => users.push(UserEntry { id, record }),
            Err(e) => log::warn!("⚠️  Skipping unreadable user document {}: {}", id, e),
        }
    }

    Ok(ListUsersResponse {
        success: true,
        count: users.len(),
        users,
    })
}

pub async fn create_user(store: &dyn DocumentStore, form: UserForm) -> Result<UserEntry, AppError> {
    let record = form.into_record()?;
    let id = derive_key(&record.email);
    save(store, id, record).await
}

/// Editing only applies to users that exist; the write is a full overwrite.
pub async fn update_user(store: &dyn DocumentStore, id: &str, form: UserForm) -> Result<UserEntry, AppError> {
    let record = form.into_record()?;
    if store.read(&user_path(id)).await?.is_none() {
        return Err(AppError::NotFound(format!("user {}", id)));
    }
    save(store, id.to_string(), record).await
}

async fn save(store: &dyn DocumentStore, id: String, record: UserRecord) -> Result<UserEntry, AppError> {
    let path = user_path(&id);
    store.write(&path, encode_user(&path, &record)?).await?;
    Ok(UserEntry { id, record })
}

pub async fn delete_user(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    store.delete(&user_path(id)).await?;
    Ok(())
}

/// Make sure a user document exists for a bootstrap account.
pub async fn ensure_user(store: &dyn DocumentStore, record: UserRecord) -> Result<bool, AppError> {
    let id = derive_key(&record.email);
    if load_user(store, &id).await?.is_some() {
        return Ok(false);
    }
    save(store, id, record).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    fn principal() -> Principal {
        Principal {
            id: "a@x_com".into(),
            email: "a@x.com".into(),
        }
    }

    fn form(name: &str, email: &str, role: Option<&str>) -> UserForm {
        UserForm {
            name: name.into(),
            email: email.into(),
            netlify_repo: Some(String::new()),
            role: role.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_profile_missing_returns_none() {
        let store = MemoryStore::new();
        let response = get_profile(&store, &principal()).await.unwrap();
        assert!(response.profile.is_none());
        assert_eq!(response.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_update_profile_keeps_role_and_forces_email() {
        let store = MemoryStore::new();
        store
            .write("users/a@x_com", json!({"email": "old@x.com", "name": "Old", "role": "admin"}))
            .await
            .unwrap();

        let updated = update_profile(
            &store,
            &principal(),
            ProfileUpdateRequest {
                name: "New".into(),
                netlify_repo: Some("https://a.netlify.app".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.role, Role::Admin);
        assert_eq!(
            store.read("users/a@x_com").await.unwrap(),
            Some(json!({
                "email": "a@x.com",
                "name": "New",
                "role": "admin",
                "netlifyRepo": "https://a.netlify.app"
            }))
        );
    }

    #[tokio::test]
    async fn test_update_profile_requires_name() {
        let store = MemoryStore::new();
        let err = update_profile(
            &store,
            &principal(),
            ProfileUpdateRequest {
                name: "  ".into(),
                netlify_repo: None,
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_admin_crud() {
        let store = MemoryStore::new();

        let created = create_user(&store, form("B", "b@x.com", None)).await.unwrap();
        assert_eq!(created.id, "b@x_com");
        assert_eq!(created.record.role, Role::User);
        assert_eq!(created.record.netlify_repo, None);

        update_user(&store, "b@x_com", form("Bee", "b@x.com", Some("admin")))
            .await
            .unwrap();

        let listed = list_users(&store).await.unwrap();
        assert_eq!(listed.count, 1);
        assert_eq!(listed.users[0].record.name, "Bee");
        assert!(listed.users[0].record.is_admin());

        delete_user(&store, "b@x_com").await.unwrap();
        assert_eq!(list_users(&store).await.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_update_unknown_user_not_found() {
        let store = MemoryStore::new();
        let err = update_user(&store, "ghost", form("G", "g@x.com", None)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_admin_form_validation() {
        let store = MemoryStore::new();
        assert!(create_user(&store, form("", "b@x.com", None)).await.is_err());
        assert!(create_user(&store, form("B", "", None)).await.is_err());
        assert!(create_user(&store, form("B", "b@x.com", Some("root"))).await.is_err());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_documents() {
        let store = MemoryStore::new();
        store.write("users/ok", json!({"email": "o@x.com", "name": "O"})).await.unwrap();
        store.write("users/broken", json!({"name": 5})).await.unwrap();

        let listed = list_users(&store).await.unwrap();
        assert_eq!(listed.count, 1);
        assert_eq!(listed.users[0].id, "ok");
    }

    #[test]
    fn test_user_entry_flattens_record() {
        let entry = UserEntry {
            id: "a@x_com".into(),
            record: UserRecord {
                email: "a@x.com".into(),
                name: "A".into(),
                role: Role::User,
                netlify_repo: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"id": "a@x_com", "email": "a@x.com", "name": "A", "role": "user"})
        );
    }

    #[tokio::test]
    async fn test_require_admin() {
        let store = MemoryStore::new();
        let p = principal();

        assert!(require_admin(&store, &p, false).await.is_ok());
        assert!(matches!(require_admin(&store, &p, true).await, Err(AppError::Forbidden(_))));

        store
            .write("users/a@x_com", json!({"email": "a@x.com", "name": "A", "role": "admin"}))
            .await
            .unwrap();
        assert!(require_admin(&store, &p, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_user_leaves_existing_record() {
        let store = MemoryStore::new();
        store.write("users/a@x_com", json!({"email": "a@x.com", "name": "Kept"})).await.unwrap();

        let record = UserRecord {
            email: "a@x.com".into(),
            name: "Administrator".into(),
            role: Role::Admin,
            netlify_repo: None,
        };
        assert!(!ensure_user(&store, record).await.unwrap());
        assert_eq!(load_user(&store, "a@x_com").await.unwrap().unwrap().name, "Kept");
    }
}

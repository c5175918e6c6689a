use serde::{Deserialize, Serialize};

/// Credential document at `accounts/{key}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
}

/// Authenticated identity; `id` is the storage key of the account email.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, utoipa::ToSchema)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

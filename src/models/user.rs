use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Absent or empty role means `user`; anything else must be a known role.
    pub fn normalize(raw: Option<&str>) -> Option<Role> {
        match raw.map(str::trim) {
            None | Some("") | Some("user") => Some(Role::User),
            Some("admin") => Some(Role::Admin),
            Some(_) => None,
        }
    }
}

/// A user document as stored at `users/{key}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, utoipa::ToSchema)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "netlifyRepo", default, skip_serializing_if = "Option::is_none")]
    pub netlify_repo: Option<String>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Empty form fields are stored as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

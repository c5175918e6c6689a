use crate::{
    database::{account_path, DocumentStore, StoreError},
    models::{Account, Principal},
    services::import_service::derive_key,
};
use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Session has ended")]
    SessionEnded,
    #[error("Password hashing error: {0}")]
    Hashing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // principal id
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

/// An authenticated session: the bearer token and who it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub principal: Principal,
}

/// Identity provider capability. Handlers and the session guard only see
/// this trait, so tests can swap in fixed sessions.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Re-derive the principal behind a token.
    async fn resolve(&self, token: &str) -> Result<Principal, AuthError>;

    async fn end_session(&self, token: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_hours: i64,
}

/// Email/password accounts kept in the document store at `accounts/{key}`,
/// sessions issued as HS256 JWTs. Logged-out token ids are kept in memory.
pub struct LocalIdentityGateway {
    store: Arc<dyn DocumentStore>,
    jwt: JwtSettings,
    bcrypt_cost: u32,
    revoked: RwLock<HashSet<String>>,
}

impl LocalIdentityGateway {
    pub fn new(store: Arc<dyn DocumentStore>, jwt: JwtSettings, bcrypt_cost: u32) -> Self {
        Self {
            store,
            jwt,
            bcrypt_cost,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Create the account if it does not exist yet. Returns whether it was created.
    pub async fn ensure_account(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let path = account_path(&derive_key(email));

        if self.store.read(&path).await?.is_some() {
            return Ok(false);
        }

        let password_hash =
            hash(password, self.bcrypt_cost).map_err(|e| AuthError::Hashing(e.to_string()))?;
        let account = Account {
            email: email.to_string(),
            password_hash,
            created_at: Utc::now().timestamp(),
        };
        let document = serde_json::to_value(&account).map_err(|e| StoreError::Encoding {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        self.store.write(&path, document).await?;
        Ok(true)
    }

    async fn find_account(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let path = account_path(&derive_key(email));

        match self.store.read(&path).await? {
            Some(document) => serde_json::from_value(document)
                .map(Some)
                .map_err(|e| AuthError::Store(StoreError::Encoding {
                    path,
                    reason: e.to_string(),
                })),
            None => Ok(None),
        }
    }

    fn generate_jwt(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id.clone(),
            email: principal.email.clone(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(self.jwt.ttl_hours)).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            aud: self.jwt.audience.clone(),
            iss: self.jwt.issuer.clone(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt.secret.as_ref()),
        )
        .map_err(|e| AuthError::InvalidToken(format!("Failed to generate token: {}", e)))
    }

    fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.jwt.audience.clone()]);
        validation.set_issuer(&[self.jwt.issuer.clone()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt.secret.as_ref()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn is_revoked(&self, jti: &str) -> bool {
        self.revoked
            .read()
            .map(|revoked| revoked.contains(jti))
            .unwrap_or(true)
    }
}

#[async_trait]
impl IdentityGateway for LocalIdentityGateway {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        // distinct emails can share a storage key
        let account = self
            .find_account(email)
            .await?
            .filter(|account| account.email == email)
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = verify(password, &account.password_hash)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let principal = Principal {
            id: derive_key(&account.email),
            email: account.email,
        };
        let token = self.generate_jwt(&principal)?;

        Ok(Session { token, principal })
    }

    async fn resolve(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.verify_token(token)?;
        if self.is_revoked(&claims.jti) {
            return Err(AuthError::SessionEnded);
        }

        Ok(Principal {
            id: claims.sub,
            email: claims.email,
        })
    }

    async fn end_session(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.verify_token(token)?;
        if let Ok(mut revoked) = self.revoked.write() {
            revoked.insert(claims.jti);
        }
        Ok(())
    }
}

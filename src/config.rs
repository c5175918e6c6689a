use crate::services::auth_service::JwtSettings;
use crate::services::import_service::ImportOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    MongoDB { url: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub jwt: JwtSettings,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub require_admin_role: bool,
    pub import: ImportOptions,
    pub admin_seed: Option<AdminSeed>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let store = match get("STORE_BACKEND", "mongodb").as_str() {
            "mongodb" => StoreBackend::MongoDB {
                url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let admin_seed = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => Some(AdminSeed {
                email,
                password,
                name: get("ADMIN_NAME", "Administrator"),
            }),
            _ => None,
        };

        Ok(Self {
            host: get("HOST", "0.0.0.0"),
            port: parse("PORT", get("PORT", "3002"))?,
            store,
            jwt: JwtSettings {
                secret: get("JWT_SECRET", "default-secret-change-me"),
                issuer: get("JWT_ISSUER", "account-console"),
                audience: get("JWT_AUDIENCE", "account-console-api"),
                ttl_hours: parse("JWT_TTL_HOURS", get("JWT_TTL_HOURS", "24"))?,
            },
            bcrypt_cost: parse("BCRYPT_COST", get("BCRYPT_COST", "12"))?,
            cors_origins: get("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            require_admin_role: parse_flag("REQUIRE_ADMIN_ROLE", get("REQUIRE_ADMIN_ROLE", "true"))?,
            import: ImportOptions {
                reject_key_collisions: parse_flag(
                    "IMPORT_REJECT_KEY_COLLISIONS",
                    get("IMPORT_REJECT_KEY_COLLISIONS", "true"),
                )?,
            },
            admin_seed,
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

use crate::config::AdminSeed;
use crate::database::DocumentStore;
use crate::models::{Role, UserRecord};
use crate::services::{user_service, LocalIdentityGateway};

/// Bootstrap administrator account and user record.
/// Existing records are left untouched.
pub async fn seed_admin(store: &dyn DocumentStore, gateway: &LocalIdentityGateway, seed: &AdminSeed) {
    match gateway.ensure_account(&seed.email, &seed.password).await {
        Ok(true) => log::info!("   ✅ Created admin account {}", seed.email),
        Ok(false) => log::info!("👤 Admin account {} already exists, skipping", seed.email),
        Err(e) => {
            log::error!("   ❌ Failed to seed admin account: {}", e);
            return;
        }
    }

    let record = UserRecord {
        email: seed.email.clone(),
        name: seed.name.clone(),
        role: Role::Admin,
        netlify_repo: None,
    };

    match user_service::ensure_user(store, record).await {
        Ok(true) => log::info!("   ✅ Created admin user record for {}", seed.email),
        Ok(false) => log::debug!("   ℹ️  Admin user record already present"),
        Err(e) => log::error!("   ❌ Failed to seed admin user record: {}", e),
    }
}

use crate::{
    database::DocumentStore,
    services::{import_service::ImportOptions, IdentityGateway, ImportWizards},
};
use std::sync::Arc;

/// Shared handler state. Collaborators are injected so tests can pass
/// in-memory stores and fixed identities.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityGateway>,
    pub wizards: ImportWizards,
    pub import: ImportOptions,
    pub require_admin_role: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityGateway>) -> Self {
        Self {
            store,
            identity,
            wizards: ImportWizards::new(),
            import: ImportOptions::default(),
            require_admin_role: true,
        }
    }
}

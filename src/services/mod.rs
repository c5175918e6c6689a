pub mod auth_service;
pub mod import_service;
pub mod import_wizard;
pub mod user_service;

pub use auth_service::{IdentityGateway, LocalIdentityGateway};
pub use import_wizard::ImportWizards;

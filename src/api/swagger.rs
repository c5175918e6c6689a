use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Account Console API",
        version = "1.0.0",
        description = "Account management: profile, user administration and bulk user import.\n\n**Authentication:** everything except login and health requires a JWT Bearer token.",
    ),
    paths(
        // Auth
        crate::api::auth::login,
        crate::api::auth::get_me,
        crate::api::auth::logout,

        // Health
        crate::api::health::health_check,

        // Profile
        crate::api::profile::get_profile,
        crate::api::profile::update_profile,

        // Admin
        crate::api::admin::list_users,
        crate::api::admin::create_user,
        crate::api::admin::update_user,
        crate::api::admin::delete_user,

        // Import
        crate::api::import::get_wizard,
        crate::api::import::upload,
        crate::api::import::confirm,
        crate::api::import::reset,
        crate::api::import::import_batch,
    ),
    components(
        schemas(
            crate::api::auth::LoginRequest,
            crate::api::auth::LoginResponse,
            crate::api::health::HealthResponse,
            crate::models::Principal,
            crate::models::Role,
            crate::models::UserRecord,
            crate::services::user_service::ProfileUpdateRequest,
            crate::services::user_service::ProfileResponse,
            crate::services::user_service::UserForm,
            crate::services::user_service::UserEntry,
            crate::services::user_service::ListUsersResponse,
            crate::services::import_service::ImportSummary,
            crate::services::import_wizard::ReviewRow,
            crate::services::import_wizard::WizardView,
        )
    ),
    tags(
        (name = "Auth", description = "Email/password sign-in and session lifecycle."),
        (name = "Health", description = "Service health."),
        (name = "Profile", description = "The signed-in user's own record."),
        (name = "Admin", description = "User administration. Requires the admin role."),
        (name = "Import", description = "Bulk user import wizard: upload, review, import."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}

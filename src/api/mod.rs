pub mod admin;
pub mod auth;
pub mod health;
pub mod import;
pub mod profile;
pub mod swagger;

use crate::middleware::AuthMiddleware;
use actix_web::web;

/// Largest accepted import upload.
pub const MAX_UPLOAD_BYTES: usize = 8 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        // Health check
        .route("/health", web::get().to(health::health_check))
        // Auth: login is public, session endpoints are guarded
        .service(
            web::scope("/api/v1/auth")
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/me")
                        .wrap(AuthMiddleware)
                        .route(web::get().to(auth::get_me)),
                )
                .service(
                    web::resource("/logout")
                        .wrap(AuthMiddleware)
                        .route(web::post().to(auth::logout)),
                ),
        )
        // Profile: own record
        .service(
            web::scope("/api/v1/profile")
                .wrap(AuthMiddleware)
                .route("", web::get().to(profile::get_profile))
                .route("", web::put().to(profile::update_profile)),
        )
        // Admin: user CRUD
        .service(
            web::scope("/api/v1/admin/users")
                .wrap(AuthMiddleware)
                .route("", web::get().to(admin::list_users))
                .route("", web::post().to(admin::create_user))
                .route("/{id}", web::put().to(admin::update_user))
                .route("/{id}", web::delete().to(admin::delete_user)),
        )
        // Import wizard
        .service(
            web::scope("/api/v1/import")
                .wrap(AuthMiddleware)
                .route("", web::get().to(import::get_wizard))
                .route("/upload", web::post().to(import::upload))
                .route("/confirm", web::post().to(import::confirm))
                .route("/reset", web::post().to(import::reset))
                .route("/batch", web::post().to(import::import_batch)),
        );
}

mod api;
mod config;
mod database;
mod middleware;
mod models;
mod seeds;
mod services;
mod state;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use config::{AppConfig, StoreBackend};
use database::DocumentStore;
use dotenv::dotenv;
use services::LocalIdentityGateway;
use state::AppState;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    log::info!("🚀 Starting Account Console...");

    let store: Arc<dyn DocumentStore> = match &config.store {
        StoreBackend::MongoDB { url } => {
            log::info!("📊 Database: {}", url);
            let db = database::MongoDB::new(url)
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
            log::info!("✅ MongoDB connected successfully");
            Arc::new(db)
        }
        StoreBackend::Memory => {
            log::warn!("⚠️  Using in-memory document store, data is lost on restart");
            Arc::new(database::MemoryStore::new())
        }
    };

    let gateway = Arc::new(LocalIdentityGateway::new(
        store.clone(),
        config.jwt.clone(),
        config.bcrypt_cost,
    ));

    // 🌱 Bootstrap administrator
    if let Some(seed) = &config.admin_seed {
        seeds::admin_seed::seed_admin(store.as_ref(), &gateway, seed).await;
    }

    let mut app_state = AppState::new(store, gateway);
    app_state.import = config.import;
    app_state.require_admin_role = config.require_admin_role;
    let state = web::Data::new(app_state);

    let host = config.host.clone();
    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

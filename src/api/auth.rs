use crate::{
    middleware::auth::SessionToken,
    models::Principal,
    state::AppState,
    utils::AppError,
};
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: Principal,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match state.identity.authenticate(&request.email, &request.password).await {
        Ok(session) => {
            log::info!("✅ Login successful: {}", request.email);
            HttpResponse::Ok().json(LoginResponse {
                success: true,
                token: session.token,
                user: session.principal,
            })
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            AppError::from(e).context("Failed to sign in").error_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current session principal", body = Principal),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(principal: web::ReqData<Principal>) -> HttpResponse {
    log::info!("👤 GET /auth/me - {}", principal.id);

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": principal.into_inner(),
    }))
}

/// Ending the session never fails from the caller's point of view.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Session ended")
    ),
    security(("bearer_auth" = []))
)]
pub async fn logout(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    token: web::ReqData<SessionToken>,
) -> HttpResponse {
    log::info!("👋 POST /auth/logout - {}", principal.id);

    if let Err(e) = state.identity.end_session(&token.0).await {
        log::warn!("⚠️  Failed to log out {}: {}", principal.id, e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Logged out",
    }))
}

use crate::{
    models::Principal,
    services::user_service::{self, ProfileResponse, ProfileUpdateRequest},
    state::AppState,
};
use actix_web::{web, HttpResponse, ResponseError};

/// GET /api/v1/profile - own user record
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Profile of the signed-in user", body = ProfileResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
) -> HttpResponse {
    log::info!("👤 GET /profile - {}", principal.id);

    match user_service::get_profile(state.store.as_ref(), &principal).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            log::error!("❌ Failed to load profile {}: {}", principal.id, e);
            e.context("Failed to load user data").error_response()
        }
    }
}

/// PUT /api/v1/profile - edit name and Netlify repository
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Name missing"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    request: web::Json<ProfileUpdateRequest>,
) -> HttpResponse {
    log::info!("📝 PUT /profile - {}", principal.id);

    match user_service::update_profile(state.store.as_ref(), &principal, request.into_inner()).await {
        Ok(profile) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Profile updated successfully!",
            "profile": profile,
        })),
        Err(e) => {
            log::warn!("❌ Failed to update profile {}: {}", principal.id, e);
            e.context("Failed to update profile").error_response()
        }
    }
}

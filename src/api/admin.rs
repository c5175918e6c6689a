use crate::{
    models::Principal,
    services::user_service::{self, ListUsersResponse, UserForm},
    state::AppState,
    utils::AppError,
};
use actix_web::{web, HttpResponse, ResponseError};

async fn admin_only(state: &AppState, principal: &Principal) -> Result<(), AppError> {
    user_service::require_admin(state.store.as_ref(), principal, state.require_admin_role).await
}

/// GET /api/v1/admin/users - every user document
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    responses(
        (status = 200, description = "All users", body = ListUsersResponse),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
) -> HttpResponse {
    log::info!("📋 GET /admin/users - {}", principal.id);

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    match user_service::list_users(state.store.as_ref()).await {
        Ok(response) => {
            log::info!("✅ Listed {} users", response.count);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::error!("❌ Error listing users: {}", e);
            e.context("Failed to load users").error_response()
        }
    }
}

/// POST /api/v1/admin/users - add a user keyed by email
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "Admin",
    request_body = UserForm,
    responses(
        (status = 201, description = "User added"),
        (status = 400, description = "Missing name or email"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    request: web::Json<UserForm>,
) -> HttpResponse {
    log::info!("📝 POST /admin/users - {} adding {}", principal.id, request.email);

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    match user_service::create_user(state.store.as_ref(), request.into_inner()).await {
        Ok(user) => {
            log::info!("✅ User added: {}", user.id);
            HttpResponse::Created().json(serde_json::json!({
                "success": true,
                "message": "User added successfully!",
                "user": user,
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to add user: {}", e);
            e.context("Failed to save user").error_response()
        }
    }
}

/// PUT /api/v1/admin/users/{id} - overwrite a user document
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User storage key")),
    request_body = UserForm,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Missing name or email"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    user_id: web::Path<String>,
    request: web::Json<UserForm>,
) -> HttpResponse {
    log::info!("🔧 PUT /admin/users/{} - {}", user_id, principal.id);

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    match user_service::update_user(state.store.as_ref(), &user_id, request.into_inner()).await {
        Ok(user) => {
            log::info!("✅ User updated: {}", user.id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "User updated successfully!",
                "user": user,
            }))
        }
        Err(e) => {
            log::warn!("❌ Failed to update user {}: {}", user_id, e);
            e.context("Failed to save user").error_response()
        }
    }
}

/// DELETE /api/v1/admin/users/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "User storage key")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    user_id: web::Path<String>,
) -> HttpResponse {
    log::info!("🗑️  DELETE /admin/users/{} - {}", user_id, principal.id);

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    match user_service::delete_user(state.store.as_ref(), &user_id).await {
        Ok(()) => {
            log::info!("✅ User deleted: {}", user_id);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "User deleted successfully!",
            }))
        }
        Err(e) => {
            log::error!("❌ Failed to delete user {}: {}", user_id, e);
            e.context("Failed to delete user").error_response()
        }
    }
}

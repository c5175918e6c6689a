use crate::{
    models::Principal,
    services::{
        import_service::{self, ImportSummary},
        import_wizard::WizardView,
        user_service,
    },
    state::AppState,
    utils::AppError,
};
use actix_web::{web, HttpResponse, ResponseError};

async fn admin_only(state: &AppState, principal: &Principal) -> Result<(), AppError> {
    user_service::require_admin(state.store.as_ref(), principal, state.require_admin_role).await
}

/// GET /api/v1/import - current wizard step
#[utoipa::path(
    get,
    path = "/api/v1/import",
    tag = "Import",
    responses(
        (status = 200, description = "Wizard state", body = WizardView)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_wizard(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
) -> HttpResponse {
    match state.wizards.view(&principal.id) {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => e.error_response(),
    }
}

/// POST /api/v1/import/upload - raw JSON file body, parsed and validated for review
#[utoipa::path(
    post,
    path = "/api/v1/import/upload",
    tag = "Import",
    request_body(content = String, description = "JSON array of users", content_type = "application/json"),
    responses(
        (status = 200, description = "Batch staged for review", body = WizardView),
        (status = 400, description = "Invalid JSON or missing fields"),
        (status = 409, description = "Wizard is not awaiting an upload")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    body: web::Bytes,
) -> HttpResponse {
    log::info!("📤 POST /import/upload - {} ({} bytes)", principal.id, body.len());

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    let options = state.import;
    let result = state
        .wizards
        .with(&principal.id, |wizard| {
            wizard
                .upload(&body, options)
                .map(|_| WizardView::of(wizard.state()))
        })
        .and_then(|staged| staged);

    match result {
        Ok(view) => {
            log::info!("✅ Staged {} users for review", view.count.unwrap_or(0));
            HttpResponse::Ok().json(view)
        }
        Err(e) => {
            log::warn!("❌ Upload rejected: {}", e);
            e.error_response()
        }
    }
}

/// POST /api/v1/import/confirm - write the reviewed batch
#[utoipa::path(
    post,
    path = "/api/v1/import/confirm",
    tag = "Import",
    responses(
        (status = 200, description = "Users imported", body = WizardView),
        (status = 409, description = "Nothing under review"),
        (status = 500, description = "Write failed; earlier records stay written")
    ),
    security(("bearer_auth" = []))
)]
pub async fn confirm(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
) -> HttpResponse {
    log::info!("📥 POST /import/confirm - {}", principal.id);

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    let run = match state.wizards.begin_import(&principal.id) {
        Ok(run) => run,
        Err(e) => return e.error_response(),
    };

    let outcome = import_service::import_batch(state.store.as_ref(), run.batch()).await;
    let view = run.finish(&outcome);

    match (outcome, view) {
        (Ok(summary), Ok(view)) => {
            log::info!("✅ {} imported {} users", principal.id, summary.written);
            HttpResponse::Ok().json(view.with_message("Users imported successfully!"))
        }
        (Err(e), _) => AppError::from(e)
            .context("Failed to import users")
            .error_response(),
        (Ok(_), Err(e)) => e.error_response(),
    }
}

/// POST /api/v1/import/reset - back to the upload step
#[utoipa::path(
    post,
    path = "/api/v1/import/reset",
    tag = "Import",
    responses(
        (status = 200, description = "Wizard reset", body = WizardView),
        (status = 409, description = "Import in progress")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reset(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
) -> HttpResponse {
    log::info!("↩️  POST /import/reset - {}", principal.id);

    let result = state
        .wizards
        .with(&principal.id, |wizard| {
            wizard.reset().map(|_| WizardView::of(wizard.state()))
        })
        .and_then(|reset| reset);

    match result {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => e.error_response(),
    }
}

/// POST /api/v1/import/batch - validate and import in one request
#[utoipa::path(
    post,
    path = "/api/v1/import/batch",
    tag = "Import",
    request_body(content = String, description = "JSON array of users", content_type = "application/json"),
    responses(
        (status = 200, description = "Users imported", body = ImportSummary),
        (status = 400, description = "Invalid JSON or missing fields"),
        (status = 500, description = "Write failed; earlier records stay written")
    ),
    security(("bearer_auth" = []))
)]
pub async fn import_batch(
    state: web::Data<AppState>,
    principal: web::ReqData<Principal>,
    body: web::Bytes,
) -> HttpResponse {
    log::info!("📥 POST /import/batch - {} ({} bytes)", principal.id, body.len());

    if let Err(e) = admin_only(&state, &principal).await {
        return e.error_response();
    }

    match import_service::run_import(state.store.as_ref(), &body, state.import).await {
        Ok(summary) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Users imported successfully!",
            "written": summary.written,
        })),
        Err(e) => {
            log::warn!("❌ Batch import failed: {}", e);
            AppError::from(e).context("Failed to import users").error_response()
        }
    }
}

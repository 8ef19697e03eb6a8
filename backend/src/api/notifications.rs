use actix_web::{web, HttpResponse, Responder};
use shared::{ApiError, ApiResponse};

use crate::api::error_response;
use crate::auth::AuthedUser;
use crate::services::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list))
            .route("/{id}/read", web::post().to(mark_read)),
    );
}

async fn list(state: web::Data<AppState>, auth: AuthedUser) -> impl Responder {
    match state.database.list_notifications(auth.0.id, 50).await {
        Ok(notifications) => HttpResponse::Ok().json(ApiResponse::success(notifications)),
        Err(e) => error_response(e.into()),
    }
}

async fn mark_read(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match state
        .database
        .mark_notification_read(path.into_inner(), auth.0.id)
        .await
    {
        Ok(true) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "read": true
        }))),
        Ok(false) => error_response(ApiError::NotFound("Notification not found".to_string())),
        Err(e) => error_response(e.into()),
    }
}

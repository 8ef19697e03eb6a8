use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use shared::{ApiError, ApiResponse, RegisterUserRequest, User, UserRole};

use crate::api::error_response;
use crate::auth::AuthedUser;
use crate::services::{AppState, AuditSink};

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub loyalty_tier: String,
    pub loyalty_discount: u32,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        let loyalty_tier = user.loyalty_tier().to_string();
        let loyalty_discount = user.loyalty_discount();
        Self { user, loyalty_tier, loyalty_discount }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/register", web::post().to(register))
            .route("/me", web::get().to(me))
            .route("/me/audit", web::get().to(my_audit_trail)),
    );
}

/// Create an account. New wallets start with the configured simulated
/// credit; the role defaults to guest and must be a known value.
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterUserRequest>,
) -> impl Responder {
    let email = req.email.trim().to_ascii_lowercase();
    if !email.contains('@') || email.len() < 3 {
        return error_response(ApiError::Validation("Invalid email address".to_string()));
    }
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return error_response(ApiError::Validation("Display name is required".to_string()));
    }

    let role = match req.role.as_deref() {
        None => UserRole::Guest,
        Some(raw) => match UserRole::parse(raw) {
            Some(role) => role,
            None => {
                return error_response(ApiError::Validation(format!("Unknown role: {}", raw)));
            }
        },
    };

    let user = match state
        .database
        .create_user(&email, display_name, role.as_str(), state.config.signup_wallet_credit)
        .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
            return error_response(ApiError::Conflict("Email already registered".to_string()));
        }
        Err(e) => return error_response(e.into()),
    };

    AuditSink::log(
        &state.database,
        Some(user.id),
        "user_registered",
        serde_json::json!({ "email": user.email, "role": user.role }),
    )
    .await;

    tracing::info!("User {} registered as {}", user.id, user.role);
    HttpResponse::Created().json(ApiResponse::success(ProfileResponse::from(user)))
}

async fn me(auth: AuthedUser) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(ProfileResponse::from(auth.0)))
}

async fn my_audit_trail(state: web::Data<AppState>, auth: AuthedUser) -> impl Responder {
    match state.database.list_audit_entries(auth.0.id, 50).await {
        Ok(entries) => HttpResponse::Ok().json(ApiResponse::success(entries)),
        Err(e) => error_response(e.into()),
    }
}

use actix_web::{web, HttpResponse, Responder};
use shared::{
    utils, ApiError, ApiResponse, PaginatedResponse, TopupRequest, TopupResponse,
    TransactionType, WalletBalanceResponse, PaginationParams,
};

use crate::api::error_response;
use crate::auth::AuthedUser;
use crate::services::{AppState, AuditSink, Ledger};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/wallet")
            .route("", web::get().to(balance))
            .route("/topup", web::post().to(topup))
            .route("/transactions", web::get().to(transactions)),
    );
}

async fn balance(auth: AuthedUser) -> impl Responder {
    let user = auth.0;
    HttpResponse::Ok().json(ApiResponse::success(WalletBalanceResponse {
        balance: user.wallet_balance,
        loyalty_points: user.loyalty_points,
        loyalty_tier: user.loyalty_tier().to_string(),
    }))
}

/// Simulated fiat top-up, bounded per request.
async fn topup(
    state: web::Data<AppState>,
    auth: AuthedUser,
    req: web::Json<TopupRequest>,
) -> impl Responder {
    let amount = match req.amount {
        Some(amount) => amount,
        None => return error_response(ApiError::Validation("Amount is required".to_string())),
    };
    let amount = match utils::validate_topup_amount(amount) {
        Ok(amount) => amount,
        Err(e) => return error_response(e),
    };

    let result = async {
        let mut tx = state.database.begin().await?;
        Ledger::apply_delta(
            &mut tx,
            auth.0.id,
            amount,
            TransactionType::WalletTopup,
            "Wallet top-up",
            None,
        )
        .await?;
        tx.commit().await?;
        state
            .database
            .get_user(auth.0.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
    .await;

    match result {
        Ok(user) => {
            AuditSink::log(
                &state.database,
                Some(user.id),
                "wallet_topup",
                serde_json::json!({ "amount": amount.to_string() }),
            )
            .await;
            HttpResponse::Ok().json(ApiResponse::success(TopupResponse {
                message: format!("Added {} to wallet", amount),
                new_balance: user.wallet_balance,
            }))
        }
        Err(e) => error_response(e),
    }
}

/// Paginated ledger history, newest first.
async fn transactions(
    state: web::Data<AppState>,
    auth: AuthedUser,
    page: web::Query<PaginationParams>,
) -> impl Responder {
    let limit = page.limit.clamp(1, 100);
    let offset = page.offset.max(0);

    let result = async {
        let items = state
            .database
            .list_user_transactions(auth.0.id, limit, offset)
            .await?;
        let total = state.database.count_user_transactions(auth.0.id).await?;
        Ok::<_, ApiError>(PaginatedResponse::new(items, total, limit, offset))
    }
    .await;

    match result {
        Ok(response) => HttpResponse::Ok().json(ApiResponse::success(response)),
        Err(e) => error_response(e),
    }
}

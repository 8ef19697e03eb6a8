use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use shared::{
    ApiError, ApiResponse, Booking, CreateBookingRequest, InitiateBookingRequest,
};

use crate::api::error_response;
use crate::auth::AuthedUser;
use crate::services::{AppState, BookingManager, PaymentIntake};

#[derive(Serialize)]
pub struct CompletionResponse {
    pub booking: Booking,
    pub payout: rust_decimal::Decimal,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bookings")
            .route("", web::post().to(create))
            .route("", web::get().to(list))
            .route("/host", web::get().to(host_list))
            .route("/initiate", web::post().to(initiate))
            .route("/payments/currencies", web::get().to(currencies))
            .route("/payments/{payment_id}", web::get().to(payment_status))
            .route("/payments/{payment_id}/confirm", web::post().to(confirm_payment))
            .route("/{id}", web::get().to(detail))
            .route("/{id}/cancel", web::post().to(cancel))
            .route("/{id}/complete", web::post().to(complete)),
    );
}

/// Wallet-funded booking; confirmed immediately when the dates are free and
/// the balance covers the total.
async fn create(
    state: web::Data<AppState>,
    auth: AuthedUser,
    req: web::Json<CreateBookingRequest>,
) -> impl Responder {
    match BookingManager::create_booking(&state, &auth.0, &req).await {
        Ok(booking) => HttpResponse::Created().json(ApiResponse::success(booking)),
        Err(e) => error_response(e),
    }
}

/// Crypto-funded booking, step one: quote a payment intent.
async fn initiate(
    state: web::Data<AppState>,
    auth: AuthedUser,
    req: web::Json<InitiateBookingRequest>,
) -> impl Responder {
    match PaymentIntake::create_intent(&state, &auth.0, &req).await {
        Ok(intent) => HttpResponse::Created().json(ApiResponse::success(intent)),
        Err(e) => error_response(e),
    }
}

/// Tickers accepted by the simulated checkout.
async fn currencies(_auth: AuthedUser) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "currencies": crate::services::payments::SUPPORTED_CURRENCIES
    })))
}

async fn payment_status(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<String>,
) -> impl Responder {
    match PaymentIntake::payment_status(&state, &auth.0, &path).await {
        Ok(status) => HttpResponse::Ok().json(ApiResponse::success(status)),
        Err(e) => error_response(e),
    }
}

/// Crypto-funded booking, step two: simulate the on-chain settlement and
/// materialise the booking. Idempotent per payment; a repeat confirm is a 409.
async fn confirm_payment(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<String>,
) -> impl Responder {
    match PaymentIntake::confirm_payment(&state, &auth.0, &path).await {
        Ok(status) => HttpResponse::Ok().json(ApiResponse::success(status)),
        Err(e) => error_response(e),
    }
}

async fn list(state: web::Data<AppState>, auth: AuthedUser) -> impl Responder {
    match state.database.list_guest_bookings(auth.0.id).await {
        Ok(bookings) => HttpResponse::Ok().json(ApiResponse::success(bookings)),
        Err(e) => error_response(e.into()),
    }
}

/// Bookings across every listing the caller hosts.
async fn host_list(state: web::Data<AppState>, auth: AuthedUser) -> impl Responder {
    match state.database.list_host_bookings(auth.0.id).await {
        Ok(bookings) => HttpResponse::Ok().json(ApiResponse::success(bookings)),
        Err(e) => error_response(e.into()),
    }
}

/// Visible to the guest who booked and to the host of the listing; anyone
/// else sees a 404, not a 403, so booking ids don't leak.
async fn detail(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> impl Responder {
    let booking = match state.database.get_booking(path.into_inner()).await {
        Ok(Some(booking)) => booking,
        Ok(None) => return error_response(ApiError::NotFound("Booking not found".to_string())),
        Err(e) => return error_response(e.into()),
    };

    if booking.guest_id != auth.0.id {
        match state.database.get_property(booking.listing_id).await {
            Ok(Some(property)) if property.host_id == auth.0.id => {}
            Ok(_) => {
                return error_response(ApiError::NotFound("Booking not found".to_string()));
            }
            Err(e) => return error_response(e.into()),
        }
    }

    HttpResponse::Ok().json(ApiResponse::success(booking))
}

async fn cancel(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match BookingManager::cancel_booking(&state, &auth.0, path.into_inner()).await {
        Ok(booking) => HttpResponse::Ok().json(ApiResponse::success(booking)),
        Err(e) => error_response(e),
    }
}

async fn complete(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> impl Responder {
    match BookingManager::complete_booking(&state, &auth.0, path.into_inner()).await {
        Ok((booking, payout)) => {
            HttpResponse::Ok().json(ApiResponse::success(CompletionResponse { booking, payout }))
        }
        Err(e) => error_response(e),
    }
}

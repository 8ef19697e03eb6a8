pub mod bookings;
pub mod health;
pub mod notifications;
pub mod properties;
pub mod reviews;
pub mod users;
pub mod wallet;

use actix_web::{http::StatusCode, HttpResponse};
use shared::{ApiError, ApiResponse};

/// Map a service error onto the response envelope. Server-side failures are
/// logged here so handlers never have to.
pub(crate) fn error_response(err: ApiError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    HttpResponse::build(status).json(ApiResponse::<()>::error(err.to_string()))
}

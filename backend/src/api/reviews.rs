use actix_web::{web, HttpResponse, Responder};
use shared::{utils, ApiError, ApiResponse, BookingStatus, CreateReviewRequest};

use crate::api::error_response;
use crate::auth::AuthedUser;
use crate::services::{AppState, AuditSink};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/reviews").route("", web::post().to(create)));
}

/// One review per booking, and only once the stay is completed.
async fn create(
    state: web::Data<AppState>,
    auth: AuthedUser,
    req: web::Json<CreateReviewRequest>,
) -> impl Responder {
    let (booking_id, rating) = match (req.booking_id, req.rating) {
        (Some(booking_id), Some(rating)) => (booking_id, rating),
        _ => {
            return error_response(ApiError::Validation(
                "booking_id and rating are required".to_string(),
            ));
        }
    };
    let rating = match utils::validate_rating(rating) {
        Ok(rating) => rating,
        Err(e) => return error_response(e),
    };

    let booking = match state.database.get_booking_for_guest(booking_id, auth.0.id).await {
        Ok(Some(booking)) => booking,
        Ok(None) => return error_response(ApiError::NotFound("Booking not found".to_string())),
        Err(e) => return error_response(e.into()),
    };
    if booking.status != BookingStatus::Completed.as_str() {
        return error_response(ApiError::Validation(
            "You can only review completed stays".to_string(),
        ));
    }

    let comment = req.comment.as_deref().unwrap_or_default();
    match state
        .database
        .insert_review(auth.0.id, booking.listing_id, booking.id, rating, comment)
        .await
    {
        Ok(review) => {
            AuditSink::log(
                &state.database,
                Some(auth.0.id),
                "review_created",
                serde_json::json!({ "review_id": review.id, "rating": rating }),
            )
            .await;
            HttpResponse::Created().json(ApiResponse::success(review))
        }
        Err(e) => error_response(e),
    }
}

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use shared::{
    ApiError, ApiResponse, AvailabilityResponse, CreatePropertyRequest, PaginationParams,
    Property, PropertyDetail, PropertyFilter,
};

use crate::api::error_response;
use crate::auth::AuthedUser;
use crate::services::{conflict, AppState, AuditSink};

#[derive(Serialize)]
pub struct RecommendationsResponse {
    #[serde(rename = "type")]
    pub recommendation_type: String,
    pub properties: Vec<Property>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/properties")
            .route("", web::get().to(list))
            .route("", web::post().to(create))
            .route("/mine", web::get().to(mine))
            .route("/recommendations", web::get().to(recommendations))
            .route("/{id}", web::get().to(detail))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(deactivate))
            .route("/{id}/availability", web::get().to(availability))
            .route("/{id}/reviews", web::get().to(reviews)),
    );
}

async fn list(
    state: web::Data<AppState>,
    filter: web::Query<PropertyFilter>,
    page: web::Query<PaginationParams>,
) -> impl Responder {
    let limit = page.limit.clamp(1, 100);
    let offset = page.offset.max(0);
    match state.database.list_properties(&filter, limit, offset).await {
        Ok(properties) => HttpResponse::Ok().json(ApiResponse::success(properties)),
        Err(e) => error_response(e.into()),
    }
}

/// Property with its on-read rating aggregate. The property row itself is
/// served through the cache; ratings are always computed fresh.
async fn detail(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let property_id = path.into_inner();

    let property = match load_property(&state, property_id).await {
        Ok(property) => property,
        Err(e) => return error_response(e),
    };

    match state.database.get_property_rating(property_id).await {
        Ok((avg_rating, review_count)) => HttpResponse::Ok().json(ApiResponse::success(
            PropertyDetail { property, avg_rating, review_count },
        )),
        Err(e) => error_response(e.into()),
    }
}

async fn load_property(state: &AppState, property_id: i64) -> Result<Property, ApiError> {
    if let Some(property) = state.cache.get_property(property_id).await {
        if property.is_active {
            return Ok(property);
        }
    }
    let property = state
        .database
        .get_active_property(property_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))?;
    state.cache.set_property(property.clone()).await;
    Ok(property)
}

async fn create(
    state: web::Data<AppState>,
    auth: AuthedUser,
    req: web::Json<CreatePropertyRequest>,
) -> impl Responder {
    if !auth.0.is_host() {
        return error_response(ApiError::Forbidden("Host role required".to_string()));
    }
    if let Err(e) = validate_listing(&req) {
        return error_response(e);
    }

    match state.database.insert_property(auth.0.id, &req).await {
        Ok(property) => {
            AuditSink::log(
                &state.database,
                Some(auth.0.id),
                "property_created",
                serde_json::json!({ "property_id": property.id, "title": property.title }),
            )
            .await;
            HttpResponse::Created().json(ApiResponse::success(property))
        }
        Err(e) => error_response(e.into()),
    }
}

async fn update(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
    req: web::Json<CreatePropertyRequest>,
) -> impl Responder {
    let property_id = path.into_inner();
    if !auth.0.is_host() {
        return error_response(ApiError::Forbidden("Host role required".to_string()));
    }
    if let Err(e) = validate_listing(&req) {
        return error_response(e);
    }

    match state.database.update_property(property_id, auth.0.id, &req).await {
        Ok(Some(property)) => {
            state.cache.invalidate_property(property_id).await;
            HttpResponse::Ok().json(ApiResponse::success(property))
        }
        Ok(None) => error_response(ApiError::NotFound("Property not found".to_string())),
        Err(e) => error_response(e.into()),
    }
}

/// Soft delete. Existing bookings keep their rows and their history.
async fn deactivate(
    state: web::Data<AppState>,
    auth: AuthedUser,
    path: web::Path<i64>,
) -> impl Responder {
    let property_id = path.into_inner();
    match state.database.deactivate_property(property_id, auth.0.id).await {
        Ok(true) => {
            state.cache.invalidate_property(property_id).await;
            AuditSink::log(
                &state.database,
                Some(auth.0.id),
                "property_deactivated",
                serde_json::json!({ "property_id": property_id }),
            )
            .await;
            HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
                "deactivated": true
            })))
        }
        Ok(false) => error_response(ApiError::NotFound("Property not found".to_string())),
        Err(e) => error_response(e.into()),
    }
}

async fn mine(state: web::Data<AppState>, auth: AuthedUser) -> impl Responder {
    match state.database.list_host_properties(auth.0.id).await {
        Ok(properties) => HttpResponse::Ok().json(ApiResponse::success(properties)),
        Err(e) => error_response(e.into()),
    }
}

/// Personalised picks for guests with booking history: listings in the city
/// of the most recently booked property, minus anything already booked, when
/// that yields at least three results. Everyone else gets the newest
/// listings. Works without authentication.
async fn recommendations(
    state: web::Data<AppState>,
    auth: Option<AuthedUser>,
) -> impl Responder {
    let result = async {
        if let Some(AuthedUser(user)) = auth {
            let booked = state.database.list_booked_listing_ids(user.id).await?;
            if let Some(&latest) = booked.first() {
                if let Some(last_booked) = state.database.get_property(latest).await? {
                    let similar = state
                        .database
                        .list_similar_properties(&last_booked.city, &booked, 6)
                        .await?;
                    if similar.len() >= 3 {
                        return Ok::<_, ApiError>(RecommendationsResponse {
                            recommendation_type: "personalized".to_string(),
                            properties: similar,
                        });
                    }
                }
            }
        }
        Ok(RecommendationsResponse {
            recommendation_type: "popular".to_string(),
            properties: state.database.list_newest_properties(8).await?,
        })
    }
    .await;

    match result {
        Ok(response) => HttpResponse::Ok().json(ApiResponse::success(response)),
        Err(e) => error_response(e),
    }
}

/// Individually blocked dates for a listing, check-out days excluded.
async fn availability(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    let listing_id = path.into_inner();

    if let Err(e) = load_property(&state, listing_id).await {
        return error_response(e);
    }

    match state.database.get_active_booking_ranges(listing_id).await {
        Ok(ranges) => HttpResponse::Ok().json(ApiResponse::success(AvailabilityResponse {
            listing_id,
            blocked_dates: conflict::expand_blocked_dates(&ranges),
        })),
        Err(e) => error_response(e.into()),
    }
}

async fn reviews(state: web::Data<AppState>, path: web::Path<i64>) -> impl Responder {
    match state.database.list_property_reviews(path.into_inner()).await {
        Ok(reviews) => HttpResponse::Ok().json(ApiResponse::success(reviews)),
        Err(e) => error_response(e.into()),
    }
}

fn validate_listing(req: &CreatePropertyRequest) -> Result<(), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("Title is required".to_string()));
    }
    if req.price_per_night <= rust_decimal::Decimal::ZERO {
        return Err(ApiError::Validation(
            "Price per night must be positive".to_string(),
        ));
    }
    if req.max_guests < 1 {
        return Err(ApiError::Validation(
            "Max guests must be at least 1".to_string(),
        ));
    }
    Ok(())
}

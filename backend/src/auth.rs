//! Request identity.
//!
//! Token issuance and verification live in the edge auth layer; by the time a
//! request reaches this service the authenticated user id arrives in the
//! `X-User-Id` header. The extractor resolves it to a full user row so
//! handlers can check roles, ownership and balances.

use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, error::InternalError, web, FromRequest, HttpRequest};
use shared::{ApiError, User};

use crate::api::error_response;
use crate::services::AppState;

pub struct AuthedUser(pub User);

impl FromRequest for AuthedUser {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let header = req
            .headers()
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Box::pin(async move {
            let state = state.ok_or_else(|| unauthorized("Service state unavailable"))?;

            let user_id = header
                .ok_or_else(|| unauthorized("Missing X-User-Id header"))?
                .parse::<i64>()
                .map_err(|_| unauthorized("Invalid X-User-Id header"))?;

            match state.database.get_user(user_id).await {
                Ok(Some(user)) => Ok(AuthedUser(user)),
                Ok(None) => Err(unauthorized("Unknown user")),
                Err(e) => {
                    tracing::error!("Failed to load authenticated user {}: {}", user_id, e);
                    Err(unauthorized("Authentication lookup failed"))
                }
            }
        })
    }
}

/// Extractor failures share the service's error taxonomy and envelope.
fn unauthorized(message: &str) -> actix_web::Error {
    let err = ApiError::Unauthorized(message.to_string());
    let cause = err.to_string();
    InternalError::from_response(cause, error_response(err)).into()
}

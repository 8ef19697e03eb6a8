//! Booking lifecycle manager.
//!
//! One canonical implementation per transition: create (wallet-funded),
//! cancel, complete. Each transition wraps its conflict check, booking row
//! mutation and wallet deltas in a single database transaction; audit
//! entries and notifications run after commit and are best-effort.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    utils, ApiError, ApiResult, Booking, BookingStatus, CreateBookingRequest, NotificationType,
    TransactionType, User,
};

use crate::monitoring::metrics;
use crate::services::{conflict, AppState, AuditSink, Ledger};

/// A validated booking request: present fields, parsed dates.
#[derive(Debug, Clone, Copy)]
pub struct BookingParams {
    pub listing_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests_count: i32,
}

pub struct BookingManager;

impl BookingManager {
    /// Field-level validation; runs before anything touches the database.
    pub fn validate_request(req: &CreateBookingRequest) -> ApiResult<BookingParams> {
        let (listing_id, check_in_raw, check_out_raw) =
            match (req.listing_id, req.check_in.as_deref(), req.check_out.as_deref()) {
                (Some(listing_id), Some(ci), Some(co)) => (listing_id, ci, co),
                _ => {
                    let mut missing = Vec::new();
                    if req.listing_id.is_none() {
                        missing.push("listing_id");
                    }
                    if req.check_in.is_none() {
                        missing.push("check_in");
                    }
                    if req.check_out.is_none() {
                        missing.push("check_out");
                    }
                    return Err(ApiError::Validation(format!(
                        "Missing required fields: {}",
                        missing.join(", ")
                    )));
                }
            };

        let check_in = utils::parse_date(check_in_raw)?;
        let check_out = utils::parse_date(check_out_raw)?;

        if check_in >= check_out {
            return Err(ApiError::Validation(
                "Check-out must be after check-in".to_string(),
            ));
        }
        if utils::nights(check_in, check_out) < 1 {
            return Err(ApiError::Validation("Minimum stay is 1 night".to_string()));
        }

        Ok(BookingParams {
            listing_id,
            check_in,
            check_out,
            guests_count: req.guests_count.unwrap_or(1),
        })
    }

    /// Wallet-funded booking. The conflict check, booking insert and guest
    /// debit commit atomically; an insufficient balance rolls the whole
    /// transaction back so no tentative row survives.
    pub async fn create_booking(
        state: &AppState,
        guest: &User,
        req: &CreateBookingRequest,
    ) -> ApiResult<Booking> {
        let params = Self::validate_request(req)?;

        let property = state
            .database
            .get_active_property(params.listing_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))?;

        if params.guests_count > property.max_guests {
            return Err(ApiError::Validation(format!(
                "Max guests allowed: {}",
                property.max_guests
            )));
        }

        let nights = utils::nights(params.check_in, params.check_out);
        let total = utils::total_price(property.price_per_night, nights);

        let mut tx = state.database.begin().await?;

        // Serialise concurrent booking attempts on the same listing.
        sqlx::query("SELECT id FROM properties WHERE id = $1 FOR UPDATE")
            .bind(params.listing_id)
            .execute(&mut *tx)
            .await?;

        if conflict::has_conflict(
            &mut *tx,
            params.listing_id,
            params.check_in,
            params.check_out,
            None,
        )
        .await?
        {
            return Err(ApiError::Validation(
                "Selected dates are not available".to_string(),
            ));
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (guest_id, listing_id, check_in, check_out, guests_count, total_price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(guest.id)
        .bind(params.listing_id)
        .bind(params.check_in)
        .bind(params.check_out)
        .bind(params.guests_count)
        .bind(total)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let debited = Ledger::apply_guarded_debit(
            &mut tx,
            guest.id,
            total,
            TransactionType::BookingPayment,
            &format!("Payment for {}", property.title),
            Some(booking.id),
        )
        .await?;

        if debited.is_none() {
            tx.rollback().await?;
            return Err(ApiError::Validation(
                "Insufficient wallet balance".to_string(),
            ));
        }

        tx.commit().await?;
        metrics::increment_bookings_created();

        AuditSink::log(
            &state.database,
            Some(guest.id),
            "booking_created",
            serde_json::json!({ "booking_id": booking.id, "amount": total.to_string() }),
        )
        .await;
        AuditSink::notify(
            &state.database,
            property.host_id,
            "New booking",
            &format!(
                "{} booked {} ({} to {})",
                guest.display_name, property.title, booking.check_in, booking.check_out
            ),
            NotificationType::Booking,
            &format!("/bookings/{}", booking.id),
        )
        .await;

        tracing::info!(
            "Booking {} confirmed for guest {} on listing {} ({} nights, {})",
            booking.id,
            guest.id,
            params.listing_id,
            nights,
            total
        );

        Ok(booking)
    }

    /// Cancel from pending or confirmed. The guest refund commits with the
    /// status change; the host payout reversal runs afterwards and is
    /// best-effort by design - a host who cannot cover the clawback does not
    /// block the guest's cancellation.
    pub async fn cancel_booking(
        state: &AppState,
        guest: &User,
        booking_id: i64,
    ) -> ApiResult<Booking> {
        let booking = state
            .database
            .get_booking_for_guest(booking_id, guest.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

        if !booking.is_cancellable() {
            return Err(ApiError::Validation(
                "Cannot cancel this booking".to_string(),
            ));
        }

        let property = state
            .database
            .get_property(booking.listing_id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("Listing {} missing for booking", booking.listing_id))
            })?;

        let mut tx = state.database.begin().await?;

        let cancelled = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status IN ('pending', 'confirmed')
            RETURNING *
            "#,
        )
        .bind(BookingStatus::Cancelled.as_str())
        .bind(booking.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::Validation("Cannot cancel this booking".to_string()))?;

        Ledger::apply_delta(
            &mut tx,
            guest.id,
            booking.total_price,
            TransactionType::Refund,
            &format!("Refund for cancelled {}", property.title),
            Some(booking.id),
        )
        .await?;

        tx.commit().await?;
        metrics::increment_bookings_cancelled();

        // Claw back the host payout. Skipped, not failed, when the host
        // balance cannot cover it; the cancellation is already committed.
        let reversal = utils::host_payout(booking.total_price);
        match Self::reverse_host_payout(state, property.host_id, reversal, &booking).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    "Payout reversal of {} skipped for host {}: insufficient balance",
                    reversal,
                    property.host_id
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Payout reversal of {} failed for host {}: {}",
                    reversal,
                    property.host_id,
                    e
                );
            }
        }

        AuditSink::notify(
            &state.database,
            property.host_id,
            "Booking cancelled",
            &format!(
                "{} cancelled the booking for {} ({} to {})",
                guest.display_name, property.title, booking.check_in, booking.check_out
            ),
            NotificationType::Cancellation,
            &format!("/bookings/{}", booking.id),
        )
        .await;
        AuditSink::log(
            &state.database,
            Some(guest.id),
            "booking_cancelled",
            serde_json::json!({ "booking_id": booking.id }),
        )
        .await;

        Ok(cancelled)
    }

    async fn reverse_host_payout(
        state: &AppState,
        host_id: i64,
        reversal: Decimal,
        booking: &Booking,
    ) -> ApiResult<bool> {
        let mut tx = state.database.begin().await?;
        let debited = Ledger::apply_guarded_debit(
            &mut tx,
            host_id,
            reversal,
            TransactionType::PayoutReversal,
            &format!("Payout reversal for cancelled booking #{}", booking.id),
            Some(booking.id),
        )
        .await?;
        tx.commit().await?;
        Ok(debited.is_some())
    }

    /// Host-only completion once the stay is over; pays out 97% of the
    /// booking total. Returns the completed booking and the payout amount.
    pub async fn complete_booking(
        state: &AppState,
        actor: &User,
        booking_id: i64,
    ) -> ApiResult<(Booking, Decimal)> {
        let booking = state
            .database
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

        let property = state
            .database
            .get_property(booking.listing_id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("Listing {} missing for booking", booking.listing_id))
            })?;

        if property.host_id != actor.id {
            return Err(ApiError::Forbidden("Unauthorized".to_string()));
        }
        if booking.status != BookingStatus::Confirmed.as_str() {
            return Err(ApiError::Validation(
                "Only confirmed bookings can be completed".to_string(),
            ));
        }
        if booking.check_out > Utc::now().date_naive() {
            return Err(ApiError::Validation(
                "Check-out date has not passed yet".to_string(),
            ));
        }

        let payout = utils::host_payout(booking.total_price);

        let mut tx = state.database.begin().await?;

        let completed = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = 'confirmed'
            RETURNING *
            "#,
        )
        .bind(BookingStatus::Completed.as_str())
        .bind(booking.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            ApiError::Validation("Only confirmed bookings can be completed".to_string())
        })?;

        Ledger::apply_delta(
            &mut tx,
            actor.id,
            payout,
            TransactionType::HostPayout,
            &format!("Payout for {}", property.title),
            Some(booking.id),
        )
        .await?;

        tx.commit().await?;

        AuditSink::log(
            &state.database,
            Some(actor.id),
            "booking_completed",
            serde_json::json!({ "booking_id": booking.id, "payout": payout.to_string() }),
        )
        .await;
        AuditSink::notify(
            &state.database,
            booking.guest_id,
            "Stay completed",
            &format!("Your stay at {} is complete. Leave a review!", property.title),
            NotificationType::Review,
            &format!("/bookings/{}", booking.id),
        )
        .await;

        Ok((completed, payout))
    }
}

//! Simulated crypto payment intake.
//!
//! An intent quotes a pay-amount at a fixed exchange rate and parks the
//! booking parameters in `pending_crypto_payments.meta`. Confirmation locks
//! the pending row, re-checks availability and materialises the booking -
//! exactly once, no matter how many confirm calls race.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use shared::{
    utils, ApiError, ApiResult, Booking, BookingStatus, CreateBookingRequest,
    InitiateBookingRequest, NotificationType, PaymentIntentResponse, PaymentStatus,
    PaymentStatusResponse, PendingCryptoPayment, TransactionType, User,
};
use uuid::Uuid;

use crate::monitoring::metrics;
use crate::services::{conflict, AppState, AuditSink, BookingManager, Ledger};

/// Tickers with a fixed rate in the quote table, in display order.
pub const SUPPORTED_CURRENCIES: [&str; 7] =
    ["btc", "eth", "usdt", "ltc", "bnb", "sol", "doge"];

/// Fixed USD -> crypto exchange rates. Unknown currencies fall back to 1:1,
/// which keeps the simulation usable with any ticker a client sends.
pub fn usd_rate(currency: &str) -> Decimal {
    match currency {
        "btc" => Decimal::new(156, 7),    // 0.0000156
        "eth" => Decimal::new(285, 6),    // 0.000285
        "usdt" => Decimal::ONE,
        "ltc" => Decimal::new(112, 4),    // 0.0112
        "bnb" => Decimal::new(174, 5),    // 0.00174
        "sol" => Decimal::new(617, 5),    // 0.00617
        "doge" => Decimal::new(682, 2),   // 6.82
        _ => Decimal::ONE,
    }
}

pub fn network_label(currency: &str) -> &'static str {
    match currency {
        "btc" => "Bitcoin",
        "eth" => "Ethereum (ERC-20)",
        "usdt" => "Tron (TRC-20)",
        "ltc" => "Litecoin",
        "bnb" => "BNB Chain (BEP-2)",
        "sol" => "Solana",
        "doge" => "Dogecoin",
        _ => "Ethereum (ERC-20)",
    }
}

const HEX: &[u8] = b"0123456789abcdef";
const BECH32: &[u8] = b"023456789acdefghjklmnpqrstuvwxyz";
const BASE58: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn random_chars(charset: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Deposit address in the currency's conventional format. Addresses are
/// simulated and never checksummed.
pub fn make_address(currency: &str) -> String {
    match currency {
        "btc" => format!("bc1q{}", random_chars(BECH32, 38)),
        "eth" => format!("0x{}", random_chars(HEX, 40)),
        "usdt" => format!("T{}", random_chars(BASE58, 33)),
        "ltc" => format!("L{}", random_chars(BASE58, 33)),
        "bnb" => format!("bnb1{}", random_chars(BECH32, 38)),
        "sol" => random_chars(BASE58, 44),
        "doge" => format!("D{}", random_chars(BASE58, 33)),
        _ => format!("0x{}", random_chars(HEX, 40)),
    }
}

/// A quote is confirmable only within its advertised lifetime.
pub fn intent_expired(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    expiry_seconds: u64,
) -> bool {
    now - created_at > chrono::Duration::seconds(expiry_seconds as i64)
}

pub struct PaymentIntake;

impl PaymentIntake {
    /// Quote a crypto payment for a prospective booking. No booking row is
    /// created yet; availability is pre-checked so obviously dead intents are
    /// rejected up front, but the binding check happens at confirmation.
    pub async fn create_intent(
        state: &AppState,
        guest: &User,
        req: &InitiateBookingRequest,
    ) -> ApiResult<PaymentIntentResponse> {
        let params = BookingManager::validate_request(&CreateBookingRequest {
            listing_id: req.listing_id,
            check_in: req.check_in.clone(),
            check_out: req.check_out.clone(),
            guests_count: req.guests_count,
        })?;
        let currency = req
            .currency
            .as_deref()
            .unwrap_or("btc")
            .to_ascii_lowercase();

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

        if conflict::has_conflict(
            state.database.pool(),
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

        let nights = utils::nights(params.check_in, params.check_out);
        let amount_usd = utils::total_price(property.price_per_night, nights);
        let pay_amount = utils::crypto_pay_amount(amount_usd, usd_rate(&currency));
        let payment_id = format!("pay_{}", Uuid::new_v4().simple());
        let pay_address = make_address(&currency);

        let meta = serde_json::json!({
            "listing_id": params.listing_id,
            "check_in": params.check_in.to_string(),
            "check_out": params.check_out.to_string(),
            "guests_count": params.guests_count,
            "property": property.title.clone(),
        });

        state
            .database
            .insert_pending_payment(guest.id, &payment_id, amount_usd, &currency, meta)
            .await?;
        metrics::increment_payment_intents();

        tracing::info!(
            "Payment intent {} created: {} {} for listing {} ({} USD)",
            payment_id,
            pay_amount,
            currency,
            params.listing_id,
            amount_usd
        );

        Ok(PaymentIntentResponse {
            payment_id,
            pay_address,
            pay_amount,
            pay_currency: currency.to_ascii_uppercase(),
            amount_usd,
            nights,
            property: property.title,
            status: PaymentStatus::Waiting.as_str().to_string(),
            network: network_label(&currency).to_string(),
            expires_in: state.config.payment_expiry_seconds,
        })
    }

    /// Confirm a waiting payment and materialise its booking. The pending
    /// row is locked for the duration, so a second confirm either waits and
    /// then sees `finished`, or never observes a half-built booking.
    pub async fn confirm_payment(
        state: &AppState,
        guest: &User,
        payment_id: &str,
    ) -> ApiResult<PaymentStatusResponse> {
        let mut tx = state.database.begin().await?;

        let pending = sqlx::query_as::<_, PendingCryptoPayment>(
            "SELECT * FROM pending_crypto_payments WHERE payment_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(payment_id)
        .bind(guest.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

        if pending.status == PaymentStatus::Finished.as_str() {
            return Err(ApiError::Conflict("Payment already processed".to_string()));
        }
        if intent_expired(pending.created_at, Utc::now(), state.config.payment_expiry_seconds) {
            return Err(ApiError::Validation("Payment intent has expired".to_string()));
        }

        let snapshot = IntentSnapshot::from_meta(&pending.meta)?;

        sqlx::query("SELECT id FROM properties WHERE id = $1 FOR UPDATE")
            .bind(snapshot.listing_id)
            .execute(&mut *tx)
            .await?;

        if conflict::has_conflict(
            &mut *tx,
            snapshot.listing_id,
            snapshot.check_in,
            snapshot.check_out,
            None,
        )
        .await?
        {
            return Err(ApiError::Validation(
                "Dates are no longer available".to_string(),
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
        .bind(snapshot.listing_id)
        .bind(snapshot.check_in)
        .bind(snapshot.check_out)
        .bind(snapshot.guests_count)
        .bind(pending.amount_usd)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        // The money moved off-ledger; record the payment without touching
        // the wallet balance.
        Ledger::record(
            &mut tx,
            guest.id,
            -pending.amount_usd,
            TransactionType::BookingPayment,
            &format!("Crypto payment ({}) for {}", pending.currency, snapshot.property),
            Some(booking.id),
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE pending_crypto_payments
            SET status = $1, meta = meta || jsonb_build_object('booking_id', $2::BIGINT)
            WHERE id = $3
            "#,
        )
        .bind(PaymentStatus::Finished.as_str())
        .bind(booking.id)
        .bind(pending.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        metrics::increment_bookings_created();

        Self::settle_confirmed(state, guest, &booking, &pending, &snapshot).await;

        Ok(PaymentStatusResponse {
            status: PaymentStatus::Finished.as_str().to_string(),
            booking_created: true,
            booking_id: Some(booking.id),
            property: Some(snapshot.property),
            amount: Some(pending.amount_usd),
        })
    }

    /// Post-commit side effects: host payout, loyalty points, audit trail,
    /// host notification. All best-effort; the booking already exists.
    async fn settle_confirmed(
        state: &AppState,
        guest: &User,
        booking: &Booking,
        pending: &PendingCryptoPayment,
        snapshot: &IntentSnapshot,
    ) {
        match state.database.get_property(snapshot.listing_id).await {
            Ok(Some(property)) => {
                let payout = utils::host_payout(pending.amount_usd);
                if let Err(e) = Self::pay_host(state, property.host_id, payout, booking).await {
                    tracing::warn!(
                        "Host payout of {} for booking {} failed: {}",
                        payout,
                        booking.id,
                        e
                    );
                }
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
            }
            Ok(None) => {
                tracing::warn!(
                    "Listing {} vanished before payout for booking {}",
                    snapshot.listing_id,
                    booking.id
                );
            }
            Err(e) => {
                tracing::warn!("Host payout lookup failed for booking {}: {}", booking.id, e);
            }
        }

        let points = utils::loyalty_points_for(pending.amount_usd);
        if points > 0 {
            if let Err(e) = state.database.add_loyalty_points(guest.id, points).await {
                tracing::warn!("Loyalty credit of {} for user {} failed: {}", points, guest.id, e);
            }
        }

        AuditSink::log(
            &state.database,
            Some(guest.id),
            "booking_created_crypto",
            serde_json::json!({
                "booking_id": booking.id,
                "payment_id": pending.payment_id,
                "currency": pending.currency,
                "amount_usd": pending.amount_usd.to_string(),
            }),
        )
        .await;
    }

    async fn pay_host(
        state: &AppState,
        host_id: i64,
        payout: Decimal,
        booking: &Booking,
    ) -> ApiResult<()> {
        let mut tx = state.database.begin().await?;
        Ledger::apply_delta(
            &mut tx,
            host_id,
            payout,
            TransactionType::HostPayout,
            &format!("Payout for booking #{}", booking.id),
            Some(booking.id),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Read-only status poll. Never mutates anything.
    pub async fn payment_status(
        state: &AppState,
        guest: &User,
        payment_id: &str,
    ) -> ApiResult<PaymentStatusResponse> {
        let pending = state
            .database
            .get_pending_payment(payment_id, guest.id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

        if pending.status == PaymentStatus::Finished.as_str() {
            let booking_id = pending.meta.get("booking_id").and_then(|v| v.as_i64());
            let property = pending
                .meta
                .get("property")
                .and_then(|v| v.as_str())
                .map(String::from);
            return Ok(PaymentStatusResponse {
                status: pending.status,
                booking_created: true,
                booking_id,
                property,
                amount: Some(pending.amount_usd),
            });
        }

        Ok(PaymentStatusResponse {
            status: pending.status,
            booking_created: false,
            booking_id: None,
            property: None,
            amount: None,
        })
    }
}

/// Booking parameters parked in the pending payment's meta column.
struct IntentSnapshot {
    listing_id: i64,
    check_in: chrono::NaiveDate,
    check_out: chrono::NaiveDate,
    guests_count: i32,
    property: String,
}

impl IntentSnapshot {
    fn from_meta(meta: &serde_json::Value) -> ApiResult<Self> {
        let corrupt = || ApiError::Internal("Corrupt payment metadata".to_string());
        Ok(Self {
            listing_id: meta
                .get("listing_id")
                .and_then(|v| v.as_i64())
                .ok_or_else(corrupt)?,
            check_in: utils::parse_date(
                meta.get("check_in").and_then(|v| v.as_str()).ok_or_else(corrupt)?,
            )?,
            check_out: utils::parse_date(
                meta.get("check_out").and_then(|v| v.as_str()).ok_or_else(corrupt)?,
            )?,
            guests_count: meta
                .get("guests_count")
                .and_then(|v| v.as_i64())
                .unwrap_or(1) as i32,
            property: meta
                .get("property")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rates_match_quote_table() {
        assert_eq!(usd_rate("btc"), Decimal::from_str("0.0000156").unwrap());
        assert_eq!(usd_rate("eth"), Decimal::from_str("0.000285").unwrap());
        assert_eq!(usd_rate("usdt"), Decimal::ONE);
        assert_eq!(usd_rate("ltc"), Decimal::from_str("0.0112").unwrap());
        assert_eq!(usd_rate("bnb"), Decimal::from_str("0.00174").unwrap());
        assert_eq!(usd_rate("sol"), Decimal::from_str("0.00617").unwrap());
        assert_eq!(usd_rate("doge"), Decimal::from_str("6.82").unwrap());
        assert_eq!(usd_rate("xyz"), Decimal::ONE);
    }

    #[test]
    fn supported_currencies_match_the_rate_table() {
        assert_eq!(
            SUPPORTED_CURRENCIES,
            ["btc", "eth", "usdt", "ltc", "bnb", "sol", "doge"]
        );
        // Every supported ticker except the stablecoin has its own rate;
        // anything outside the list falls back to 1:1.
        for currency in SUPPORTED_CURRENCIES {
            if currency == "usdt" {
                continue;
            }
            assert_ne!(usd_rate(currency), Decimal::ONE, "{}", currency);
        }
    }

    #[test]
    fn expiry_is_enforced_at_the_quoted_lifetime() {
        let created = Utc::now();
        let lifetime = 3600;
        assert!(!intent_expired(created, created, lifetime));
        assert!(!intent_expired(
            created,
            created + chrono::Duration::seconds(3600),
            lifetime
        ));
        assert!(intent_expired(
            created,
            created + chrono::Duration::seconds(3601),
            lifetime
        ));
    }

    #[test]
    fn sol_quote_for_three_hundred_usd() {
        let pay = utils::crypto_pay_amount(Decimal::from(300), usd_rate("sol"));
        assert_eq!(pay, Decimal::from_str("1.851").unwrap());
    }

    #[test]
    fn addresses_follow_currency_conventions() {
        let btc = make_address("btc");
        assert!(btc.starts_with("bc1q"));
        assert_eq!(btc.len(), 42);

        let eth = make_address("eth");
        assert!(eth.starts_with("0x"));
        assert_eq!(eth.len(), 42);
        assert!(eth[2..].bytes().all(|b| b.is_ascii_hexdigit()));

        let usdt = make_address("usdt");
        assert!(usdt.starts_with('T'));
        assert_eq!(usdt.len(), 34);

        let ltc = make_address("ltc");
        assert!(ltc.starts_with('L'));
        assert_eq!(ltc.len(), 34);

        let bnb = make_address("bnb");
        assert!(bnb.starts_with("bnb1"));
        assert_eq!(bnb.len(), 42);

        assert_eq!(make_address("sol").len(), 44);

        let doge = make_address("doge");
        assert!(doge.starts_with('D'));
        assert_eq!(doge.len(), 34);

        let unknown = make_address("xyz");
        assert!(unknown.starts_with("0x"));
        assert_eq!(unknown.len(), 42);
    }

    #[test]
    fn addresses_are_unique_per_call() {
        assert_ne!(make_address("btc"), make_address("btc"));
    }

    #[test]
    fn network_labels_cover_all_currencies() {
        assert_eq!(network_label("btc"), "Bitcoin");
        assert_eq!(network_label("sol"), "Solana");
        assert_eq!(network_label("unknown"), "Ethereum (ERC-20)");
    }

    #[test]
    fn snapshot_round_trips_through_meta() {
        let meta = serde_json::json!({
            "listing_id": 9,
            "check_in": "2026-09-01",
            "check_out": "2026-09-04",
            "guests_count": 2,
            "property": "Loft",
        });
        let snap = IntentSnapshot::from_meta(&meta).unwrap();
        assert_eq!(snap.listing_id, 9);
        assert_eq!(snap.guests_count, 2);
        assert_eq!(snap.property, "Loft");
        assert_eq!(utils::nights(snap.check_in, snap.check_out), 3);
    }

    #[test]
    fn snapshot_rejects_missing_fields() {
        let meta = serde_json::json!({ "check_in": "2026-09-01" });
        assert!(IntentSnapshot::from_meta(&meta).is_err());
    }
}

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{ApiError, ApiResult};

/// Share of a booking total paid out to the host. The remaining 3% is the
/// platform fee and is never written to the ledger; it stays recoverable by
/// subtraction.
pub fn host_payout_rate() -> Decimal {
    Decimal::new(97, 2)
}

/// Number of nights in the half-open range `[check_in, check_out)`.
#[inline]
pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Total booking price, fixed at confirmation time.
pub fn total_price(price_per_night: Decimal, nights: i64) -> Decimal {
    price_per_night * Decimal::from(nights)
}

/// Host payout (or payout reversal) for a booking total: 97% rounded to
/// 2 decimal places, half away from zero.
pub fn host_payout(total: Decimal) -> Decimal {
    (total * host_payout_rate()).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Crypto pay-amount for a USD total at a fixed exchange rate, rounded to
/// 8 decimal places.
pub fn crypto_pay_amount(amount_usd: Decimal, rate: Decimal) -> Decimal {
    (amount_usd * rate).round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero)
}

/// Loyalty points earned for a crypto-funded booking: floor of the USD total.
pub fn loyalty_points_for(amount_usd: Decimal) -> i32 {
    amount_usd
        .floor()
        .try_into()
        .unwrap_or(i32::MAX)
}

/// Half-open interval overlap: `[a_in, a_out)` intersects `[b_in, b_out)`.
/// A check-out on another booking's check-in day is not a conflict.
#[inline]
pub fn ranges_overlap(a_in: NaiveDate, a_out: NaiveDate, b_in: NaiveDate, b_out: NaiveDate) -> bool {
    a_in < b_out && a_out > b_in
}

pub fn parse_date(s: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("Invalid date format. Use YYYY-MM-DD".to_string()))
}

pub fn validate_topup_amount(amount: Decimal) -> ApiResult<Decimal> {
    if amount <= Decimal::ZERO || amount > Decimal::from(100_000) {
        return Err(ApiError::Validation(
            "Amount must be between $1 and $100,000".to_string(),
        ));
    }
    Ok(amount)
}

pub fn validate_rating(rating: i32) -> ApiResult<i32> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(rating)
}

//! Date-range conflict checking.
//!
//! A listing is blocked for `[check_in, check_out)` when any booking in
//! status pending or confirmed overlaps the half-open range. The check is a
//! pure read; callers run it on the pool for pre-checks and on an open
//! transaction when it must be atomic with the booking insert.

use chrono::NaiveDate;
use shared::{ApiError, ApiResult};

/// `exclude_booking_id` lets an update ignore its own existing row.
pub async fn has_conflict<'e, E>(
    executor: E,
    listing_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude_booking_id: Option<i64>,
) -> ApiResult<bool>
where
    E: sqlx::PgExecutor<'e>,
{
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE listing_id = $1
              AND status IN ('pending', 'confirmed')
              AND check_in < $3
              AND check_out > $2
              AND ($4::BIGINT IS NULL OR id <> $4)
        )
        "#,
    )
    .bind(listing_id)
    .bind(check_in)
    .bind(check_out)
    .bind(exclude_booking_id)
    .fetch_one(executor)
    .await
    .map_err(ApiError::from)?;

    Ok(exists)
}

/// Expand active booking ranges into the sorted set of individually blocked
/// dates, excluding each range's check-out day.
pub fn expand_blocked_dates(ranges: &[(NaiveDate, NaiveDate)]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    for &(check_in, check_out) in ranges {
        let mut day = check_in;
        while day < check_out {
            dates.push(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    dates.sort_unstable();
    dates.dedup();
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn blocked_dates_exclude_checkout_day() {
        let dates = expand_blocked_dates(&[(d("2026-09-01"), d("2026-09-04"))]);
        assert_eq!(dates, vec![d("2026-09-01"), d("2026-09-02"), d("2026-09-03")]);
    }

    #[test]
    fn blocked_dates_merge_and_dedupe_overlaps() {
        let dates = expand_blocked_dates(&[
            (d("2026-09-03"), d("2026-09-05")),
            (d("2026-09-01"), d("2026-09-04")),
        ]);
        assert_eq!(
            dates,
            vec![d("2026-09-01"), d("2026-09-02"), d("2026-09-03"), d("2026-09-04")]
        );
    }

    #[test]
    fn no_ranges_no_blocked_dates() {
        assert!(expand_blocked_dates(&[]).is_empty());
    }
}

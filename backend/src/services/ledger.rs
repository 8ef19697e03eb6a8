//! Wallet ledger mutator.
//!
//! Every wallet change is a single server-side increment paired with exactly
//! one append-only ledger row. Callers pass the connection (usually a live
//! transaction) so the balance update and the ledger insert commit or roll
//! back together. Ledger rows are never updated after insertion.

use rust_decimal::{prelude::ToPrimitive, Decimal};
use shared::{ApiError, ApiResult, LedgerEntry, TransactionStatus, TransactionType};
use sqlx::PgConnection;

pub struct Ledger;

impl Ledger {
    /// Apply a signed delta to a user's wallet and record it. The increment
    /// runs server-side (`balance = balance + delta`), never as a
    /// read-then-write, so it stays correct under concurrent mutations.
    pub async fn apply_delta(
        conn: &mut PgConnection,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        booking_id: Option<i64>,
    ) -> ApiResult<LedgerEntry> {
        let updated = sqlx::query(
            "UPDATE users SET wallet_balance = wallet_balance + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("User {} not found", user_id)));
        }

        Self::record(conn, user_id, amount, tx_type, description, booking_id).await
    }

    /// Debit `amount` (positive) from a user's wallet only if the balance
    /// covers it. Returns `None`, with no ledger row, when it does not; the
    /// guard and the decrement are one atomic statement.
    pub async fn apply_guarded_debit(
        conn: &mut PgConnection,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        booking_id: Option<i64>,
    ) -> ApiResult<Option<LedgerEntry>> {
        if amount <= Decimal::ZERO {
            return Err(ApiError::Validation(
                "Debit amount must be positive".to_string(),
            ));
        }

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET wallet_balance = wallet_balance - $1, updated_at = NOW()
            WHERE id = $2 AND wallet_balance >= $1
            "#,
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let entry =
            Self::record(conn, user_id, -amount, tx_type, description, booking_id).await?;
        Ok(Some(entry))
    }

    /// Append a ledger row without touching the wallet. Used when the money
    /// moved off-ledger (crypto-funded bookings) but the history must still
    /// show the payment.
    pub async fn record(
        conn: &mut PgConnection,
        user_id: i64,
        amount: Decimal,
        tx_type: TransactionType,
        description: &str,
        booking_id: Option<i64>,
    ) -> ApiResult<LedgerEntry> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"
            INSERT INTO transactions (user_id, booking_id, amount, transaction_type, description, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(booking_id)
        .bind(amount)
        .bind(tx_type.as_str())
        .bind(description)
        .bind(TransactionStatus::Completed.as_str())
        .fetch_one(&mut *conn)
        .await?;

        crate::monitoring::metrics::add_ledger_volume(amount.to_f64().unwrap_or(0.0));

        Ok(entry)
    }
}

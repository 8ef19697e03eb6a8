use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    ApiError, AuditLogEntry, Booking, CreatePropertyRequest, LedgerEntry, Notification,
    PendingCryptoPayment, Property, PropertyFilter, Review, User,
};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction as PgTransaction};
use std::time::Duration;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begin an explicit transaction for multi-statement financial flows.
    pub async fn begin(&self) -> Result<PgTransaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(
        &self,
        email: &str,
        display_name: &str,
        role: &str,
        wallet_credit: Decimal,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, display_name, role, wallet_balance)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(display_name)
        .bind(role)
        .bind(wallet_credit)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Atomic server-side increment; loyalty points only ever grow here.
    pub async fn add_loyalty_points(&self, user_id: i64, points: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET loyalty_points = loyalty_points + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(points)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub async fn insert_property(
        &self,
        host_id: i64,
        req: &CreatePropertyRequest,
    ) -> Result<Property, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (
                host_id, title, description, property_type, city, country,
                address, price_per_night, max_guests, bedrooms, bathrooms, amenities
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(host_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.property_type)
        .bind(&req.city)
        .bind(&req.country)
        .bind(&req.address)
        .bind(req.price_per_night)
        .bind(req.max_guests)
        .bind(req.bedrooms.unwrap_or(1))
        .bind(req.bathrooms.unwrap_or(1))
        .bind(req.amenities.clone().unwrap_or_else(|| serde_json::json!([])))
        .fetch_one(&self.pool)
        .await
    }

    pub async fn update_property(
        &self,
        property_id: i64,
        host_id: i64,
        req: &CreatePropertyRequest,
    ) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties SET
                title = $1, description = $2, property_type = $3, city = $4,
                country = $5, address = $6, price_per_night = $7, max_guests = $8,
                bedrooms = $9, bathrooms = $10, amenities = $11
            WHERE id = $12 AND host_id = $13
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.property_type)
        .bind(&req.city)
        .bind(&req.country)
        .bind(&req.address)
        .bind(req.price_per_night)
        .bind(req.max_guests)
        .bind(req.bedrooms.unwrap_or(1))
        .bind(req.bathrooms.unwrap_or(1))
        .bind(req.amenities.clone().unwrap_or_else(|| serde_json::json!([])))
        .bind(property_id)
        .bind(host_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Soft delete; bookings and reviews keep their rows.
    pub async fn deactivate_property(
        &self,
        property_id: i64,
        host_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE properties SET is_active = FALSE WHERE id = $1 AND host_id = $2")
                .bind(property_id)
                .bind(host_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_property(&self, property_id: i64) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_active_property(
        &self,
        property_id: i64,
    ) -> Result<Option<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1 AND is_active = TRUE")
            .bind(property_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_properties(
        &self,
        filter: &PropertyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Property>, sqlx::Error> {
        let mut query = "SELECT * FROM properties WHERE is_active = TRUE".to_string();
        let mut param_count = 0;

        if filter.city.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND city ILIKE ${}", param_count));
        }
        if filter.country.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND country ILIKE ${}", param_count));
        }
        if filter.property_type.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND property_type = ${}", param_count));
        }
        if filter.min_price.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND price_per_night >= ${}", param_count));
        }
        if filter.max_price.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND price_per_night <= ${}", param_count));
        }
        if filter.guests.is_some() {
            param_count += 1;
            query.push_str(&format!(" AND max_guests >= ${}", param_count));
        }
        if filter.search.is_some() {
            param_count += 1;
            query.push_str(&format!(
                " AND (title ILIKE ${n} OR city ILIKE ${n} OR description ILIKE ${n})",
                n = param_count
            ));
        }

        // Sort keys are whitelisted; anything else falls back to newest-first.
        let order = match filter.sort.as_deref() {
            Some("price_per_night") => "price_per_night ASC",
            Some("-price_per_night") => "price_per_night DESC",
            Some("title") => "title ASC",
            _ => "created_at DESC",
        };
        query.push_str(&format!(" ORDER BY {}", order));

        param_count += 1;
        query.push_str(&format!(" LIMIT ${}", param_count));
        param_count += 1;
        query.push_str(&format!(" OFFSET ${}", param_count));

        let mut q = sqlx::query_as::<_, Property>(&query);

        if let Some(ref city) = filter.city {
            q = q.bind(format!("%{}%", city));
        }
        if let Some(ref country) = filter.country {
            q = q.bind(format!("%{}%", country));
        }
        if let Some(ref property_type) = filter.property_type {
            q = q.bind(property_type.clone());
        }
        if let Some(min_price) = filter.min_price {
            q = q.bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            q = q.bind(max_price);
        }
        if let Some(guests) = filter.guests {
            q = q.bind(guests);
        }
        if let Some(ref search) = filter.search {
            q = q.bind(format!("%{}%", search));
        }

        q = q.bind(limit);
        q = q.bind(offset);

        q.fetch_all(&self.pool).await
    }

    pub async fn list_host_properties(&self, host_id: i64) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE host_id = $1 ORDER BY created_at DESC",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Listings a guest has ever booked, most recent booking first.
    pub async fn list_booked_listing_ids(&self, guest_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT listing_id FROM bookings
            WHERE guest_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(guest_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Active listings in a city the guest has not already booked,
    /// newest first.
    pub async fn list_similar_properties(
        &self,
        city: &str,
        exclude_ids: &[i64],
        limit: i64,
    ) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            SELECT * FROM properties
            WHERE is_active = TRUE AND city = $1 AND id <> ALL($2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(city)
        .bind(exclude_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_newest_properties(&self, limit: i64) -> Result<Vec<Property>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            "SELECT * FROM properties WHERE is_active = TRUE ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Aggregate rating is computed on read, never stored.
    pub async fn get_property_rating(&self, property_id: i64) -> Result<(f64, i64), sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(ROUND(AVG(rating)::NUMERIC, 1), 0)::FLOAT8 AS avg_rating,
                   COUNT(*) AS review_count
            FROM reviews WHERE property_id = $1
            "#,
        )
        .bind(property_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("avg_rating"), row.get("review_count")))
    }

    // ========================================================================
    // Bookings (read paths; lifecycle mutations run in service transactions)
    // ========================================================================

    pub async fn get_booking(&self, booking_id: i64) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_booking_for_guest(
        &self,
        booking_id: i64,
        guest_id: i64,
    ) -> Result<Option<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 AND guest_id = $2")
            .bind(booking_id)
            .bind(guest_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_guest_bookings(&self, guest_id: i64) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE guest_id = $1 ORDER BY created_at DESC",
        )
        .bind(guest_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_host_bookings(&self, host_id: i64) -> Result<Vec<Booking>, sqlx::Error> {
        sqlx::query_as::<_, Booking>(
            r#"
            SELECT b.* FROM bookings b
            JOIN properties p ON p.id = b.listing_id
            WHERE p.host_id = $1
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Date ranges of bookings that block availability for a listing.
    pub async fn get_active_booking_ranges(
        &self,
        listing_id: i64,
    ) -> Result<Vec<(NaiveDate, NaiveDate)>, sqlx::Error> {
        sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
            r#"
            SELECT check_in, check_out FROM bookings
            WHERE listing_id = $1 AND status IN ('pending', 'confirmed')
            ORDER BY check_in
            "#,
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await
    }

    // ========================================================================
    // Ledger reads
    // ========================================================================

    pub async fn list_user_transactions(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_user_transactions(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    // ========================================================================
    // Pending crypto payments
    // ========================================================================

    pub async fn insert_pending_payment(
        &self,
        user_id: i64,
        payment_id: &str,
        amount_usd: Decimal,
        currency: &str,
        meta: serde_json::Value,
    ) -> Result<PendingCryptoPayment, sqlx::Error> {
        sqlx::query_as::<_, PendingCryptoPayment>(
            r#"
            INSERT INTO pending_crypto_payments (user_id, payment_id, amount_usd, currency, status, meta)
            VALUES ($1, $2, $3, $4, 'waiting', $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(payment_id)
        .bind(amount_usd)
        .bind(currency)
        .bind(meta)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_pending_payment(
        &self,
        payment_id: &str,
        user_id: i64,
    ) -> Result<Option<PendingCryptoPayment>, sqlx::Error> {
        sqlx::query_as::<_, PendingCryptoPayment>(
            "SELECT * FROM pending_crypto_payments WHERE payment_id = $1 AND user_id = $2",
        )
        .bind(payment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn insert_notification(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
        notif_type: &str,
        link: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, message, notif_type, link)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(notif_type)
        .bind(link)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_notifications(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Audit log
    // ========================================================================

    pub async fn insert_audit_entry(
        &self,
        user_id: Option<i64>,
        action: &str,
        details: serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO audit_log (user_id, action, details) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(action)
            .bind(details)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_audit_entries(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_log
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    // ========================================================================
    // Reviews
    // ========================================================================

    pub async fn insert_review(
        &self,
        reviewer_id: i64,
        property_id: i64,
        booking_id: i64,
        rating: i32,
        comment: &str,
    ) -> Result<Review, ApiError> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (reviewer_id, property_id, booking_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(reviewer_id)
        .bind(property_id)
        .bind(booking_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                ApiError::Conflict("You have already reviewed this property".to_string())
            }
            other => ApiError::from(other),
        })
    }

    pub async fn list_property_reviews(
        &self,
        property_id: i64,
    ) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE property_id = $1 ORDER BY created_at DESC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::JsonValue};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub wallet_balance: Decimal,
    pub loyalty_points: i32,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn is_host(&self) -> bool {
        self.role == UserRole::Host.as_str() || self.role == UserRole::Admin.as_str()
    }
    #[inline]
    pub fn has_balance(&self, amount: Decimal) -> bool {
        self.wallet_balance >= amount
    }
    pub fn loyalty_tier(&self) -> &'static str {
        match self.loyalty_points {
            p if p >= 5000 => "Platinum",
            p if p >= 2000 => "Gold",
            p if p >= 500 => "Silver",
            _ => "Explorer",
        }
    }
    /// Percentage discount the tier entitles the guest to.
    pub fn loyalty_discount(&self) -> u32 {
        match self.loyalty_tier() {
            "Platinum" => 10,
            "Gold" => 7,
            "Silver" => 5,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    Host,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Guest => "guest",
            UserRole::Host => "host",
            UserRole::Admin => "admin",
        }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(UserRole::Guest),
            "host" => Some(UserRole::Host),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: i64,
    pub host_id: i64,
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub city: String,
    pub country: String,
    pub address: String,
    pub price_per_night: Decimal,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub amenities: JsonValue,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub guest_id: i64,
    pub listing_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests_count: i32,
    pub total_price: Decimal,
    pub status: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[inline]
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
    #[inline]
    pub fn is_cancellable(&self) -> bool {
        self.status == BookingStatus::Pending.as_str()
            || self.status == BookingStatus::Confirmed.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

/// Immutable wallet ledger entry. Rows are append-only; nothing updates them
/// after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    #[sqlx(default)]
    pub id: i64,
    pub user_id: i64,
    pub booking_id: Option<i64>,
    pub amount: Decimal,
    pub transaction_type: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    BookingPayment,
    Refund,
    HostPayout,
    PayoutReversal,
    WalletTopup,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::BookingPayment => "booking_payment",
            TransactionType::Refund => "refund",
            TransactionType::HostPayout => "host_payout",
            TransactionType::PayoutReversal => "payout_reversal",
            TransactionType::WalletTopup => "wallet_topup",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

/// Bridge between a simulated crypto payment intent and the booking that will
/// be materialised once the payment is confirmed. `meta` snapshots the
/// intended booking parameters at intent time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingCryptoPayment {
    #[sqlx(default)]
    pub id: i64,
    pub user_id: i64,
    pub payment_id: String,
    pub amount_usd: Decimal,
    pub currency: String,
    pub status: String,
    pub meta: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Waiting,
    Finished,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Waiting => "waiting",
            PaymentStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    #[sqlx(default)]
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notif_type: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Booking,
    Cancellation,
    Review,
    System,
    Payout,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Booking => "booking",
            NotificationType::Cancellation => "cancellation",
            NotificationType::Review => "review",
            NotificationType::System => "system",
            NotificationType::Payout => "payout",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    #[sqlx(default)]
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: JsonValue,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    #[sqlx(default)]
    pub id: i64,
    pub reviewer_id: i64,
    pub property_id: i64,
    pub booking_id: i64,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub listing_id: Option<i64>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    #[serde(default)]
    pub guests_count: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateBookingRequest {
    pub listing_id: Option<i64>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    #[serde(default)]
    pub guests_count: Option<i32>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    pub payment_id: String,
    pub pay_address: String,
    pub pay_amount: Decimal,
    pub pay_currency: String,
    pub amount_usd: Decimal,
    pub nights: i64,
    pub property: String,
    pub status: String,
    pub network: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: String,
    pub booking_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePropertyRequest {
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub city: String,
    pub country: String,
    pub address: String,
    pub price_per_night: Decimal,
    pub max_guests: i32,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub amenities: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub guests: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    pub avg_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub listing_id: i64,
    pub blocked_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalanceResponse {
    pub balance: Decimal,
    pub loyalty_points: i32,
    pub loyalty_tier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopupRequest {
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopupResponse {
    pub message: String,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub booking_id: Option<i64>,
    pub rating: Option<i32>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(error: String) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        let has_more = (offset + items.len() as i64) < total;
        Self {
            items,
            total,
            limit,
            offset,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn booking(status: &str, ci: (i32, u32, u32), co: (i32, u32, u32)) -> Booking {
        Booking {
            id: 1,
            guest_id: 1,
            listing_id: 1,
            check_in: NaiveDate::from_ymd_opt(ci.0, ci.1, ci.2).unwrap(),
            check_out: NaiveDate::from_ymd_opt(co.0, co.1, co.2).unwrap(),
            guests_count: 2,
            total_price: Decimal::new(60000, 2),
            status: status.to_string(),
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn nights_counts_half_open_range() {
        let b = booking("confirmed", (2026, 9, 1), (2026, 9, 4));
        assert_eq!(b.nights(), 3);
    }

    #[test]
    fn only_pending_and_confirmed_are_cancellable() {
        assert!(booking("pending", (2026, 9, 1), (2026, 9, 2)).is_cancellable());
        assert!(booking("confirmed", (2026, 9, 1), (2026, 9, 2)).is_cancellable());
        assert!(!booking("completed", (2026, 9, 1), (2026, 9, 2)).is_cancellable());
        assert!(!booking("cancelled", (2026, 9, 1), (2026, 9, 2)).is_cancellable());
    }

    #[test]
    fn loyalty_tiers_follow_point_thresholds() {
        let mut user = User {
            id: 1,
            email: "guest@example.com".into(),
            display_name: "Guest".into(),
            role: "guest".into(),
            wallet_balance: Decimal::ZERO,
            loyalty_points: 0,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(user.loyalty_tier(), "Explorer");
        assert_eq!(user.loyalty_discount(), 0);
        user.loyalty_points = 500;
        assert_eq!(user.loyalty_tier(), "Silver");
        user.loyalty_points = 2400;
        assert_eq!(user.loyalty_tier(), "Gold");
        assert_eq!(user.loyalty_discount(), 7);
        user.loyalty_points = 5000;
        assert_eq!(user.loyalty_tier(), "Platinum");
        assert_eq!(user.loyalty_discount(), 10);
    }
}

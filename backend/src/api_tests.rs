//! # Booking Platform API Tests
//!
//! Integration tests for the full booking flow against a running server.
//! Every test registers its own users (unique emails per run), so the suite
//! can run repeatedly against the same database.
//!
//! ## Test Coverage:
//! - Registration and profile
//! - Property creation, search, availability
//! - Wallet bookings: payment, double-booking rejection, back-to-back stays
//! - Cancellation and refunds
//! - Crypto checkout: intent quotes, confirmation, idempotency
//! - Wallet top-ups and ledger history
//! - Reviews
//!
//! Tests skip gracefully when no server is listening.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;

const BASE_URL: &str = "http://localhost:3000/api/v1";
const HEALTH_URL: &str = "http://localhost:3000/health";

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

pub struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub async fn health_check(&self) -> Result<HealthResponse, reqwest::Error> {
        let response = self.client.get(HEALTH_URL).send().await?;
        response.json().await
    }

    pub async fn register(
        &self,
        email: &str,
        display_name: &str,
        role: &str,
    ) -> Result<ApiResponse<Value>, reqwest::Error> {
        let body = json!({
            "email": email,
            "display_name": display_name,
            "role": role
        });
        let response = self
            .client
            .post(format!("{}/users/register", self.base_url))
            .json(&body)
            .send()
            .await?;
        response.json().await
    }

    pub async fn get(
        &self,
        user_id: i64,
        path: &str,
    ) -> Result<ApiResponse<Value>, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("X-User-Id", user_id.to_string())
            .send()
            .await?;
        response.json().await
    }

    pub async fn get_no_auth(
        &self,
        path: &str,
    ) -> Result<(u16, ApiResponse<Value>), reqwest::Error> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn post(
        &self,
        user_id: i64,
        path: &str,
        body: Value,
    ) -> Result<(u16, ApiResponse<Value>), reqwest::Error> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("X-User-Id", user_id.to_string())
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    pub async fn create_property(
        &self,
        host_id: i64,
        title: &str,
        price_per_night: &str,
        max_guests: i32,
    ) -> Result<(u16, ApiResponse<Value>), reqwest::Error> {
        self.create_property_in(host_id, title, "Lisbon", price_per_night, max_guests)
            .await
    }

    pub async fn create_property_in(
        &self,
        host_id: i64,
        title: &str,
        city: &str,
        price_per_night: &str,
        max_guests: i32,
    ) -> Result<(u16, ApiResponse<Value>), reqwest::Error> {
        self.post(
            host_id,
            "/properties",
            json!({
                "title": title,
                "description": "Test listing",
                "property_type": "apartment",
                "city": city,
                "country": "Portugal",
                "address": "1 Test Street",
                "price_per_night": price_per_night,
                "max_guests": max_guests
            }),
        )
        .await
    }

    pub async fn create_booking(
        &self,
        guest_id: i64,
        listing_id: i64,
        check_in: &str,
        check_out: &str,
    ) -> Result<(u16, ApiResponse<Value>), reqwest::Error> {
        self.post(
            guest_id,
            "/bookings",
            json!({
                "listing_id": listing_id,
                "check_in": check_in,
                "check_out": check_out,
                "guests_count": 2
            }),
        )
        .await
    }

    pub async fn topup(
        &self,
        user_id: i64,
        amount: &str,
    ) -> Result<(u16, ApiResponse<Value>), reqwest::Error> {
        self.post(user_id, "/wallet/topup", json!({ "amount": amount }))
            .await
    }
}

fn unique_email(tag: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}@test.example", tag, nanos)
}

async fn wait_for_server(client: &TestClient, max_retries: u32) -> bool {
    for i in 0..max_retries {
        match client.health_check().await {
            Ok(health) if health.status == "healthy" => {
                println!("Server is ready (attempt {})", i + 1);
                return true;
            }
            _ => {
                println!("Waiting for server... (attempt {})", i + 1);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    false
}

fn user_id(response: &ApiResponse<Value>) -> i64 {
    response.data.as_ref().unwrap()["id"].as_i64().unwrap()
}

fn decimal_field(value: &Value, field: &str) -> Decimal {
    Decimal::from_str(value[field].as_str().unwrap()).unwrap()
}

/// Register a guest and a host, plus a listing owned by the host.
async fn setup_guest_host_listing(
    client: &TestClient,
    tag: &str,
    price_per_night: &str,
) -> (i64, i64, i64) {
    let guest = client
        .register(&unique_email(&format!("{}_guest", tag)), "Guest", "guest")
        .await
        .expect("register guest");
    assert!(guest.success, "guest registration failed: {:?}", guest.error);
    let guest_id = user_id(&guest);

    let host = client
        .register(&unique_email(&format!("{}_host", tag)), "Host", "host")
        .await
        .expect("register host");
    assert!(host.success, "host registration failed: {:?}", host.error);
    let host_id = user_id(&host);

    let (status, property) = client
        .create_property(host_id, "Seaside Loft", price_per_night, 4)
        .await
        .expect("create property");
    assert_eq!(status, 201, "property creation failed: {:?}", property.error);
    let listing_id = property.data.unwrap()["id"].as_i64().unwrap();

    (guest_id, host_id, listing_id)
}

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            println!("Server not available, skipping test");
            return;
        }

        let health = client.health_check().await.expect("health request");
        assert_eq!(health.status, "healthy");
        assert_eq!(health.database, "up");
    }
}

#[cfg(test)]
mod registration_tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_fetch_profile() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let email = unique_email("profile");
        let response = client.register(&email, "Profile User", "guest").await.unwrap();
        assert!(response.success, "{:?}", response.error);
        let data = response.data.unwrap();
        assert_eq!(decimal_field(&data, "wallet_balance"), Decimal::from(500));
        assert_eq!(data["loyalty_tier"], "Explorer");

        let id = data["id"].as_i64().unwrap();
        let me = client.get(id, "/users/me").await.unwrap();
        assert!(me.success);
        assert_eq!(me.data.unwrap()["email"], email);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let email = unique_email("dup");
        let first = client.register(&email, "First", "guest").await.unwrap();
        assert!(first.success);
        let second = client.register(&email, "Second", "guest").await.unwrap();
        assert!(!second.success);
        assert!(second.error.unwrap().contains("already registered"));
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let response = client
            .register(&unique_email("role"), "Bad Role", "superadmin")
            .await
            .unwrap();
        assert!(!response.success);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[tokio::test]
    async fn test_guest_cannot_create_property() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let guest = client
            .register(&unique_email("noprop"), "Guest", "guest")
            .await
            .unwrap();
        let (status, response) = client
            .create_property(user_id(&guest), "Should Fail", "100", 2)
            .await
            .unwrap();
        assert_eq!(status, 403);
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_property_detail_and_search() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "search", "150").await;

        let detail = client
            .get(guest_id, &format!("/properties/{}", listing_id))
            .await
            .unwrap();
        assert!(detail.success);
        let data = detail.data.unwrap();
        assert_eq!(data["title"], "Seaside Loft");
        assert_eq!(data["review_count"].as_i64().unwrap(), 0);

        let listing = client
            .get(guest_id, "/properties?city=Lisbon&guests=2")
            .await
            .unwrap();
        assert!(listing.success);
        assert!(!listing.data.unwrap().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_availability_excludes_checkout_day() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "avail", "100").await;

        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2027-03-01", "2027-03-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);

        let availability = client
            .get(guest_id, &format!("/properties/{}/availability", listing_id))
            .await
            .unwrap();
        assert!(availability.success);
        let blocked = availability.data.unwrap()["blocked_dates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d.as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert!(blocked.contains(&"2027-03-01".to_string()));
        assert!(blocked.contains(&"2027-03-03".to_string()));
        assert!(!blocked.contains(&"2027-03-04".to_string()));
    }
}

#[cfg(test)]
mod wallet_booking_tests {
    use super::*;

    #[tokio::test]
    async fn test_booking_debits_wallet_and_pays_host_nothing_yet() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        // 3 nights x 100 = 300, covered by the 500 signup credit.
        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "pay", "100").await;

        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2027-04-01", "2027-04-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking = booking.data.unwrap();
        assert_eq!(booking["status"], "confirmed");
        assert_eq!(decimal_field(&booking, "total_price"), Decimal::from(300));

        let wallet = client.get(guest_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&wallet.data.unwrap(), "balance"),
            Decimal::from(200)
        );

        // Host is paid at completion on the wallet path, not at booking time.
        let host_wallet = client.get(host_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&host_wallet.data.unwrap(), "balance"),
            Decimal::from(500)
        );
    }

    #[tokio::test]
    async fn test_topped_up_wallet_covers_expensive_stay() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        // 500 signup credit + 500 top-up = 1000; 3 nights x 200 = 600.
        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "rich", "200").await;
        let (status, topped) = client.topup(guest_id, "500").await.unwrap();
        assert_eq!(status, 200, "{:?}", topped.error);

        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2027-04-10", "2027-04-13")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking = booking.data.unwrap();
        assert_eq!(booking["status"], "confirmed");
        assert_eq!(decimal_field(&booking, "total_price"), Decimal::from(600));

        let wallet = client.get(guest_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&wallet.data.unwrap(), "balance"),
            Decimal::from(400)
        );
    }

    #[tokio::test]
    async fn test_capacity_exceeded_leaves_no_booking() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "capacity", "100").await;

        let (status, response) = client
            .post(
                guest_id,
                "/bookings",
                json!({
                    "listing_id": listing_id,
                    "check_in": "2027-04-20",
                    "check_out": "2027-04-22",
                    "guests_count": 8
                }),
            )
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(response.error.unwrap().contains("Max guests allowed: 4"));

        // Nothing persisted: the same dates book fine afterwards.
        let (status, retry) = client
            .create_booking(guest_id, listing_id, "2027-04-20", "2027-04-22")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", retry.error);
    }

    #[tokio::test]
    async fn test_insufficient_balance_rejected_without_booking() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        // 3 nights x 200 = 600 > 500 signup credit.
        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "broke", "200").await;

        let (status, response) = client
            .create_booking(guest_id, listing_id, "2027-05-01", "2027-05-04")
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(response.error.unwrap().contains("Insufficient wallet balance"));

        // The rejected attempt must not block the dates.
        let (status, retry) = client
            .create_booking(guest_id, listing_id, "2027-05-01", "2027-05-02")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", retry.error);
    }

    #[tokio::test]
    async fn test_double_booking_rejected_back_to_back_allowed() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "overlap", "50").await;
        let other = client
            .register(&unique_email("overlap_other"), "Other Guest", "guest")
            .await
            .unwrap();
        let other_id = user_id(&other);

        let (status, first) = client
            .create_booking(guest_id, listing_id, "2027-06-01", "2027-06-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", first.error);

        let (status, overlap) = client
            .create_booking(other_id, listing_id, "2027-06-03", "2027-06-05")
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(overlap.error.unwrap().contains("not available"));

        // Check-out day equals the next check-in day: allowed.
        let (status, adjacent) = client
            .create_booking(other_id, listing_id, "2027-06-04", "2027-06-06")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", adjacent.error);
    }

    #[tokio::test]
    async fn test_missing_fields_enumerated() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let guest = client
            .register(&unique_email("fields"), "Guest", "guest")
            .await
            .unwrap();
        let (status, response) = client
            .post(user_id(&guest), "/bookings", json!({ "check_in": "2027-07-01" }))
            .await
            .unwrap();
        assert_eq!(status, 400);
        let error = response.error.unwrap();
        assert!(error.contains("listing_id"));
        assert!(error.contains("check_out"));
    }
}

#[cfg(test)]
mod cancellation_tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_refunds_full_amount() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "cancel", "100").await;

        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2027-08-01", "2027-08-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking_id = booking.data.unwrap()["id"].as_i64().unwrap();

        let (status, cancelled) = client
            .post(guest_id, &format!("/bookings/{}/cancel", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 200, "{:?}", cancelled.error);
        assert_eq!(cancelled.data.unwrap()["status"], "cancelled");

        let wallet = client.get(guest_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&wallet.data.unwrap(), "balance"),
            Decimal::from(500)
        );

        // The payout reversal debits the host by 97% of 300: 500 - 291 = 209.
        let host_wallet = client.get(host_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&host_wallet.data.unwrap(), "balance"),
            Decimal::from(209)
        );

        // A cancelled booking cannot be cancelled again.
        let (status, again) = client
            .post(guest_id, &format!("/bookings/{}/cancel", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(!again.success);

        // The dates are free again.
        let (status, rebook) = client
            .create_booking(guest_id, listing_id, "2027-08-01", "2027-08-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", rebook.error);
    }

    #[tokio::test]
    async fn test_only_the_guest_can_cancel() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "foreign", "100").await;
        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2027-09-01", "2027-09-03")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking_id = booking.data.unwrap()["id"].as_i64().unwrap();

        let (status, response) = client
            .post(host_id, &format!("/bookings/{}/cancel", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 404);
        assert!(!response.success);
    }
}

#[cfg(test)]
mod completion_tests {
    use super::*;

    #[tokio::test]
    async fn test_completion_pays_host_and_unlocks_review() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        // Past dates so the stay is immediately completable: 3 x 100 = 300.
        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "complete", "100").await;
        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2024-01-01", "2024-01-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking_id = booking.data.unwrap()["id"].as_i64().unwrap();

        // Only the host can complete.
        let (status, forbidden) = client
            .post(guest_id, &format!("/bookings/{}/complete", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 403);
        assert!(!forbidden.success);

        let (status, completed) = client
            .post(host_id, &format!("/bookings/{}/complete", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 200, "{:?}", completed.error);
        let completed = completed.data.unwrap();
        assert_eq!(completed["booking"]["status"], "completed");
        assert_eq!(
            decimal_field(&completed, "payout"),
            Decimal::from_str("291.00").unwrap()
        );

        // Host receives 97% of 300 on top of the signup credit.
        let host_wallet = client.get(host_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&host_wallet.data.unwrap(), "balance"),
            Decimal::from(791)
        );

        // Completion is not repeatable.
        let (status, repeat) = client
            .post(host_id, &format!("/bookings/{}/complete", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(!repeat.success);

        // The completed stay unlocks the review, exactly once.
        let (status, review) = client
            .post(
                guest_id,
                "/reviews",
                json!({ "booking_id": booking_id, "rating": 5, "comment": "Spotless" }),
            )
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", review.error);

        let (status, duplicate) = client
            .post(
                guest_id,
                "/reviews",
                json!({ "booking_id": booking_id, "rating": 4 }),
            )
            .await
            .unwrap();
        assert_eq!(status, 409);

        let detail = client
            .get(guest_id, &format!("/properties/{}", listing_id))
            .await
            .unwrap();
        let detail = detail.data.unwrap();
        assert_eq!(detail["review_count"].as_i64().unwrap(), 1);
        assert_eq!(detail["avg_rating"].as_f64().unwrap(), 5.0);
    }

    #[tokio::test]
    async fn test_future_stay_cannot_be_completed() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "early", "100").await;
        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2029-01-01", "2029-01-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking_id = booking.data.unwrap()["id"].as_i64().unwrap();

        let (status, response) = client
            .post(host_id, &format!("/bookings/{}/complete", booking_id), json!({}))
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(response.error.unwrap().contains("not passed"));
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_identity_header_is_unauthorized() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (status, response) = client.get_no_auth("/users/me").await.unwrap();
        assert_eq!(status, 401);
        assert!(!response.success);
        assert!(response.error.unwrap().contains("X-User-Id"));
    }
}

#[cfg(test)]
mod recommendation_tests {
    use super::*;

    #[tokio::test]
    async fn test_booking_history_personalizes_recommendations() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let guest = client
            .register(&unique_email("rec_guest"), "Guest", "guest")
            .await
            .unwrap();
        let guest_id = user_id(&guest);
        let host = client
            .register(&unique_email("rec_host"), "Host", "host")
            .await
            .unwrap();
        let host_id = user_id(&host);

        // A city unique to this run keeps the pool deterministic.
        let city = format!(
            "Recville{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );

        let mut listing_ids = Vec::new();
        for i in 0..4 {
            let (status, property) = client
                .create_property_in(host_id, &format!("Stay {}", i), &city, "80", 4)
                .await
                .unwrap();
            assert_eq!(status, 201, "{:?}", property.error);
            listing_ids.push(property.data.unwrap()["id"].as_i64().unwrap());
        }

        let (status, booking) = client
            .create_booking(guest_id, listing_ids[0], "2028-03-01", "2028-03-03")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);

        let response = client.get(guest_id, "/properties/recommendations").await.unwrap();
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["type"], "personalized");
        let properties = data["properties"].as_array().unwrap();
        assert_eq!(properties.len(), 3);
        for property in properties {
            assert_eq!(property["city"].as_str().unwrap(), city);
            assert_ne!(property["id"].as_i64().unwrap(), listing_ids[0]);
        }
    }

    #[tokio::test]
    async fn test_anonymous_users_get_popular_listings() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (status, response) = client
            .get_no_auth("/properties/recommendations")
            .await
            .unwrap();
        assert_eq!(status, 200);
        let data = response.data.unwrap();
        assert_eq!(data["type"], "popular");
        assert!(data["properties"].as_array().unwrap().len() <= 8);
    }
}

#[cfg(test)]
mod crypto_checkout_tests {
    use super::*;

    #[tokio::test]
    async fn test_intent_quotes_sol_at_fixed_rate() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        // 3 nights x 100 = 300 USD; 300 * 0.00617 = 1.851 SOL.
        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "sol", "100").await;

        let (status, intent) = client
            .post(
                guest_id,
                "/bookings/initiate",
                json!({
                    "listing_id": listing_id,
                    "check_in": "2027-10-01",
                    "check_out": "2027-10-04",
                    "currency": "sol"
                }),
            )
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", intent.error);
        let intent = intent.data.unwrap();
        assert_eq!(decimal_field(&intent, "pay_amount"), Decimal::from_str("1.851").unwrap());
        assert_eq!(decimal_field(&intent, "amount_usd"), Decimal::from(300));
        assert_eq!(intent["pay_currency"], "SOL");
        assert_eq!(intent["network"], "Solana");
        assert_eq!(intent["status"], "waiting");
        assert!(intent["payment_id"].as_str().unwrap().starts_with("pay_"));
        assert_eq!(intent["pay_address"].as_str().unwrap().len(), 44);
    }

    #[tokio::test]
    async fn test_confirm_creates_booking_exactly_once() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "confirm", "100").await;

        let (status, intent) = client
            .post(
                guest_id,
                "/bookings/initiate",
                json!({
                    "listing_id": listing_id,
                    "check_in": "2027-11-01",
                    "check_out": "2027-11-04",
                    "currency": "btc"
                }),
            )
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", intent.error);
        let payment_id = intent.data.unwrap()["payment_id"].as_str().unwrap().to_string();

        // Poll before confirming: still waiting, no booking.
        let pending = client
            .get(guest_id, &format!("/bookings/payments/{}", payment_id))
            .await
            .unwrap();
        let pending = pending.data.unwrap();
        assert_eq!(pending["status"], "waiting");
        assert_eq!(pending["booking_created"], false);

        let (status, confirmed) = client
            .post(
                guest_id,
                &format!("/bookings/payments/{}/confirm", payment_id),
                json!({}),
            )
            .await
            .unwrap();
        assert_eq!(status, 200, "{:?}", confirmed.error);
        let confirmed = confirmed.data.unwrap();
        assert_eq!(confirmed["status"], "finished");
        assert_eq!(confirmed["booking_created"], true);
        assert!(confirmed["booking_id"].as_i64().is_some());

        // Crypto money never touches the guest wallet.
        let wallet = client.get(guest_id, "/wallet").await.unwrap();
        let wallet = wallet.data.unwrap();
        assert_eq!(decimal_field(&wallet, "balance"), Decimal::from(500));
        // Loyalty: floor(300 USD) = 300 points.
        assert_eq!(wallet["loyalty_points"].as_i64().unwrap(), 300);

        // Host is paid 97% instantly on the crypto path: 500 + 291 = 791.
        let host_wallet = client.get(host_id, "/wallet").await.unwrap();
        assert_eq!(
            decimal_field(&host_wallet.data.unwrap(), "balance"),
            Decimal::from(791)
        );

        // The checkout advertises its supported tickers.
        let currencies = client
            .get(guest_id, "/bookings/payments/currencies")
            .await
            .unwrap();
        let currencies = currencies.data.unwrap();
        let list = currencies["currencies"].as_array().unwrap();
        assert_eq!(list.len(), 7);
        assert!(list.iter().any(|c| c == "btc"));
        assert!(list.iter().any(|c| c == "doge"));

        // A second confirm is a conflict, not a second booking.
        let (status, repeat) = client
            .post(
                guest_id,
                &format!("/bookings/payments/{}/confirm", payment_id),
                json!({}),
            )
            .await
            .unwrap();
        assert_eq!(status, 409);
        assert!(repeat.error.unwrap().contains("already processed"));
    }

    #[tokio::test]
    async fn test_confirm_fails_when_dates_taken_meanwhile() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "race", "100").await;
        let rival = client
            .register(&unique_email("race_rival"), "Rival", "guest")
            .await
            .unwrap();
        let rival_id = user_id(&rival);

        let (status, intent) = client
            .post(
                guest_id,
                "/bookings/initiate",
                json!({
                    "listing_id": listing_id,
                    "check_in": "2027-12-01",
                    "check_out": "2027-12-04",
                    "currency": "eth"
                }),
            )
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", intent.error);
        let payment_id = intent.data.unwrap()["payment_id"].as_str().unwrap().to_string();

        // Rival books the same dates with their wallet before confirmation.
        let (status, rival_booking) = client
            .create_booking(rival_id, listing_id, "2027-12-01", "2027-12-04")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", rival_booking.error);

        let (status, response) = client
            .post(
                guest_id,
                &format!("/bookings/payments/{}/confirm", payment_id),
                json!({}),
            )
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(response.error.unwrap().contains("no longer available"));
    }
}

#[cfg(test)]
mod wallet_tests {
    use super::*;

    #[tokio::test]
    async fn test_topup_and_ledger_history() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let guest = client
            .register(&unique_email("topup"), "Saver", "guest")
            .await
            .unwrap();
        let guest_id = user_id(&guest);

        let (status, topped) = client.topup(guest_id, "250.50").await.unwrap();
        assert_eq!(status, 200, "{:?}", topped.error);
        assert_eq!(
            decimal_field(&topped.data.unwrap(), "new_balance"),
            Decimal::from_str("750.50").unwrap()
        );

        let history = client.get(guest_id, "/wallet/transactions").await.unwrap();
        let history = history.data.unwrap();
        assert_eq!(history["total"].as_i64().unwrap(), 1);
        let entry = &history["items"].as_array().unwrap()[0];
        assert_eq!(entry["transaction_type"], "wallet_topup");
        assert_eq!(decimal_field(entry, "amount"), Decimal::from_str("250.50").unwrap());
    }

    #[tokio::test]
    async fn test_topup_bounds() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let guest = client
            .register(&unique_email("bounds"), "Bounds", "guest")
            .await
            .unwrap();
        let guest_id = user_id(&guest);

        let (status, _) = client.topup(guest_id, "0").await.unwrap();
        assert_eq!(status, 400);
        let (status, _) = client.topup(guest_id, "-10").await.unwrap();
        assert_eq!(status, 400);
        let (status, _) = client.topup(guest_id, "100001").await.unwrap();
        assert_eq!(status, 400);
        let (status, ok) = client.topup(guest_id, "100000").await.unwrap();
        assert_eq!(status, 200, "{:?}", ok.error);
    }
}

#[cfg(test)]
mod notification_tests {
    use super::*;

    #[tokio::test]
    async fn test_host_notified_on_booking() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, host_id, listing_id) =
            setup_guest_host_listing(&client, "notify", "100").await;
        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2028-01-01", "2028-01-03")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);

        let notifications = client.get(host_id, "/notifications").await.unwrap();
        let notifications = notifications.data.unwrap();
        let list = notifications.as_array().unwrap();
        assert!(!list.is_empty(), "host should have a booking notification");
        assert_eq!(list[0]["notif_type"], "booking");
        assert_eq!(list[0]["is_read"], false);

        let notification_id = list[0]["id"].as_i64().unwrap();
        let (status, read) = client
            .post(
                host_id,
                &format!("/notifications/{}/read", notification_id),
                json!({}),
            )
            .await
            .unwrap();
        assert_eq!(status, 200, "{:?}", read.error);
    }
}

#[cfg(test)]
mod review_tests {
    use super::*;

    #[tokio::test]
    async fn test_review_requires_completed_stay() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let (guest_id, _host_id, listing_id) =
            setup_guest_host_listing(&client, "review", "100").await;
        let (status, booking) = client
            .create_booking(guest_id, listing_id, "2028-02-01", "2028-02-03")
            .await
            .unwrap();
        assert_eq!(status, 201, "{:?}", booking.error);
        let booking_id = booking.data.unwrap()["id"].as_i64().unwrap();

        let (status, response) = client
            .post(
                guest_id,
                "/reviews",
                json!({ "booking_id": booking_id, "rating": 5, "comment": "Great" }),
            )
            .await
            .unwrap();
        assert_eq!(status, 400);
        assert!(response.error.unwrap().contains("completed"));
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let client = TestClient::new();
        if !wait_for_server(&client, 5).await {
            return;
        }

        let guest = client
            .register(&unique_email("rating"), "Rater", "guest")
            .await
            .unwrap();
        let (status, _) = client
            .post(
                user_id(&guest),
                "/reviews",
                json!({ "booking_id": 1, "rating": 6 }),
            )
            .await
            .unwrap();
        assert_eq!(status, 400);
    }
}

use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use prometheus::{Counter, Encoder, Gauge, Registry, TextEncoder};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static BOOKINGS_CREATED: Lazy<Counter> = Lazy::new(|| {
    let counter = Counter::new("bookings_created_total", "Bookings confirmed").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});
static BOOKINGS_CANCELLED: Lazy<Counter> = Lazy::new(|| {
    let counter = Counter::new("bookings_cancelled_total", "Bookings cancelled").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});
static PAYMENT_INTENTS: Lazy<Counter> = Lazy::new(|| {
    let counter = Counter::new("payment_intents_total", "Crypto payment intents created").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});
static LEDGER_VOLUME_USD: Lazy<Gauge> = Lazy::new(|| {
    let gauge = Gauge::new("ledger_volume_usd", "Absolute ledger volume in USD").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub fn increment_bookings_created() {
    BOOKINGS_CREATED.inc();
}
pub fn increment_bookings_cancelled() {
    BOOKINGS_CANCELLED.inc();
}
pub fn increment_payment_intents() {
    PAYMENT_INTENTS.inc();
}
pub fn add_ledger_volume(amount_usd: f64) {
    LEDGER_VOLUME_USD.add(amount_usd.abs());
}

pub async fn metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let metrics_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metrics_families, &mut buffer).unwrap();

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use prometheus::IntCounter;

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> impl Responder {
    match actix_middleware::metrics::render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help)
        .and_then(|c| {
            prometheus::default_registry().register(Box::new(c.clone()))?;
            Ok(c)
        })
        .unwrap_or_else(|e| {
            tracing::error!("failed to create {} counter: {}", name, e);
            // Unregistered stand-in; increments are not exported.
            IntCounter::new("dummy", "dummy").expect("dummy counter")
        })
}

static REGISTER_REQUESTS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("register_requests_total", "Total number of register requests"));

static LOGIN_REQUESTS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("login_requests_total", "Total number of login requests"));

static LOGIN_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "login_failures_total",
        "Total number of failed login attempts (wrong password or unknown user)",
    )
});

static LOGOUTS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("logouts_total", "Total number of successful logouts"));

#[inline]
pub fn inc_register_requests() {
    REGISTER_REQUESTS_TOTAL.inc();
}

#[inline]
pub fn inc_login_requests() {
    LOGIN_REQUESTS_TOTAL.inc();
}

#[inline]
pub fn inc_login_failures() {
    LOGIN_FAILURES_TOTAL.inc();
}

#[inline]
pub fn inc_logouts() {
    LOGOUTS_TOTAL.inc();
}

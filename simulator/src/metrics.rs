use crate::errors::Result;
use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_PUBLISHED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_readings_published_total",
        "Sensor readings handed to the broker session"
    ))
    .expect("valid metric opts");
    pub static ref PUBLISH_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_publish_failures_total",
        "Readings or status events that could not be published"
    ))
    .expect("valid metric opts");
    pub static ref STATUS_EVENTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_status_events_total",
        "ONLINE/OFFLINE status events published"
    ))
    .expect("valid metric opts");
    pub static ref IRRIGATION_EVENTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_irrigation_events_total",
        "Simulated irrigation events"
    ))
    .expect("valid metric opts");
    pub static ref BROKER_DISCONNECTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "simulator_broker_disconnects_total",
        "Times the broker session dropped"
    ))
    .expect("valid metric opts");
    pub static ref SIMULATED_HOUR: Gauge = Gauge::with_opts(Opts::new(
        "simulator_simulated_hour",
        "Simulated hour of day at the last tick"
    ))
    .expect("valid metric opts");
}

pub fn init_metrics() -> Result<()> {
    REGISTRY.register(Box::new(READINGS_PUBLISHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PUBLISH_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(IRRIGATION_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BROKER_DISCONNECTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SIMULATED_HOUR.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Serves `/metrics` until the process exits.
pub async fn serve(addr: &str) -> Result<()> {
    use axum::{http::StatusCode, routing::get, Router};

    let app = Router::new().route(
        "/metrics",
        get(|| async {
            gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics endpoint listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

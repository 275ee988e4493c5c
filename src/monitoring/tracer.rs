/*!
 * Structured Tracing
 * Subscriber setup and activation spans
 */

use tracing::{info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Environment variable switching the subscriber to JSON output
pub const TRACE_JSON_ENV: &str = "HARDENING_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - HARDENING_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("Structured tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
        info!("Structured tracing initialized");
    }
}

/// Generate a unique id correlating every log line of one activation
pub fn generate_activation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping a single image activation
pub fn activation_span(pid: u32, tid: u32, image: &str) -> Span {
    let activation_id = generate_activation_id();
    span!(
        Level::DEBUG,
        "activation",
        activation_id = %activation_id,
        pid = pid,
        tid = tid,
        image = image,
        phase = tracing::field::Empty,
    )
}

//! Tracing subscriber setup for applications embedding the client.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "lockshop_client=info";

/// Environment variable selecting JSON output (`LOCKSHOP_LOG_FORMAT=json`).
pub const LOG_FORMAT_VAR: &str = "LOCKSHOP_LOG_FORMAT";

/// Install a global subscriber.
///
/// Text output by default, JSON lines when `LOCKSHOP_LOG_FORMAT=json`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init() -> Result<(), TryInitError> {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let json = std::env::var(LOG_FORMAT_VAR).is_ok_and(|v| is_json(&v));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
}

fn is_json(format: &str) -> bool {
    format.trim().eq_ignore_ascii_case("json")
}

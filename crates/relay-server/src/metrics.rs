//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

// Metric name constants to avoid typos across modules.

/// Sessions opened total (counter).
pub const SESSIONS_TOTAL: &str = "relay_sessions_total";
/// Sessions closed total (counter).
pub const SESSIONS_CLOSED_TOTAL: &str = "relay_sessions_closed_total";
/// Active sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "relay_sessions_active";
/// Inbound messages appended and published (counter).
pub const MESSAGES_IN_TOTAL: &str = "relay_messages_in_total";
/// Payloads dropped during fan-out (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "relay_broadcast_drops_total";
/// Channel listener state (gauge). 1 = consuming, 0 = down.
pub const LISTENER_UP: &str = "relay_listener_up";
/// Session duration seconds (histogram).
pub const SESSION_DURATION_SECONDS: &str = "relay_session_duration_seconds";

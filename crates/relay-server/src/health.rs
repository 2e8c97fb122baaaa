//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when the channel listener has died and the
    /// process only relays within itself.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Current live session count.
    pub connections: usize,
    /// Whether the channel listener is consuming the pub/sub stream.
    pub listener_running: bool,
}

/// Build a health response from live state.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    listener_started: bool,
    listener_running: bool,
) -> HealthResponse {
    // Not yet started is fine; the listener comes up with the first session.
    let degraded = listener_started && !listener_running;
    HealthResponse {
        status: if degraded { "degraded" } else { "ok" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        listener_running,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_before_listener_starts() {
        let resp = health_check(Instant::now(), 0, false, false);
        assert_eq!(resp.status, "ok");
        assert!(!resp.listener_running);
    }

    #[test]
    fn ok_while_listener_runs() {
        let resp = health_check(Instant::now(), 3, true, true);
        assert_eq!(resp.status, "ok");
        assert!(resp.listener_running);
    }

    #[test]
    fn degraded_when_listener_died() {
        let resp = health_check(Instant::now(), 3, true, false);
        assert_eq!(resp.status, "degraded");
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, 0, false, false);
        assert!(resp.uptime_secs >= 59);
    }

    #[test]
    fn serialization() {
        let resp = health_check(Instant::now(), 2, true, true);
        let parsed: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&resp).unwrap()).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 2);
        assert_eq!(parsed["listener_running"], true);
        assert!(parsed["uptime_secs"].is_number());
    }
}

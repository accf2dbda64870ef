//! Metrics collection and exposition.
//!
//! # Metrics
//! - `celo_mcp_session_events_total` (counter): created / armed / cleared / expired, by namespace
//! - `celo_mcp_sessions_live` (gauge): records held, by namespace
//! - `celo_mcp_tool_calls_total` (counter): by tool and outcome
//! - `celo_mcp_tool_duration_seconds` (histogram): by tool
//! - `celo_mcp_rpc_failures_total` (counter): by RPC method

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_event(namespace: &str, event: &'static str) {
    counter!(
        "celo_mcp_session_events_total",
        "namespace" => namespace.to_string(),
        "event" => event
    )
    .increment(1);
}

pub fn record_live_sessions(namespace: &str, count: usize) {
    gauge!("celo_mcp_sessions_live", "namespace" => namespace.to_string()).set(count as f64);
}

pub fn record_tool_call(tool: &str, success: bool, start: Instant) {
    let outcome = if success { "success" } else { "error" };
    counter!(
        "celo_mcp_tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("celo_mcp_tool_duration_seconds", "tool" => tool.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rpc_failure(method: &'static str) {
    counter!("celo_mcp_rpc_failures_total", "method" => method).increment(1);
}

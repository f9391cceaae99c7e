//! Metrics collection and exposition.
//!
//! # Metrics
//! - `minter_actions_total` (counter): write actions by `kind` and `outcome`
//!   (succeeded, failed, rejected, abandoned)
//! - `minter_balance_refresh_total` (counter): balance reads by `outcome`
//!   (ok, error, stale)
//!
//! Without an installed recorder these calls are no-ops.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

use crate::coordinator::ActionKind;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_action(kind: ActionKind, outcome: &'static str) {
    ::metrics::counter!("minter_actions_total", "kind" => kind.as_str(), "outcome" => outcome)
        .increment(1);
}

pub fn record_balance_refresh(outcome: &'static str) {
    ::metrics::counter!("minter_balance_refresh_total", "outcome" => outcome).increment(1);
}

//! # Prometheus Metrics
//!
//! Operational metrics for the ledger host, scraped at `/metrics` on the
//! metrics port. Everything is registered in a dedicated
//! [`prometheus::Registry`] with the `tally` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Outcome label recorded for a successful operation.
pub const OUTCOME_OK: &str = "ok";

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Operations handled, by operation name and outcome (`ok` or an error
    /// kind such as `InsufficientFunds`).
    pub operations_total: IntCounterVec,
    /// Accounts in the registry after the latest committed invocation.
    pub registered_accounts: IntGauge,
    /// Time spent inside the invocation lock, from staging to commit.
    pub invocation_latency_seconds: HistogramVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tally".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new(
                "operations_total",
                "Ledger operations handled, by operation and outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let registered_accounts = IntGauge::new(
            "registered_accounts",
            "Number of account ids in the registry",
        )?;
        registry.register(Box::new(registered_accounts.clone()))?;

        let invocation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "invocation_latency_seconds",
                "Latency of mutating invocations including commit, in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["operation"],
        )?;
        registry.register(Box::new(invocation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            registered_accounts,
            invocation_latency_seconds,
        })
    }

    /// Count one operation with its outcome.
    pub fn record(&self, operation: &str, outcome: &str) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_metrics_carry_prefix_and_labels() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.record("transfer", OUTCOME_OK);
        metrics.record("transfer", "AuthError");
        metrics.registered_accounts.set(2);

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"tally_operations_total{operation="transfer",outcome="ok"} 1"#));
        assert!(text.contains(r#"outcome="AuthError""#));
        assert!(text.contains("tally_registered_accounts 2"));
    }
}

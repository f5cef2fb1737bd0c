//! Prometheus metrics for reconciliation passes and convergence actions.

use crate::convergence::Outcome;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Operator metrics in a private registry
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounterVec,
    actions: IntCounterVec,
    duration: HistogramVec,
}

impl Metrics {
    /// Create and register all collectors
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("mariadb_operator".to_string()), None)?;

        let reconciliations = IntCounterVec::new(
            Opts::new("reconcile_total", "Reconciliation passes by kind and result"),
            &["kind", "result"],
        )?;
        let actions = IntCounterVec::new(
            Opts::new("convergence_actions_total", "Dependent object convergence outcomes"),
            &["kind", "outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new("reconcile_duration_seconds", "Duration of reconciliation passes"),
            &["kind"],
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(actions.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            actions,
            duration,
        })
    }

    /// Record a finished pass; `result` is "success", "requeue" or "error"
    pub fn observe_reconcile(&self, kind: &str, result: &str, elapsed: Duration) {
        self.reconciliations.with_label_values(&[kind, result]).inc();
        self.duration.with_label_values(&[kind]).observe(elapsed.as_secs_f64());
    }

    /// Count one convergence action
    pub fn record_outcome(&self, kind: &str, outcome: Outcome) {
        self.actions.with_label_values(&[kind, outcome.as_str()]).inc();
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.observe_reconcile("MariaDB", "success", Duration::from_millis(40));
        metrics.record_outcome("Deployment", Outcome::Created);

        let text = metrics.render().unwrap();
        assert!(text.contains("mariadb_operator_reconcile_total{kind=\"MariaDB\",result=\"success\"} 1"));
        assert!(text.contains(
            "mariadb_operator_convergence_actions_total{kind=\"Deployment\",outcome=\"created\"} 1"
        ));
        assert!(text.contains("mariadb_operator_reconcile_duration_seconds_count{kind=\"MariaDB\"} 1"));
    }
}

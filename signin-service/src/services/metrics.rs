use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use std::time::Duration;

/// Outcome label for successful attempts; failures use the error kind.
pub const OUTCOME_AUTHENTICATED: &str = "authenticated";

struct SignInMetrics {
    registry: Registry,
    attempts_total: IntCounterVec,
    duration_seconds: HistogramVec,
}

impl SignInMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let attempts_total = IntCounterVec::new(
            Opts::new("signin_attempts_total", "Total number of sign-in attempts"),
            &["outcome"],
        )?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "signin_duration_seconds",
                "Sign-in duration in seconds, from trigger to result",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(attempts_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;

        Ok(Self {
            registry,
            attempts_total,
            duration_seconds,
        })
    }
}

static METRICS: OnceLock<SignInMetrics> = OnceLock::new();

/// Create and register the sign-in collectors. Later calls are no-ops.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_some() {
        return Ok(());
    }

    let metrics = SignInMetrics::new()?;
    let _ = METRICS.set(metrics);
    Ok(())
}

/// Record one finished attempt. Does nothing when metrics are not initialized.
pub fn record_attempt(outcome: &str, elapsed: Duration) {
    if let Some(metrics) = METRICS.get() {
        metrics.attempts_total.with_label_values(&[outcome]).inc();
        metrics
            .duration_seconds
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());
    }
}

/// Render the registry in the Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let Some(metrics) = METRICS.get() else {
        return String::new();
    };

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_after_init_is_exported() {
        init_metrics().unwrap();
        record_attempt(OUTCOME_AUTHENTICATED, Duration::from_millis(12));
        record_attempt("user_cancelled", Duration::from_millis(3));

        let rendered = encode_metrics();
        assert!(rendered.contains("signin_attempts_total{outcome=\"authenticated\"}"));
        assert!(rendered.contains("signin_attempts_total{outcome=\"user_cancelled\"}"));
        assert!(rendered.contains("signin_duration_seconds_bucket"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init_metrics().unwrap();
        init_metrics().unwrap();
    }
}

//! # Metrics
//!
//! One Prometheus registry per process: a request counter labelled by
//! method, matched route and status, and gauges that mirror the
//! propagation worker's counters at scrape time.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use services::PropagationSnapshot;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RequestLabels {
    method: String,
    route: String,
    status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: String,
}

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    requests: Family<RequestLabels, Counter>,
    propagation: Family<OutcomeLabels, Gauge>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("agora");
        let requests = Family::<RequestLabels, Counter>::default();
        let propagation = Family::<OutcomeLabels, Gauge>::default();

        registry.register("http_requests", "HTTP requests served", requests.clone());
        registry.register(
            "propagation_jobs",
            "Ancestor propagation jobs by outcome",
            propagation.clone(),
        );

        Self {
            registry,
            requests,
            propagation,
        }
    }

    pub fn record_request(&self, method: &str, route: &str, status: u16) {
        self.requests
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                route: route.to_string(),
                status: status.to_string(),
            })
            .inc();
    }

    pub fn observe_propagation(&self, snapshot: PropagationSnapshot) {
        for (outcome, value) in [
            ("completed", snapshot.completed),
            ("failed", snapshot.failed),
            ("retried", snapshot.retried),
            ("dropped", snapshot.dropped),
        ] {
            self.propagation
                .get_or_create(&OutcomeLabels {
                    outcome: outcome.to_string(),
                })
                .set(i64::try_from(value).unwrap_or(i64::MAX));
        }
    }

    /// OpenMetrics text exposition of the whole registry.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_carries_requests_and_propagation() {
        let metrics = Metrics::new();
        metrics.record_request("GET", "/api/v1/forum/post", 200);
        metrics.record_request("GET", "/api/v1/forum/post", 200);
        metrics.observe_propagation(PropagationSnapshot {
            completed: 4,
            failed: 1,
            retried: 2,
            dropped: 3,
        });

        let text = metrics.render().unwrap();
        assert!(text.contains(
            r#"agora_http_requests_total{method="GET",route="/api/v1/forum/post",status="200"} 2"#
        ));
        assert!(text.contains(r#"agora_propagation_jobs{outcome="completed"} 4"#));
        assert!(text.contains(r#"agora_propagation_jobs{outcome="retried"} 2"#));
        assert!(text.contains(r#"agora_propagation_jobs{outcome="dropped"} 3"#));
        assert!(text.ends_with("# EOF\n"));
    }
}

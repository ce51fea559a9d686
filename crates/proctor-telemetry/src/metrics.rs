//! Prometheus metrics for the session host.
//!
//! Session-level metrics live in `proctor-session` (feature `metrics`) and
//! register with the default registry; this module owns host-level metrics
//! and renders everything in the text exposition format.

use lazy_static::lazy_static;
use prometheus::{register_gauge_vec, Encoder, GaugeVec, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Constant 1, labeled with service and version
    pub static ref BUILD_INFO: GaugeVec = register_gauge_vec!(
        "proctor_build_info",
        "Build information of the session host",
        &["service", "version"]
    )
    .expect("Failed to create BUILD_INFO metric");
}

/// Handle proving host metrics were registered.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    service: String,
}

impl MetricsHandle {
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Render all registered metrics.
    pub fn render(&self) -> Result<String, TelemetryError> {
        encode_metrics()
    }
}

/// Register host metrics for a service.
pub fn register_metrics(service: &str) -> MetricsHandle {
    BUILD_INFO
        .with_label_values(&[service, env!("CARGO_PKG_VERSION")])
        .set(1.0);
    MetricsHandle {
        service: service.to_string(),
    }
}

/// Encode all metrics in the default registry as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

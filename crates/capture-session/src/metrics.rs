use crate::{Result, SessionError};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Counters for one capture session.
#[derive(Clone)]
pub struct SessionMetrics {
    pub registry: Registry,
    pub refreshes: IntCounter,
    pub deliveries: IntCounter,
    pub sink_failures: IntCounter,
    pub region_faults: IntCounter,
    pub persistent_bytes: IntGauge,
    pub periodic_bytes: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let c = IntCounter::new(name, help).map_err(|e| SessionError::Metrics(e.to_string()))?;
    registry
        .register(Box::new(c.clone()))
        .map_err(|e| SessionError::Metrics(e.to_string()))?;
    Ok(c)
}

impl SessionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let persistent_bytes = IntGauge::new(
            "urcl_persistent_bytes",
            "Size of the latest persistent snapshot",
        )
        .map_err(|e| SessionError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(persistent_bytes.clone()))
            .map_err(|e| SessionError::Metrics(e.to_string()))?;
        Ok(Self {
            refreshes: counter(&registry, "urcl_refreshes", "Driver refreshes read")?,
            deliveries: counter(&registry, "urcl_deliveries", "Payload triples delivered to a sink")?,
            sink_failures: counter(&registry, "urcl_sink_failures", "Sink deliveries that failed")?,
            region_faults: counter(
                &registry,
                "urcl_region_faults",
                "Reads rejected for an out-of-range length prefix",
            )?,
            periodic_bytes: counter(&registry, "urcl_periodic_bytes", "Periodic payload bytes read")?,
            persistent_bytes,
            registry,
        })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let metrics = SessionMetrics::new().unwrap();
        metrics.refreshes.inc();
        metrics.periodic_bytes.inc_by(28);
        let text = metrics.encode_text();
        assert!(text.contains("urcl_refreshes 1"));
        assert!(text.contains("urcl_periodic_bytes 28"));
    }

    #[test]
    fn sessions_do_not_share_counters() {
        let a = SessionMetrics::new().unwrap();
        let b = SessionMetrics::new().unwrap();
        a.deliveries.inc();
        assert_eq!(b.deliveries.get(), 0);
    }
}

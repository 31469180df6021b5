//! Metrics recorder initialization and configuration.

use {anyhow::Result, tracing::info};

/// Handle to the metrics system, providing access to exported metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle.render()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup. With the `prometheus` feature this installs the
/// Prometheus recorder globally; otherwise every metric is discarded.
///
/// # Errors
///
/// Returns an error if the recorder fails to install.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle {
            #[cfg(feature = "prometheus")]
            prometheus_handle: metrics_exporter_prometheus::PrometheusBuilder::new()
                .build_recorder()
                .handle(),
        });
    }

    #[cfg(feature = "prometheus")]
    {
        let handle = init_prometheus(config)?;
        info!("prometheus metrics recorder installed");
        Ok(MetricsHandle {
            prometheus_handle: handle,
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics feature not enabled at compile time");
        Ok(MetricsHandle {})
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(
    config: MetricsRecorderConfig,
) -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    use {
        crate::{buckets, dispatch},
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(dispatch::DISPATCH_DURATION_SECONDS.to_string()),
        &buckets::DISPATCH_DURATION,
    )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    Ok(builder.install_recorder()?)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_metrics_render_nothing_meaningful() {
        let handle = init_metrics(MetricsRecorderConfig::default()).unwrap();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('#'));
    }
}

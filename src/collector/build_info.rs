use super::Collector;
use crate::metric::{MetricDescriptor, Sample};
use async_trait::async_trait;

const BUILD_INFO: &str = "gearman_exporter_build_info";

/// Reports the exporter's own version as a constant `1` gauge.
#[derive(Debug, Default)]
pub struct BuildInfoCollector;

#[async_trait]
impl Collector for BuildInfoCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        vec![
            MetricDescriptor::new(
                BUILD_INFO,
                "A metric with a constant '1' value labeled by the version gearman_exporter was built from.",
            )
            .with_label("version"),
        ]
    }

    async fn collect(&self) -> Vec<Sample> {
        vec![Sample::new(BUILD_INFO, 1.0).with_label("version", env!("CARGO_PKG_VERSION"))]
    }
}

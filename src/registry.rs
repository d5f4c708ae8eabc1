mod handlers;

use crate::{
    collector::Collector,
    error::ExporterError,
    metric::{MetricDescriptor, Sample},
};
use handlers::{handle_descriptor, handle_sample};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{collections::HashSet, sync::Arc};

/// Content type of the Prometheus text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// A set of collectors scraped together.
#[derive(Default)]
pub struct Registry {
    collectors: Vec<Arc<dyn Collector>>,
    descriptors: Vec<MetricDescriptor>,
    names: HashSet<String>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collector after validating the metrics it describes.
    ///
    /// # Errors
    /// Returns an error if a described metric or label name is not a valid
    /// Prometheus name, or if a metric name is already registered. Nothing is
    /// registered on error.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> Result<(), ExporterError> {
        let described = collector.describe();

        let mut incoming = HashSet::new();
        for descriptor in &described {
            if !is_valid_metric_name(&descriptor.name) {
                return Err(ExporterError::InvalidMetricName(descriptor.name.clone()));
            }
            if let Some(label) = descriptor
                .label_names
                .iter()
                .find(|label| !is_valid_label_name(label))
            {
                return Err(ExporterError::InvalidMetricName(label.clone()));
            }
            if self.names.contains(&descriptor.name) || !incoming.insert(descriptor.name.clone())
            {
                return Err(ExporterError::DuplicateMetric(descriptor.name.clone()));
            }
        }

        self.names.extend(incoming);
        self.descriptors.extend(described);
        self.collectors.push(collector);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    /// Collects every registered collector, in registration order.
    pub async fn gather(&self) -> Vec<Sample> {
        let mut samples = Vec::new();
        for collector in &self.collectors {
            samples.extend(collector.collect().await);
        }
        samples
    }

    /// Gathers all collectors and renders the result as Prometheus text.
    pub async fn render(&self) -> String {
        let samples = self.gather().await;
        encode(&self.descriptors, &samples)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("collectors", &self.collectors.len())
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

/// Renders one scrape's samples through a recorder that lives only for this
/// call, so series missing from `samples` never show up in the output.
#[must_use]
pub fn encode(descriptors: &[MetricDescriptor], samples: &[Sample]) -> String {
    let recorder = PrometheusBuilder::new().build_recorder();
    metrics::with_local_recorder(&recorder, || {
        descriptors.iter().for_each(handle_descriptor);
        samples.iter().for_each(handle_sample);
    });
    recorder.handle().render()
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    !name.starts_with("__")
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

use crate::metric::{MetricDescriptor, Sample};

pub fn handle_descriptor(descriptor: &MetricDescriptor) {
    metrics::describe_gauge!(descriptor.name.clone(), descriptor.help.clone());
}

pub fn handle_sample(sample: &Sample) {
    if sample.labels.is_empty() {
        metrics::gauge!(sample.name.clone()).set(sample.value);
    } else {
        let labels: Vec<_> = sample
            .labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        metrics::gauge!(sample.name.clone(), &labels).set(sample.value);
    }
}

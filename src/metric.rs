use std::collections::BTreeMap;

/// Static description of a metric family.
///
/// Carries the fully-qualified name, the help text rendered on the `# HELP`
/// line, and the label names every sample of the family is keyed by.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl MetricDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label_names: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label_names.push(label.into());
        self
    }
}

/// A single gauge reading produced by a collect.
///
/// Contains the metric name, its labels, and the value.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            value,
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns the value of `key`, if this sample carries that label.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// A gauge family with a single variable label.
///
/// Values are keyed by the label value; setting the same key twice keeps the
/// last value.
#[derive(Debug, Clone)]
pub struct GaugeFamily {
    descriptor: MetricDescriptor,
    label: String,
    values: BTreeMap<String, f64>,
}

impl GaugeFamily {
    #[must_use]
    pub fn new(name: &str, help: &str, label: &str) -> Self {
        Self {
            descriptor: MetricDescriptor::new(name, help).with_label(label),
            label: label.to_string(),
            values: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub fn set(&mut self, label_value: &str, value: f64) {
        self.values.insert(label_value.to_string(), value);
    }

    #[cfg(test)]
    pub(crate) fn get(&self, label_value: &str) -> Option<f64> {
        self.values.get(label_value).copied()
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.values.iter().map(|(label_value, value)| {
            Sample::new(self.descriptor.name.clone(), *value)
                .with_label(self.label.clone(), label_value.clone())
        })
    }
}

mod build_info;
pub mod fetch;
mod gearman;
mod process;

use crate::metric::{MetricDescriptor, Sample};
use async_trait::async_trait;

pub use build_info::BuildInfoCollector;
pub use gearman::{FUNCTION_LABEL, GearmanCollector, MetricSet, NAMESPACE};
pub use process::{ProcessCollector, read_pid_file};

/// A source of metrics that is asked for fresh samples on every scrape.
///
/// `describe` lists the metric families the collector can emit and must not
/// depend on collected data; a [`Registry`](crate::Registry) calls it once at
/// registration to validate names. `collect` is called on every scrape and
/// never fails: collectors report their own failures through their samples.
#[async_trait]
pub trait Collector: Send + Sync {
    fn describe(&self) -> Vec<MetricDescriptor>;

    async fn collect(&self) -> Vec<Sample>;
}

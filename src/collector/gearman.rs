use super::{
    Collector,
    fetch::{ScrapeTarget, StatusFetcher, StatusSource},
};
use crate::{
    error::ExporterError,
    metric::{GaugeFamily, MetricDescriptor, Sample},
    stats::{FunctionStat, parse_status},
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;

pub const NAMESPACE: &str = "gearman";
pub const FUNCTION_LABEL: &str = "function";

const UP: &str = "gearman_up";

/// The four per-function gauge families.
#[derive(Debug, Clone)]
pub struct MetricSet {
    pub jobs: GaugeFamily,
    pub jobs_running: GaugeFamily,
    pub jobs_waiting: GaugeFamily,
    pub workers: GaugeFamily,
}

fn function_family(metric: &str, help: &str) -> GaugeFamily {
    GaugeFamily::new(
        &format!("{NAMESPACE}_function_{metric}"),
        help,
        FUNCTION_LABEL,
    )
}

impl Default for MetricSet {
    fn default() -> Self {
        Self {
            jobs: function_family("jobs", "number of jobs queued or running"),
            jobs_running: function_family("jobs_running", "number of running jobs"),
            jobs_waiting: function_family(
                "jobs_waiting",
                "number of jobs waiting for an available worker",
            ),
            workers: function_family("workers", "number of capable workers"),
        }
    }
}

impl MetricSet {
    fn families(&self) -> [&GaugeFamily; 4] {
        [&self.jobs, &self.jobs_running, &self.jobs_waiting, &self.workers]
    }

    pub fn reset(&mut self) {
        self.jobs.reset();
        self.jobs_running.reset();
        self.jobs_waiting.reset();
        self.workers.reset();
    }

    /// Publishes all four values of `stat` under its function name.
    pub fn record(&mut self, stat: &FunctionStat) {
        self.jobs.set(&stat.name, stat.total);
        self.jobs_running.set(&stat.name, stat.running);
        self.jobs_waiting.set(&stat.name, stat.waiting());
        self.workers.set(&stat.name, stat.workers);
    }

    pub fn descriptors(&self) -> impl Iterator<Item = MetricDescriptor> + '_ {
        self.families()
            .into_iter()
            .map(|family| family.descriptor().clone())
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.families()
            .into_iter()
            .flat_map(|family| family.samples())
    }
}

/// Everything a scrape mutates. Only reachable through the collector's lock.
#[derive(Debug, Default)]
struct ScrapeState {
    up: f64,
    functions: MetricSet,
}

impl ScrapeState {
    fn reset(&mut self) {
        self.functions.reset();
    }

    fn samples(&self) -> Vec<Sample> {
        std::iter::once(Sample::new(UP, self.up))
            .chain(self.functions.samples())
            .collect()
    }
}

/// Scrapes a Gearman server's `status` output on every collect.
///
/// Collects are serialized: one scrape runs at a time and every call sees
/// the samples of exactly one complete scrape.
pub struct GearmanCollector {
    source: Box<dyn StatusSource>,
    state: Mutex<ScrapeState>,
}

impl GearmanCollector {
    /// Creates a collector scraping `uri` (`tcp://host:port` or `unix:///path`).
    ///
    /// # Example
    /// ```
    /// use gearman_exporter::GearmanCollector;
    /// use std::time::Duration;
    ///
    /// let collector = GearmanCollector::new("tcp://127.0.0.1:4730", Duration::from_secs(5));
    /// assert!(collector.is_ok());
    /// assert!(GearmanCollector::new("http://127.0.0.1:4730", Duration::from_secs(5)).is_err());
    /// ```
    ///
    /// # Errors
    /// Returns an error if the URI scheme is unsupported or the URI has no
    /// host or socket path.
    pub fn new(uri: &str, timeout: Duration) -> Result<Self, ExporterError> {
        let target = ScrapeTarget::parse(uri, timeout)?;
        Ok(Self::with_source(StatusFetcher::new(target)))
    }

    /// Creates a collector reading status responses from `source`.
    pub fn with_source(source: impl StatusSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            state: Mutex::new(ScrapeState::default()),
        }
    }

    async fn scrape(&self, state: &mut ScrapeState) -> bool {
        let mut stream = match self.source.fetch().await {
            Ok(stream) => stream,
            Err(e) => {
                state.up = 0.0;
                log::error!("Can't scrape Gearman: {e}");
                return false;
            }
        };
        state.up = 1.0;

        let body = match stream.read_response().await {
            Ok(body) => body,
            Err(e) => {
                state.up = 0.0;
                log::error!("Can't read Gearman status response: {e}");
                return false;
            }
        };
        drop(stream);

        let data = String::from_utf8_lossy(&body);
        log::debug!("data: {data}");

        for stat in parse_status(&data) {
            log::debug!(
                "{} total={} running={} workers={} waiting={}",
                stat.name,
                stat.total,
                stat.running,
                stat.workers,
                stat.waiting()
            );
            state.functions.record(&stat);
        }
        true
    }
}

impl std::fmt::Debug for GearmanCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GearmanCollector").finish_non_exhaustive()
    }
}

#[async_trait]
impl Collector for GearmanCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        MetricSet::default()
            .descriptors()
            .chain(std::iter::once(MetricDescriptor::new(
                UP,
                "Was the last scrape of gearman successful.",
            )))
            .collect()
    }

    async fn collect(&self) -> Vec<Sample> {
        let mut state = self.state.lock().await;
        state.reset();
        self.scrape(&mut state).await;
        state.samples()
    }
}

//! Resource usage of the Gearman server process itself.
//!
//! The process is located through a PID file that is re-read on every
//! collect, so a restarted server is picked up without restarting the
//! exporter. Figures come from `/proc` and are only available on Linux.

use super::{Collector, gearman::NAMESPACE};
use crate::{
    error::ExporterError,
    metric::{MetricDescriptor, Sample},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const CPU_SECONDS: &str = "process_cpu_seconds_total";
const OPEN_FDS: &str = "process_open_fds";
const MAX_FDS: &str = "process_max_fds";
const VIRTUAL_MEMORY: &str = "process_virtual_memory_bytes";
const RESIDENT_MEMORY: &str = "process_resident_memory_bytes";
const START_TIME: &str = "process_start_time_seconds";

fn metric_name(metric: &str) -> String {
    format!("{NAMESPACE}_{metric}")
}

/// Reads a PID from `path`, ignoring surrounding whitespace.
///
/// # Errors
/// Returns [`ExporterError::PidFile`] if the file can't be read or does not
/// hold a process id.
pub fn read_pid_file(path: &Path) -> Result<i32, ExporterError> {
    let pid_error = |reason: String| ExporterError::PidFile {
        path: path.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(path).map_err(|e| pid_error(e.to_string()))?;
    content
        .trim()
        .parse()
        .map_err(|e| pid_error(format!("can't parse pid: {e}")))
}

/// One reading of a process's resource usage.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessStats {
    pub cpu_seconds: f64,
    pub open_fds: f64,
    /// `None` when the soft limit is unlimited.
    pub max_fds: Option<f64>,
    pub virtual_memory: f64,
    pub resident_memory: f64,
    pub start_time: f64,
}

impl ProcessStats {
    fn samples(&self) -> Vec<Sample> {
        let mut samples = vec![
            Sample::new(metric_name(CPU_SECONDS), self.cpu_seconds),
            Sample::new(metric_name(OPEN_FDS), self.open_fds),
            Sample::new(metric_name(VIRTUAL_MEMORY), self.virtual_memory),
            Sample::new(metric_name(RESIDENT_MEMORY), self.resident_memory),
            Sample::new(metric_name(START_TIME), self.start_time),
        ];
        if let Some(max_fds) = self.max_fds {
            samples.push(Sample::new(metric_name(MAX_FDS), max_fds));
        }
        samples
    }
}

/// Reads the resource usage of `pid` from `/proc`.
///
/// # Errors
/// Returns [`ExporterError::Process`] if the process is gone or its `/proc`
/// entries can't be read.
#[cfg(target_os = "linux")]
#[allow(clippy::cast_precision_loss)]
pub fn read_process(pid: i32) -> Result<ProcessStats, ExporterError> {
    use procfs::process::{LimitValue, Process};

    let proc_error = |e: procfs::ProcError| ExporterError::Process {
        pid,
        reason: e.to_string(),
    };

    let process = Process::new(pid).map_err(proc_error)?;
    let stat = process.stat().map_err(proc_error)?;
    let ticks = procfs::ticks_per_second() as f64;
    let boot_time = procfs::boot_time_secs().map_err(proc_error)? as f64;

    let max_fds = match process.limits().map_err(proc_error)?.max_open_files.soft_limit {
        LimitValue::Value(limit) => Some(limit as f64),
        LimitValue::Unlimited => None,
    };

    Ok(ProcessStats {
        cpu_seconds: (stat.utime + stat.stime) as f64 / ticks,
        open_fds: process.fd_count().map_err(proc_error)? as f64,
        max_fds,
        virtual_memory: stat.vsize as f64,
        resident_memory: (stat.rss * procfs::page_size()) as f64,
        start_time: boot_time + stat.starttime as f64 / ticks,
    })
}

/// # Errors
/// Always fails: process metrics need `/proc`.
#[cfg(not(target_os = "linux"))]
pub fn read_process(pid: i32) -> Result<ProcessStats, ExporterError> {
    Err(ExporterError::Process {
        pid,
        reason: "process metrics require /proc".into(),
    })
}

fn sample_process(pid_file: &Path) -> Result<Vec<Sample>, ExporterError> {
    let pid = read_pid_file(pid_file)?;
    read_process(pid).map(|stats| stats.samples())
}

/// Exports CPU, memory and file-descriptor usage of the process named by a
/// PID file, prefixed with `gearman_process_`.
#[derive(Debug, Clone)]
pub struct ProcessCollector {
    pid_file: PathBuf,
}

impl ProcessCollector {
    #[must_use]
    pub fn new(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.into(),
        }
    }
}

#[async_trait]
impl Collector for ProcessCollector {
    fn describe(&self) -> Vec<MetricDescriptor> {
        [
            (
                CPU_SECONDS,
                "Total user and system CPU time spent in seconds.",
            ),
            (OPEN_FDS, "Number of open file descriptors."),
            (MAX_FDS, "Maximum number of open file descriptors."),
            (VIRTUAL_MEMORY, "Virtual memory size in bytes."),
            (RESIDENT_MEMORY, "Resident memory size in bytes."),
            (
                START_TIME,
                "Start time of the process since unix epoch in seconds.",
            ),
        ]
        .into_iter()
        .map(|(metric, help)| MetricDescriptor::new(metric_name(metric), help))
        .collect()
    }

    async fn collect(&self) -> Vec<Sample> {
        let pid_file = self.pid_file.clone();
        match tokio::task::spawn_blocking(move || sample_process(&pid_file)).await {
            Ok(Ok(samples)) => samples,
            Ok(Err(e)) => {
                log::warn!("{e}");
                Vec::new()
            }
            Err(e) => {
                log::error!("process metrics task failed: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pid_file_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn reads_pid_with_whitespace() {
        let file = pid_file_with("  4242 ");
        assert_eq!(read_pid_file(file.path()).unwrap(), 4242);
    }

    #[test]
    fn rejects_garbage_pid() {
        let file = pid_file_with("gearmand");
        assert!(matches!(
            read_pid_file(file.path()),
            Err(ExporterError::PidFile { .. })
        ));
    }

    #[test]
    fn missing_pid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_pid_file(&dir.path().join("gearmand.pid")).is_err());
    }

    #[test]
    fn unlimited_fds_are_not_reported() {
        let stats = ProcessStats {
            cpu_seconds: 1.5,
            open_fds: 12.0,
            max_fds: None,
            virtual_memory: 4096.0,
            resident_memory: 1024.0,
            start_time: 1_700_000_000.0,
        };
        let samples = stats.samples();
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.name != "gearman_process_max_fds"));
        assert_eq!(
            samples[0],
            Sample::new("gearman_process_cpu_seconds_total", 1.5)
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn samples_own_process() {
        let file = pid_file_with(&std::process::id().to_string());

        let collector = ProcessCollector::new(file.path());
        let samples = collector.collect().await;
        let value = |name: &str| {
            samples
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.value)
                .unwrap_or_else(|| panic!("{name} missing"))
        };

        assert!(value("gearman_process_cpu_seconds_total") >= 0.0);
        assert!(value("gearman_process_open_fds") >= 1.0);
        assert!(value("gearman_process_resident_memory_bytes") > 0.0);
        assert!(value("gearman_process_virtual_memory_bytes") > 0.0);
        assert!(value("gearman_process_start_time_seconds") > 1_000_000_000.0);
        assert!(samples.len() <= collector.describe().len());
    }

    #[tokio::test]
    async fn unreadable_pid_file_yields_no_samples() {
        let dir = tempfile::tempdir().unwrap();
        let collector = ProcessCollector::new(dir.path().join("missing.pid"));
        assert!(collector.collect().await.is_empty());
    }

    #[tokio::test]
    async fn vanished_process_yields_no_samples() {
        let file = pid_file_with(&i32::MAX.to_string());
        let collector = ProcessCollector::new(file.path());
        assert!(collector.collect().await.is_empty());
    }
}

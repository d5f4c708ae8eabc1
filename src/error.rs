use std::{path::PathBuf, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("unsupported scheme: {0:?}")]
    UnsupportedScheme(String),
    #[error("invalid scrape uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: &'static str },
    #[error("couldnt connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("timed out connecting to {target} after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },
    #[error("failed to write status command: {0}")]
    Write(#[source] std::io::Error),
    #[error("write error: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("failed to read status response: {0}")]
    Read(#[source] std::io::Error),
    #[error("status exchange exceeded its deadline")]
    Timeout,
    #[error("metric {0:?} is already registered")]
    DuplicateMetric(String),
    #[error("invalid metric or label name {0:?}")]
    InvalidMetricName(String),
    #[error("can't read pid file {path}: {reason}")]
    PidFile { path: PathBuf, reason: String },
    #[error("can't read process {pid}: {reason}")]
    Process { pid: i32, reason: String },
    #[error("invalid listen address {0:?}")]
    InvalidListenAddress(String),
    #[error("telemetry path must start with '/', got {0:?}")]
    InvalidTelemetryPath(String),
    #[error("IO error serving metrics {0}")]
    Io(#[from] std::io::Error),
}

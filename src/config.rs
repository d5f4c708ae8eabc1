//! Command-line configuration, resolved once at startup.

use crate::error::ExporterError;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Prometheus exporter for Gearman job server queue statistics.
#[derive(Parser, Debug, Clone)]
#[command(name = "gearman_exporter", version, about, long_about = None)]
pub struct Config {
    /// Address to listen on for web interface and telemetry.
    #[arg(
        long = "web.listen-address",
        env = "GEARMAN_EXPORTER_LISTEN_ADDRESS",
        default_value = ":9418",
        value_parser = parse_listen_address
    )]
    pub listen_address: SocketAddr,

    /// Path under which to expose metrics.
    #[arg(
        long = "web.telemetry-path",
        env = "GEARMAN_EXPORTER_TELEMETRY_PATH",
        default_value = "/metrics",
        value_parser = parse_telemetry_path
    )]
    pub telemetry_path: String,

    /// URI on which to scrape Gearman.
    #[arg(
        long = "gearman.scrape-uri",
        env = "GEARMAN_EXPORTER_SCRAPE_URI",
        default_value = "tcp://127.0.0.1:4730"
    )]
    pub scrape_uri: String,

    /// Timeout for trying to get stats from Gearman.
    #[arg(
        long = "gearman.timeout",
        env = "GEARMAN_EXPORTER_TIMEOUT",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    pub timeout: Duration,

    /// Path to Gearman pid file.
    ///
    /// If provided, resource usage of the Gearman process is exported,
    /// prefixed with "gearman_process_". The exporter needs read access to
    /// the process information of the Gearman server.
    #[arg(long = "gearman.pid-file", env = "GEARMAN_EXPORTER_PID_FILE")]
    pub pid_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set.
    #[arg(
        long = "log.level",
        env = "GEARMAN_EXPORTER_LOG_LEVEL",
        default_value = "info"
    )]
    pub log_level: String,
}

/// Parses `host:port`, accepting a bare `:port` as every interface.
///
/// # Errors
/// Returns [`ExporterError::InvalidListenAddress`] if `value` is not a socket
/// address.
pub fn parse_listen_address(value: &str) -> Result<SocketAddr, ExporterError> {
    let candidate = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };
    candidate
        .parse()
        .map_err(|_| ExporterError::InvalidListenAddress(value.to_string()))
}

/// # Errors
/// Returns [`ExporterError::InvalidTelemetryPath`] unless `value` starts with `/`.
pub fn parse_telemetry_path(value: &str) -> Result<String, ExporterError> {
    if value.starts_with('/') {
        Ok(value.to_string())
    } else {
        Err(ExporterError::InvalidTelemetryPath(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_flag_defaults() {
        let config = Config::try_parse_from(["gearman_exporter"]).unwrap();
        assert_eq!(config.listen_address, SocketAddr::from(([0, 0, 0, 0], 9418)));
        assert_eq!(config.telemetry_path, "/metrics");
        assert_eq!(config.scrape_uri, "tcp://127.0.0.1:4730");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.pid_file, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn parses_dotted_flags() {
        let config = Config::try_parse_from([
            "gearman_exporter",
            "--web.listen-address",
            "127.0.0.1:9000",
            "--web.telemetry-path",
            "/gearman",
            "--gearman.scrape-uri",
            "unix:///var/run/gearmand.sock",
            "--gearman.timeout",
            "250ms",
            "--gearman.pid-file",
            "/var/run/gearmand.pid",
        ])
        .unwrap();

        assert_eq!(config.listen_address, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.telemetry_path, "/gearman");
        assert_eq!(config.scrape_uri, "unix:///var/run/gearmand.sock");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.pid_file, Some(PathBuf::from("/var/run/gearmand.pid")));
    }

    #[test]
    fn bare_port_listens_everywhere() {
        assert_eq!(
            parse_listen_address(":9418").unwrap(),
            SocketAddr::from(([0, 0, 0, 0], 9418))
        );
        assert!(parse_listen_address("localhost").is_err());
    }

    #[test]
    fn telemetry_path_must_be_absolute() {
        assert!(parse_telemetry_path("metrics").is_err());
        assert!(
            Config::try_parse_from(["gearman_exporter", "--web.telemetry-path", "metrics"])
                .is_err()
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(
            Config::try_parse_from(["gearman_exporter", "--gearman.timeout", "soon"]).is_err()
        );
    }
}

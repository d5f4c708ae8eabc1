#![warn(clippy::pedantic, clippy::nursery, clippy::cargo, clippy::perf)]

//! # `gearman_exporter`
//!
//! Scrapes the admin `status` command of a Gearman job server and republishes
//! per-function queue statistics in the Prometheus text format.
//!
//! Every scrape of the metrics endpoint triggers exactly one round-trip to the
//! Gearman server. Scrapes are serialized by the [`GearmanCollector`], so each
//! response holds the numbers of one complete `status` reply:
//!
//! - `gearman_up`
//! - `gearman_function_jobs{function}`
//! - `gearman_function_jobs_running{function}`
//! - `gearman_function_jobs_waiting{function}`
//! - `gearman_function_workers{function}`
//!
//! A failed scrape is reported as `gearman_up 0` with no function series.
//!
//! ```no_run
//! use gearman_exporter::{GearmanCollector, Registry};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn run() -> Result<(), gearman_exporter::ExporterError> {
//! let collector = GearmanCollector::new("tcp://127.0.0.1:4730", Duration::from_secs(5))?;
//! let mut registry = Registry::new();
//! registry.register(Arc::new(collector))?;
//! println!("{}", registry.render().await);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
mod error;
pub mod metric;
pub mod registry;
pub mod server;
pub mod stats;

pub use collector::{BuildInfoCollector, Collector, GearmanCollector, ProcessCollector};
pub use config::Config;
pub use error::ExporterError;
pub use registry::Registry;

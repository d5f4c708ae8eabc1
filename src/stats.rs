//! Parsing of the Gearman admin `status` response.
//!
//! Each record line is `name\tTOTAL\tRUNNING\tWORKERS` and the response ends
//! with a line holding a single `.`. Parsing is best-effort: a numeric field
//! that does not parse, or is missing, reads as `0`.

/// Protocol line that ends a status response.
pub const TERMINATOR: &str = ".";

/// Queue statistics for one registered function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionStat {
    pub name: String,
    pub total: f64,
    pub running: f64,
    pub workers: f64,
}

impl FunctionStat {
    /// Parses one record line. Fields past the fourth stay attached to
    /// `workers`, which then fails to parse and reads as `0`.
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        let mut parts = line.splitn(4, '\t');
        let name = parts.next().unwrap_or_default().to_string();
        let mut number = || parts.next().map_or(0.0, parse_field);

        let total = number();
        let running = number();
        let workers = number();

        Self {
            name,
            total,
            running,
            workers,
        }
    }

    /// Jobs queued but not yet picked up by a worker.
    ///
    /// Not clamped: a server reporting more running than total jobs yields a
    /// negative value.
    #[must_use]
    pub fn waiting(&self) -> f64 {
        self.total - self.running
    }
}

fn parse_field(field: &str) -> f64 {
    field.parse().unwrap_or(0.0)
}

/// Parses a complete status response body.
///
/// Stops at the first terminator line; anything after it is ignored. Blank
/// lines carry no function name and are skipped.
#[must_use]
pub fn parse_status(body: &str) -> Vec<FunctionStat> {
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .take_while(|line| *line != TERMINATOR)
        // a blank line would publish a series with an empty function label
        .filter(|line| !line.is_empty())
        .map(FunctionStat::from_line)
        .collect()
}

use crate::{error::ExporterError, stats::TERMINATOR};
use async_trait::async_trait;
use interprocess::local_socket::{
    GenericFilePath, ToFsName,
    tokio::{Stream as LocalStream, prelude::*},
};
use std::{fmt, path::PathBuf, pin::Pin, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::{Instant, timeout, timeout_at},
};

/// Admin command asking the server for per-function queue statistics.
pub const STATUS_COMMAND: &[u8] = b"status\n";

/// Timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How to reach the Gearman server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// `host:port`, resolved on every connect.
    Tcp(String),
    /// Filesystem path of a local stream socket.
    Local(PathBuf),
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{addr}"),
            Self::Local(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Where and how long to scrape. Resolved once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    transport: Transport,
    timeout: Duration,
}

impl ScrapeTarget {
    /// Parses a scrape URI of the form `tcp://host:port` or `unix:///path`.
    ///
    /// # Errors
    /// Returns [`ExporterError::UnsupportedScheme`] for any other scheme and
    /// [`ExporterError::InvalidUri`] when the host or path is missing.
    pub fn parse(uri: &str, timeout: Duration) -> Result<Self, ExporterError> {
        let Some((scheme, rest)) = uri.split_once("://") else {
            let scheme = uri.split_once(':').map_or("", |(scheme, _)| scheme);
            return Err(ExporterError::UnsupportedScheme(scheme.to_string()));
        };

        let invalid = |reason| ExporterError::InvalidUri {
            uri: uri.to_string(),
            reason,
        };

        let transport = match scheme {
            "tcp" => {
                let host = rest.split('/').next().unwrap_or_default();
                if host.is_empty() {
                    return Err(invalid("missing host"));
                }
                Transport::Tcp(host.to_string())
            }
            "unix" => {
                let path = rest.find('/').map(|idx| &rest[idx..]).unwrap_or_default();
                if path.len() <= 1 {
                    return Err(invalid("missing socket path"));
                }
                Transport::Local(PathBuf::from(path))
            }
            other => return Err(ExporterError::UnsupportedScheme(other.to_string())),
        };

        Ok(Self { transport, timeout })
    }

    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// An open status exchange, readable until its deadline.
///
/// Dropping it closes the underlying connection.
pub struct StatusStream {
    reader: BufReader<BoxedReader>,
    deadline: Instant,
}

impl StatusStream {
    pub fn new(reader: impl AsyncRead + Send + 'static, deadline: Instant) -> Self {
        let reader: BoxedReader = Box::pin(reader);
        Self {
            reader: BufReader::new(reader),
            deadline,
        }
    }

    /// Reads the response into memory, stopping after the terminator line or
    /// at EOF.
    ///
    /// # Errors
    /// Returns [`ExporterError::Read`] if the connection fails and
    /// [`ExporterError::Timeout`] if the deadline passes first.
    pub async fn read_response(&mut self) -> Result<Vec<u8>, ExporterError> {
        let deadline = self.deadline;
        timeout_at(deadline, self.read_until_terminator())
            .await
            .map_err(|_| ExporterError::Timeout)?
    }

    async fn read_until_terminator(&mut self) -> Result<Vec<u8>, ExporterError> {
        let mut body: Vec<u8> = Vec::new();
        let mut line: Vec<u8> = Vec::new();

        loop {
            line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(ExporterError::Read)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&line);
            if is_terminator(&line) {
                break;
            }
        }
        Ok(body)
    }
}

fn is_terminator(line: &[u8]) -> bool {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    line == TERMINATOR.as_bytes()
}

impl fmt::Debug for StatusStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusStream")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Anything that can open a status exchange with a Gearman server.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self) -> Result<StatusStream, ExporterError>;
}

/// Opens one fresh connection per fetch and sends the `status` command.
#[derive(Debug, Clone)]
pub struct StatusFetcher {
    target: ScrapeTarget,
}

impl StatusFetcher {
    #[must_use]
    pub const fn new(target: ScrapeTarget) -> Self {
        Self { target }
    }

    #[must_use]
    pub const fn target(&self) -> &ScrapeTarget {
        &self.target
    }

    async fn connect<S, F>(&self, connect: F) -> Result<S, ExporterError>
    where
        F: Future<Output = std::io::Result<S>>,
    {
        let target = self.target.transport.to_string();
        match timeout(self.target.timeout, connect).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(source)) => Err(ExporterError::Connect { target, source }),
            Err(_) => Err(ExporterError::ConnectTimeout {
                target,
                timeout: self.target.timeout,
            }),
        }
    }

    async fn request<S>(&self, conn: S) -> Result<StatusStream, ExporterError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let deadline = Instant::now() + self.target.timeout;
        let mut conn = Box::pin(conn);

        timeout_at(deadline, send_status(&mut conn))
            .await
            .map_err(|_| ExporterError::Timeout)??;

        Ok(StatusStream::new(conn, deadline))
    }
}

async fn send_status<W: AsyncWrite + Unpin>(conn: &mut W) -> Result<(), ExporterError> {
    let written = conn
        .write(STATUS_COMMAND)
        .await
        .map_err(ExporterError::Write)?;
    if written != STATUS_COMMAND.len() {
        return Err(ExporterError::ShortWrite {
            written,
            expected: STATUS_COMMAND.len(),
        });
    }
    conn.flush().await.map_err(ExporterError::Write)
}

#[async_trait]
impl StatusSource for StatusFetcher {
    async fn fetch(&self) -> Result<StatusStream, ExporterError> {
        match &self.target.transport {
            Transport::Tcp(addr) => {
                let conn = self.connect(TcpStream::connect(addr.as_str())).await?;
                self.request(conn).await
            }
            Transport::Local(path) => {
                let name = path
                    .as_path()
                    .to_fs_name::<GenericFilePath>()
                    .map_err(|source| ExporterError::Connect {
                        target: self.target.transport.to_string(),
                        source,
                    })?;
                let conn = self.connect(LocalStream::connect(name)).await?;
                self.request(conn).await
            }
        }
    }
}

//! Per-record sink for the filtered stream.
//!
//! The listener is `Open` until the platform signals a rate limit (HTTP 420)
//! or the output location becomes unusable. Each record is appended verbatim
//! with the file opened and closed around the single write, so no handle
//! outlives a call.
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// "Enhance Your Calm": the stream's rate-limit status.
pub const RATE_LIMIT_STATUS: u16 = 420;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    RateLimited,
    WriteFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Open,
    Closed(CloseReason),
}

#[derive(Debug, Error)]
#[error("failed to append record to {path}: {source}")]
pub struct StreamWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl StreamWriteError {
    /// The output location itself is unusable, so later writes would fail too.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self.source.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
        )
    }
}

#[derive(Debug)]
pub struct StreamListener {
    output: PathBuf,
    echo: bool,
    state: ListenerState,
    written: u64,
    failures: u64,
}

impl StreamListener {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            echo: false,
            state: ListenerState::Open,
            written: 0,
            failures: 0,
        }
    }

    /// Also print every record to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn records_written(&self) -> u64 {
        self.written
    }

    pub fn write_failures(&self) -> u64 {
        self.failures
    }

    /// Append one record byte for byte. Returns `false` once the listener is closed.
    pub async fn on_record(&mut self, raw: &[u8]) -> bool {
        if self.state != ListenerState::Open {
            return false;
        }

        if self.echo {
            println!("{}", String::from_utf8_lossy(raw).trim_end());
        }

        match self.append(raw).await {
            Ok(()) => {
                self.written += 1;
                tracing::debug!(
                    target: "murmur.stream",
                    bytes = raw.len(),
                    written = self.written,
                    "stream.record"
                );
            }
            Err(err) => {
                self.failures += 1;
                if err.is_unrecoverable() {
                    tracing::warn!(target: "murmur.stream", error = %err, "stream.write_failed.closing");
                    self.state = ListenerState::Closed(CloseReason::WriteFailed);
                    return false;
                }
                tracing::warn!(target: "murmur.stream", error = %err, "stream.write_failed");
            }
        }
        true
    }

    /// React to a status code from the platform. Only the rate-limit status
    /// closes the stream; everything else is logged.
    pub fn on_error(&mut self, status: u16) -> bool {
        if status == RATE_LIMIT_STATUS {
            tracing::warn!(target: "murmur.stream", status, "stream.rate_limited.closing");
            self.state = ListenerState::Closed(CloseReason::RateLimited);
            return false;
        }
        tracing::warn!(target: "murmur.stream", status, "stream.error_status");
        true
    }

    async fn append(&self, raw: &[u8]) -> Result<(), StreamWriteError> {
        let wrap = |source| StreamWriteError {
            path: self.output.clone(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output)
            .await
            .map_err(wrap)?;
        file.write_all(raw).await.map_err(wrap)?;
        // tokio defers the write to a blocking task; flush before the handle drops.
        file.flush().await.map_err(wrap)?;
        Ok(())
    }
}

//! Filtered live stream: one authenticated long-lived connection, records
//! handed to a [`StreamListener`] in arrival order.
//!
//! A producer task reads the response body, cuts it into records and pushes
//! them onto a bounded channel; the calling task drains the channel into the
//! listener. When the listener closes, the producer is aborted and the
//! connection dropped. There is no reconnection.
use crate::twitter::auth::AuthContext;
use crate::twitter::listener::{CloseReason, ListenerState, StreamListener};
use futures::StreamExt;
use murmur_config::{ApiConfig, StreamConfig};
use murmur_http::{ByteStream, HttpClient, HttpError, Method, RequestOpts};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

const FILTER_PATH: &str = "1.1/statuses/filter.json";

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("at least one track term is required")]
    EmptyTrack,
    #[error("could not open stream: {0}")]
    Connect(#[source] HttpError),
    #[error("stream reader task failed: {0}")]
    Reader(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The listener asked to stop.
    Closed(CloseReason),
    /// The platform refused the connection with a non-closing status.
    Rejected { status: u16 },
    /// The platform ended the response.
    Ended,
    /// The connection broke mid-stream.
    Disconnected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub outcome: StreamOutcome,
    pub records_written: u64,
    pub write_failures: u64,
}

pub struct Streamer {
    http: HttpClient,
    auth: AuthContext,
    channel_capacity: usize,
    echo: bool,
}

impl Streamer {
    pub fn new(auth: AuthContext, api: &ApiConfig) -> Result<Self, StreamError> {
        let http = HttpClient::new(&api.stream_base).map_err(StreamError::Connect)?;
        Ok(Self {
            http,
            auth,
            channel_capacity: 256,
            echo: false,
        })
    }

    pub fn configure(mut self, stream: &StreamConfig) -> Self {
        self.channel_capacity = stream.channel_capacity.max(1);
        self.echo = stream.echo;
        self
    }

    /// Stream posts matching `track` into `output_file` until the listener
    /// closes or the connection ends. Blocks the calling task throughout.
    pub async fn stream_filtered_by(
        &self,
        output_file: impl Into<PathBuf>,
        track: &[String],
    ) -> Result<StreamSummary, StreamError> {
        let mut listener = StreamListener::new(output_file).with_echo(self.echo);
        self.stream_with_listener(&mut listener, track).await
    }

    pub async fn stream_with_listener(
        &self,
        listener: &mut StreamListener,
        track: &[String],
    ) -> Result<StreamSummary, StreamError> {
        let terms: Vec<&str> = track
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(StreamError::EmptyTrack);
        }

        tracing::info!(
            target: "murmur.stream",
            track = ?terms,
            output = %listener.output().display(),
            "stream.connecting"
        );

        let opened = self
            .http
            .open_stream(
                Method::POST,
                FILTER_PATH,
                RequestOpts {
                    auth: Some(self.auth.request_auth()),
                    form: Some(vec![("track", terms.join(",").into())]),
                    ..Default::default()
                },
            )
            .await;

        let body = match opened {
            Ok(body) => body,
            Err(err) => {
                let Some(status) = err.status() else {
                    return Err(StreamError::Connect(err));
                };
                let outcome = if listener.on_error(status.as_u16()) {
                    StreamOutcome::Rejected {
                        status: status.as_u16(),
                    }
                } else {
                    StreamOutcome::Closed(CloseReason::RateLimited)
                };
                return Ok(summarize(outcome, listener));
            }
        };

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(self.channel_capacity);
        let producer = tokio::spawn(pump(body, tx));

        let mut closed_by_listener = false;
        while let Some(record) = rx.recv().await {
            if !listener.on_record(&record).await {
                closed_by_listener = true;
                break;
            }
        }
        drop(rx);

        let outcome = if closed_by_listener {
            producer.abort();
            let _ = producer.await;
            match listener.state() {
                ListenerState::Closed(reason) => StreamOutcome::Closed(reason),
                ListenerState::Open => StreamOutcome::Ended,
            }
        } else {
            match producer.await {
                Ok(Ok(())) => StreamOutcome::Ended,
                Ok(Err(err)) => {
                    tracing::warn!(target: "murmur.stream", error = %err, "stream.disconnected");
                    StreamOutcome::Disconnected(err.to_string())
                }
                Err(join) => return Err(StreamError::Reader(join.to_string())),
            }
        };

        tracing::info!(
            target: "murmur.stream",
            outcome = ?outcome,
            written = listener.records_written(),
            failures = listener.write_failures(),
            "stream.finished"
        );
        Ok(summarize(outcome, listener))
    }
}

fn summarize(outcome: StreamOutcome, listener: &StreamListener) -> StreamSummary {
    StreamSummary {
        outcome,
        records_written: listener.records_written(),
        write_failures: listener.write_failures(),
    }
}

/// Move records from the response body onto the channel until either side ends.
async fn pump(mut body: ByteStream, tx: mpsc::Sender<Vec<u8>>) -> Result<(), HttpError> {
    let mut splitter = RecordSplitter::default();
    while let Some(chunk) = body.next().await {
        for record in splitter.push(&chunk?) {
            if tx.send(record).await.is_err() {
                return Ok(());
            }
        }
    }
    if let Some(tail) = splitter.finish() {
        let _ = tx.send(tail).await;
    }
    Ok(())
}

/// Cuts a chunked body into newline-terminated records.
///
/// Records are byte-exact and keep their own terminator; keep-alive blank
/// lines are dropped. `scanned` marks how much of `buf` holds no newline.
#[derive(Debug, Default)]
pub(crate) struct RecordSplitter {
    buf: Vec<u8>,
    scanned: usize,
}

impl RecordSplitter {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset + 1;
            let line = &self.buf[start..end];
            if !line.iter().all(u8::is_ascii_whitespace) {
                records.push(line.to_vec());
            }
            start = end;
            self.scanned = end;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();
        records
    }

    pub(crate) fn finish(self) -> Option<Vec<u8>> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(self.buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(records: Vec<Vec<u8>>) -> Vec<String> {
        records
            .into_iter()
            .map(|r| String::from_utf8(r).unwrap())
            .collect()
    }

    #[test]
    fn splits_across_chunk_boundaries() {
        let mut s = RecordSplitter::default();
        assert!(s.push(b"{\"id\":1").is_empty());
        assert_eq!(text(s.push(b"}\r\n{\"id\":2}\r\n{\"id\"")), vec![
            "{\"id\":1}\r\n".to_string(),
            "{\"id\":2}\r\n".to_string(),
        ]);
        assert_eq!(text(s.push(b":3}\r\n")), vec!["{\"id\":3}\r\n".to_string()]);
        assert_eq!(s.finish(), None);
    }

    #[test]
    fn drops_keep_alive_lines() {
        let mut s = RecordSplitter::default();
        assert_eq!(text(s.push(b"\r\n\r\n{\"id\":1}\r\n\r\n")), vec![
            "{\"id\":1}\r\n".to_string()
        ]);
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let mut s = RecordSplitter::default();
        let raw = "{\"text\":\"caf\u{e9} \u{1f980}\"}\n".as_bytes();
        let (a, b) = raw.split_at(12);
        assert!(s.push(a).is_empty());
        assert_eq!(s.push(b), vec![raw.to_vec()]);
    }

    #[test]
    fn invalid_utf8_passes_through_unchanged() {
        let mut s = RecordSplitter::default();
        let raw = b"{\"t\":\"\xff\xfe\"}\n";
        assert_eq!(s.push(raw), vec![raw.to_vec()]);
    }

    #[test]
    fn long_record_in_tiny_chunks() {
        let mut s = RecordSplitter::default();
        let mut raw = vec![b'x'; 10_000];
        raw.push(b'\n');
        let mut out = Vec::new();
        for chunk in raw.chunks(3) {
            out.extend(s.push(chunk));
            assert!(s.scanned <= s.buf.len());
        }
        assert_eq!(out, vec![raw]);
        assert!(s.buf.is_empty());
        assert_eq!(s.scanned, 0);
    }

    #[test]
    fn unterminated_tail_is_flushed() {
        let mut s = RecordSplitter::default();
        assert!(s.push(b"{\"id\":9}").is_empty());
        assert_eq!(s.finish(), Some(b"{\"id\":9}".to_vec()));
    }
}

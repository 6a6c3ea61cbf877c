//! Log stream client: a long-lived SSE connection delivering backend log
//! lines into a bounded ring buffer, with transparent reconnect.
//!
//! The connection lifecycle is an explicit state machine:
//!
//! ```text
//!   Connecting ──ok──▶ Connected ──error/EOF──▶ Disconnected
//!       ▲                                            │
//!       └────────── fixed reconnect delay ◀──────────┘
//! ```
//!
//! Retry is unbounded: the log stream is operational telemetry, not critical
//! path, so it just keeps trying at a fixed cadence. Exactly one
//! transport exists at a time: the failed stream is dropped before the delay,
//! and the next connect only starts after it. On reconnect the client passes
//! the id of the last line it saw, so the server resumes instead of replaying
//! its history window and no duplicates enter the buffer.

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::types::LogLine;
use crate::api::SentinelClient;

use super::sse::SseDecoder;

/// Connection state as observed by consumers (drives the health indicator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
}

/// Raw byte stream from one established log-stream connection.
pub type LogBytes = BoxStream<'static, Result<Vec<u8>>>;

/// Transport seam: how a log-stream connection is established. The HTTP
/// implementation talks SSE to the backend; tests substitute scripted ones.
#[async_trait]
pub trait LogTransport: Send + Sync + 'static {
    async fn connect(&self, last_id: Option<i64>) -> Result<LogBytes>;
}

/// SSE over the Sentinel REST API.
pub struct HttpLogTransport {
    client: SentinelClient,
}

impl HttpLogTransport {
    pub fn new(client: SentinelClient) -> Self {
        HttpLogTransport { client }
    }
}

#[async_trait]
impl LogTransport for HttpLogTransport {
    async fn connect(&self, last_id: Option<i64>) -> Result<LogBytes> {
        let resp = self.client.open_log_stream(last_id).await?;
        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(anyhow::Error::from))
            .boxed())
    }
}

/// Handle to the background streaming task and its shared buffer.
pub struct LogStream {
    lines: Arc<RwLock<VecDeque<LogLine>>>,
    state: Arc<RwLock<ConnState>>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LogStream {
    pub fn spawn<T: LogTransport>(transport: T, cap: usize, reconnect_delay: Duration) -> Self {
        let lines: Arc<RwLock<VecDeque<LogLine>>> = Arc::new(RwLock::new(VecDeque::new()));
        let state = Arc::new(RwLock::new(ConnState::Disconnected));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(stream_loop(
            transport,
            cap,
            reconnect_delay,
            Arc::clone(&lines),
            Arc::clone(&state),
            shutdown_rx,
        ));

        LogStream {
            lines,
            state,
            shutdown_tx,
            handle,
        }
    }

    /// Snapshot of the buffered lines, oldest first.
    pub async fn lines(&self) -> Vec<LogLine> {
        self.lines.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.lines.read().await.len()
    }

    pub async fn state(&self) -> ConnState {
        *self.state.read().await
    }

    /// Close the transport, cancel any pending reconnect timer, and wait for
    /// the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

async fn stream_loop<T: LogTransport>(
    transport: T,
    cap: usize,
    reconnect_delay: Duration,
    lines: Arc<RwLock<VecDeque<LogLine>>>,
    state: Arc<RwLock<ConnState>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // Replay cursor: highest log row id seen so far
    let mut last_id: Option<i64> = None;

    loop {
        *state.write().await = ConnState::Connecting;
        let connected = tokio::select! {
            result = transport.connect(last_id) => result,
            _ = shutdown_rx.changed() => return,
        };

        match connected {
            Ok(mut stream) => {
                *state.write().await = ConnState::Connected;
                info!("Log stream connected (resuming after id {:?})", last_id);
                let mut decoder = SseDecoder::new();

                loop {
                    tokio::select! {
                        chunk = stream.next() => match chunk {
                            Some(Ok(bytes)) => {
                                for payload in decoder.feed(&bytes) {
                                    if let Some(line) = parse_log_line(&payload) {
                                        if let Some(id) = line.id {
                                            last_id = Some(last_id.map_or(id, |prev| prev.max(id)));
                                        }
                                        push_line(&lines, line, cap).await;
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                warn!("Log stream error: {}", e);
                                break;
                            }
                            None => {
                                warn!("Log stream ended by server");
                                break;
                            }
                        },
                        _ = shutdown_rx.changed() => {
                            // Dropping the stream closes the transport
                            info!("Log stream stopped");
                            return;
                        }
                    }
                }
                // stream dropped here, so the old transport is closed before
                // any new connection attempt
            }
            Err(e) => {
                warn!("Log stream connect failed: {}", e);
            }
        }

        *state.write().await = ConnState::Disconnected;
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = shutdown_rx.changed() => return,
        }
    }
}

/// Parse one SSE payload into a log line. Malformed JSON and payloads the
/// server marked as errors are dropped without touching the buffer.
fn parse_log_line(payload: &str) -> Option<LogLine> {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => {
            debug!("Dropping malformed log payload");
            return None;
        }
    };
    if value.get("error").is_some() {
        debug!("Dropping error-marked log payload");
        return None;
    }
    serde_json::from_value(value).ok()
}

async fn push_line(lines: &Arc<RwLock<VecDeque<LogLine>>>, line: LogLine, cap: usize) {
    let mut buf = lines.write().await;
    buf.push_back(line);
    while buf.len() > cap {
        buf.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// One scripted connection: a sequence of chunks, then either a clean
    /// end-of-stream or an idle hang.
    struct Script {
        chunks: Vec<Result<Vec<u8>>>,
        hang_after: bool,
    }

    /// Transport that replays scripts in order and records every connect.
    /// Once scripts run out, connect() hangs (no further connections).
    struct ScriptedTransport {
        scripts: Mutex<VecDeque<Script>>,
        connects: AtomicUsize,
        seen_last_ids: Mutex<Vec<Option<i64>>>,
        connect_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> Self {
            ScriptedTransport {
                scripts: Mutex::new(scripts.into()),
                connects: AtomicUsize::new(0),
                seen_last_ids: Mutex::new(Vec::new()),
                connect_times: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LogTransport for Arc<ScriptedTransport> {
        async fn connect(&self, last_id: Option<i64>) -> Result<LogBytes> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.seen_last_ids.lock().unwrap().push(last_id);
            self.connect_times.lock().unwrap().push(Instant::now());

            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(script) => {
                    let base = futures_util::stream::iter(script.chunks);
                    if script.hang_after {
                        Ok(base.chain(futures_util::stream::pending()).boxed())
                    } else {
                        Ok(base.boxed())
                    }
                }
                None => {
                    futures_util::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn event(id: i64, message: &str) -> Vec<u8> {
        format!(
            "data: {{\"id\": {}, \"timestamp\": \"2025-03-01 10:00:00\", \"level\": \"INFO\", \"component\": \"scanner\", \"message\": \"{}\"}}\n\n",
            id, message
        )
        .into_bytes()
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffer_cap_evicts_oldest() {
        let cap = 500;
        let mut chunk = Vec::new();
        for id in 1..=600 {
            chunk.extend_from_slice(&event(id, "m"));
        }
        let transport = Arc::new(ScriptedTransport::new(vec![Script {
            chunks: vec![Ok(chunk)],
            hang_after: true,
        }]));

        let stream = LogStream::spawn(Arc::clone(&transport), cap, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let lines = stream.lines().await;
        assert_eq!(lines.len(), cap);
        // Oldest 100 evicted; arrival order preserved
        assert_eq!(lines[0].id, Some(101));
        assert_eq!(lines[cap - 1].id, Some(600));
        stream.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_and_error_payloads_dropped() {
        let mut chunk = Vec::new();
        chunk.extend_from_slice(&event(1, "good"));
        chunk.extend_from_slice(b"data: this is not json\n\n");
        chunk.extend_from_slice(b"data: {\"error\": \"db locked\"}\n\n");
        chunk.extend_from_slice(&event(2, "also good"));

        let transport = Arc::new(ScriptedTransport::new(vec![Script {
            chunks: vec![Ok(chunk)],
            hang_after: true,
        }]));
        let stream = LogStream::spawn(Arc::clone(&transport), 500, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let lines = stream.lines().await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "good");
        assert_eq!(lines[1].message, "also good");
        stream.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_stream_end_with_replay_cursor() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            // First connection delivers one line, then the server closes
            Script {
                chunks: vec![Ok(event(7, "before drop"))],
                hang_after: false,
            },
            // Second connection stays up
            Script {
                chunks: vec![Ok(event(8, "after reconnect"))],
                hang_after: true,
            },
        ]));

        let stream = LogStream::spawn(Arc::clone(&transport), 500, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Exactly one reconnect happened, resuming after the last seen id
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(
            *transport.seen_last_ids.lock().unwrap(),
            vec![None, Some(7)]
        );
        assert_eq!(stream.state().await, ConnState::Connected);
        assert_eq!(stream.len().await, 2);

        // And the delay between attempts honored the configured 5s
        let times = transport.connect_times.lock().unwrap();
        assert!(times[1] - times[0] >= Duration::from_secs(5));
        drop(times);

        // No further attempts while the second connection is healthy
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        stream.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_error_marks_disconnected_then_retries() {
        let transport = Arc::new(ScriptedTransport::new(vec![Script {
            chunks: vec![Ok(event(1, "m")), Err(anyhow::anyhow!("connection reset"))],
            hang_after: false,
        }]));

        let stream = LogStream::spawn(Arc::clone(&transport), 500, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Error seen, reconnect still pending: disconnected
        assert_eq!(stream.state().await, ConnState::Disconnected);

        tokio::time::sleep(Duration::from_secs(10)).await;
        // Scripts exhausted: the retry connect hangs in Connecting
        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        assert_eq!(stream.state().await, ConnState::Connecting);
        stream.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_connected_and_while_waiting() {
        // Shutdown with an open transport
        let transport = Arc::new(ScriptedTransport::new(vec![Script {
            chunks: vec![],
            hang_after: true,
        }]));
        let stream = LogStream::spawn(Arc::clone(&transport), 500, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stream.state().await, ConnState::Connected);
        stream.shutdown().await; // resolving proves the task is gone

        // Shutdown while the reconnect timer is pending
        let transport = Arc::new(ScriptedTransport::new(vec![Script {
            chunks: vec![],
            hang_after: false,
        }]));
        let stream = LogStream::spawn(Arc::clone(&transport), 500, Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stream.state().await, ConnState::Disconnected);
        stream.shutdown().await;
    }
}

//! QTM RT protocol client
//!
//! Thin client for the Qualisys Track Manager real-time interface: version
//! handshake, master control, measurement commands, session events and the
//! analog sample stream, multiplexed over one TCP connection. A background
//! reader task routes replies, events and data frames to their consumers.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use contracts::{
    ContractError, MarkerSink, SampleBatchCallback, SampleSource, SessionEvent,
};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::client::CaptureClient;
use crate::error::{CaptureClientError, Result};
use crate::wire::{self, PacketType};

/// Bounded wait applied to every command round-trip
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Recent events kept for late `await_event` callers
const RECENT_EVENTS: usize = 16;

/// A command/XML/error reply routed off the wire
#[derive(Debug)]
struct Reply {
    kind: PacketType,
    text: String,
}

/// Shared state between the sample stream handle and the reader task
struct StreamShared {
    callback: StdMutex<Option<SampleBatchCallback>>,
    listening: AtomicBool,
}

struct Conn {
    writer: Mutex<OwnedWriteHalf>,
    replies: Mutex<mpsc::Receiver<Reply>>,
    events: broadcast::Sender<SessionEvent>,
    recent: Arc<StdMutex<VecDeque<SessionEvent>>>,
    stream: Arc<StreamShared>,
    reader: JoinHandle<()>,
}

impl Drop for Conn {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// QTM RT client
pub struct QtmClient {
    rt_version: String,
    conn: StdMutex<Option<Arc<Conn>>>,
}

impl QtmClient {
    /// Create a disconnected client negotiating the given RT version
    pub fn new(rt_version: impl Into<String>) -> Self {
        Self {
            rt_version: rt_version.into(),
            conn: StdMutex::new(None),
        }
    }

    fn conn(&self) -> Result<Arc<Conn>> {
        self.conn
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| CaptureClientError::connection("not connected"))
    }

    /// One request/reply round trip
    ///
    /// The reply receiver stays locked across the whole round trip so
    /// concurrent callers (a gait marker racing a Stop) cannot claim each
    /// other's replies; reply order on the wire is request order.
    async fn round_trip(&self, kind: PacketType, text: &str) -> Result<Reply> {
        let conn = self.conn()?;
        let mut replies = conn.replies.lock().await;
        {
            let packet = wire::encode_str(kind, text);
            let mut writer = conn.writer.lock().await;
            writer.write_all(&packet).await?;
        }
        recv_reply(&mut replies).await
    }

    /// One command round-trip; error replies surface as `CommandFailed`
    async fn command(&self, command: &str) -> Result<String> {
        let reply = self.round_trip(PacketType::Command, command).await?;
        let verb = command.split_whitespace().next().unwrap_or(command);
        match reply.kind {
            PacketType::Error => Err(CaptureClientError::command(verb, reply.text)),
            _ => Ok(reply.text),
        }
    }

    /// Push a settings document and await its acknowledgement
    async fn send_settings(&self, xml: &str) -> Result<String> {
        let reply = self.round_trip(PacketType::Xml, xml).await?;
        match reply.kind {
            PacketType::Error => Err(CaptureClientError::command("SendParameters", reply.text)),
            _ => Ok(reply.text),
        }
    }
}

impl CaptureClient for QtmClient {
    #[instrument(name = "qtm_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| CaptureClientError::connection(format!("{host}:{port}: {e}")))?;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let (reply_tx, reply_rx) = mpsc::channel(16);
        let (event_tx, _) = broadcast::channel(32);
        let recent = Arc::new(StdMutex::new(VecDeque::with_capacity(RECENT_EVENTS)));
        let shared = Arc::new(StreamShared {
            callback: StdMutex::new(None),
            listening: AtomicBool::new(false),
        });

        let reader = tokio::spawn(reader_loop(
            read_half,
            reply_tx,
            event_tx.clone(),
            Arc::clone(&recent),
            Arc::clone(&shared),
        ));

        *self.conn.lock().unwrap() = Some(Arc::new(Conn {
            writer: Mutex::new(write_half),
            replies: Mutex::new(reply_rx),
            events: event_tx,
            recent,
            stream: shared,
            reader,
        }));

        let welcome = {
            let conn = self.conn()?;
            let mut replies = conn.replies.lock().await;
            recv_reply(&mut replies).await?
        };
        if !welcome.text.contains("connected") {
            return Err(CaptureClientError::protocol(format!(
                "unexpected greeting: {}",
                welcome.text
            )));
        }

        let version_reply = self.command(&format!("Version {}", self.rt_version)).await?;
        if !version_reply.starts_with("Version set") {
            return Err(CaptureClientError::protocol(format!(
                "version negotiation failed: {version_reply}"
            )));
        }

        debug!(version = %self.rt_version, "connected to QTM");
        Ok(())
    }

    #[instrument(name = "qtm_take_control", skip(self, password))]
    async fn take_control(&self, password: &str) -> Result<()> {
        let command = if password.is_empty() {
            "TakeControl".to_string()
        } else {
            format!("TakeControl {password}")
        };
        self.command(&command)
            .await
            .map_err(|e| match e {
                CaptureClientError::CommandFailed { message, .. } => {
                    CaptureClientError::ControlDenied { message }
                }
                other => other,
            })
            .map(|_| ())
    }

    #[instrument(name = "qtm_close_measurement", skip(self))]
    async fn close_measurement(&self) -> Result<()> {
        self.command("Close").await.map(|_| ())
    }

    #[instrument(name = "qtm_configure", skip(self), fields(duration_sec = duration.as_secs_f64()))]
    async fn configure(&self, duration: Duration) -> Result<()> {
        // "New" is rejected when a measurement is already open; that is fine,
        // the settings push below still applies to the open one.
        if let Err(e) = self.command("New").await {
            match e {
                CaptureClientError::CommandFailed { ref message, .. } => {
                    debug!(reason = %message, "New rejected, reusing open measurement");
                }
                other => return Err(other),
            }
        }

        let xml = format!(
            "<QTM_Settings><General><Capture_Time>{:.3}</Capture_Time></General></QTM_Settings>",
            duration.as_secs_f64()
        );
        self.send_settings(&xml).await.map(|_| ())
    }

    #[instrument(name = "qtm_start", skip(self))]
    async fn start(&self) -> Result<()> {
        self.command("Start")
            .await
            .map_err(|e| match e {
                CaptureClientError::CommandFailed { message, .. } => {
                    CaptureClientError::StartRejected { message }
                }
                other => other,
            })
            .map(|_| ())
    }

    #[instrument(name = "qtm_await_event", skip(self), fields(event = %event))]
    async fn await_event(&self, event: SessionEvent, timeout: Duration) -> Result<()> {
        let conn = self.conn()?;
        let mut rx = conn.events.subscribe();

        // Consume a matching event that already arrived
        {
            let mut recent = conn.recent.lock().unwrap();
            if let Some(pos) = recent.iter().position(|e| *e == event) {
                recent.remove(pos);
                return Ok(());
            }
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(received)) if received == event => return Ok(()),
                Ok(Ok(_)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(CaptureClientError::protocol("connection closed"));
                }
                Err(_) => {
                    return Err(CaptureClientError::EventTimeout {
                        event,
                        waited_ms: timeout.as_millis() as u64,
                    });
                }
            }
        }
    }

    #[instrument(name = "qtm_stream_samples", skip(self))]
    async fn stream_samples(&self) -> Result<Box<dyn SampleSource>> {
        let conn = self.conn()?;
        self.command("StreamFrames AllFrames Analog").await?;
        Ok(Box::new(QtmSampleStream {
            shared: Arc::clone(&conn.stream),
        }))
    }

    #[instrument(name = "qtm_stop", skip(self))]
    async fn stop(&self) -> Result<()> {
        self.command("Stop").await.map(|_| ())
    }

    #[instrument(name = "qtm_save", skip(self), fields(path = %path.display()))]
    async fn save(&self, path: &Path) -> Result<()> {
        self.command(&format!("Save {} Overwrite", path.display()))
            .await
            .map(|_| ())
    }

    #[instrument(name = "qtm_release_control", skip(self))]
    async fn release_control(&self) -> Result<()> {
        self.command("ReleaseControl").await.map(|_| ())
    }

    #[instrument(name = "qtm_disconnect", skip(self))]
    async fn disconnect(&self) -> Result<()> {
        // Dropping the connection aborts the reader and closes the socket
        let _ = self.conn.lock().unwrap().take();
        Ok(())
    }
}

impl MarkerSink for QtmClient {
    async fn set_marker(&self, name: &str) -> std::result::Result<(), ContractError> {
        self.command(&format!("SetQTMEvent {name}"))
            .await
            .map(|_| ())
            .map_err(|e| ContractError::Other(format!("marker '{name}' not set: {e}")))
    }
}

/// Sample stream handle over the shared connection
struct QtmSampleStream {
    shared: Arc<StreamShared>,
}

impl SampleSource for QtmSampleStream {
    fn source_id(&self) -> &str {
        "qtm_analog"
    }

    fn listen(&self, callback: SampleBatchCallback) {
        if self.shared.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.shared.callback.lock().unwrap() = Some(callback);
    }

    fn stop(&self) {
        self.shared.listening.store(false, Ordering::SeqCst);
        *self.shared.callback.lock().unwrap() = None;
    }

    fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::Relaxed)
    }
}

/// Wait for the next routed reply within the command timeout
async fn recv_reply(replies: &mut mpsc::Receiver<Reply>) -> Result<Reply> {
    match tokio::time::timeout(COMMAND_TIMEOUT, replies.recv()).await {
        Ok(Some(reply)) => Ok(reply),
        Ok(None) => Err(CaptureClientError::protocol("connection closed")),
        Err(_) => Err(CaptureClientError::protocol(format!(
            "no reply within {}ms",
            COMMAND_TIMEOUT.as_millis()
        ))),
    }
}

/// Routes wire packets to their consumers until the connection drops
async fn reader_loop(
    mut read_half: OwnedReadHalf,
    replies: mpsc::Sender<Reply>,
    events: broadcast::Sender<SessionEvent>,
    recent: Arc<StdMutex<VecDeque<SessionEvent>>>,
    stream: Arc<StreamShared>,
) {
    loop {
        let (raw_kind, payload) = match wire::read_packet(&mut read_half).await {
            Ok(packet) => packet,
            Err(e) => {
                debug!(reason = %e, "reader stopped");
                break;
            }
        };

        match PacketType::from_u32(raw_kind) {
            Some(kind @ (PacketType::Error | PacketType::Command | PacketType::Xml)) => {
                let reply = Reply {
                    kind,
                    text: wire::decode_str(&payload),
                };
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
            Some(PacketType::Event) => match wire::decode_event(&payload) {
                Some(event) => {
                    let mut recent = recent.lock().unwrap();
                    if recent.len() == RECENT_EVENTS {
                        recent.pop_front();
                    }
                    recent.push_back(event);
                    drop(recent);
                    let _ = events.send(event);
                }
                None => debug!(code = ?payload.first(), "event outside vocabulary, ignored"),
            },
            Some(PacketType::Data) => {
                if !stream.listening.load(Ordering::Relaxed) {
                    continue;
                }
                match wire::decode_analog_frame(&payload) {
                    Ok(Some(batch)) => {
                        let callback = stream.callback.lock().unwrap().clone();
                        if let Some(callback) = callback {
                            callback(batch);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(fault = %e, "malformed data frame skipped"),
                }
            }
            Some(PacketType::NoMoreData) => {}
            None => warn!(packet_type = raw_kind, "unknown packet type ignored"),
        }
    }
}

//! Telegram frame accumulation.
//!
//! The P1 port delivers bytes in arbitrary chunks with no framing
//! guarantee: a chunk may hold a fragment of a telegram, several
//! telegrams, or line noise. [`TelegramCollector`] buffers everything it
//! is fed and carves complete frames out of the buffer on a fixed scan
//! interval, emitting them in arrival order.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use regex::bytes::Regex;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default interval between buffer scans in milliseconds.
///
/// Telegrams arrive every 1–10 s, so a coarse scan keeps lock contention
/// low without falling behind the meter.
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 500;

/// Default capacity of the frame channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// A frame runs from the `/` start marker through `!` plus four
/// characters. The four trailing characters are a checksum, matched but
/// not verified.
fn telegram_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?-u)/[^!]*![0-9A-Z]{4}").expect("telegram frame pattern is valid")
    })
}

/// Collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Interval between buffer scans
    pub scan_interval: Duration,
    /// Capacity of the frame channel
    pub channel_capacity: usize,
}

impl CollectorConfig {
    /// Create a configuration with the default scan interval and channel
    /// capacity.
    pub fn new() -> Self {
        Self {
            scan_interval: Duration::from_millis(DEFAULT_SCAN_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the scan interval.
    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Set the frame channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Events emitted by the collector.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorEvent {
    /// One complete telegram frame, start marker through end marker
    Telegram(Bytes),
    /// The collector was cancelled; no more frames will follow
    EndOfStream,
}

/// Accumulates raw chunks and emits complete telegram frames.
///
/// Ingestion and scanning run concurrently against one shared buffer.
/// Both paths take the same exclusive lock — a scan that finds a frame
/// truncates the buffer, so there is no read-only fast path to race with
/// an append.
pub struct TelegramCollector {
    config: CollectorConfig,
    buffer: Arc<Mutex<BytesMut>>,
    frame_tx: mpsc::Sender<CollectorEvent>,
    frame_rx: Option<mpsc::Receiver<CollectorEvent>>,
}

impl TelegramCollector {
    /// Create a new collector.
    pub fn new(config: CollectorConfig) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel(config.channel_capacity);
        Self {
            config,
            buffer: Arc::new(Mutex::new(BytesMut::new())),
            frame_tx,
            frame_rx: Some(frame_rx),
        }
    }

    /// Take the frame receiver.
    ///
    /// This can only be called once. Returns None if already taken.
    pub fn subscribe(&mut self) -> Option<mpsc::Receiver<CollectorEvent>> {
        self.frame_rx.take()
    }

    /// Append a chunk of raw bytes to the accumulation buffer.
    ///
    /// Zero-length chunks are ignored. Never fails; a chunk is held until
    /// a later scan completes a frame around it.
    pub async fn ingest(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let mut buffer = self.buffer.lock().await;
        buffer.extend_from_slice(chunk);
        trace!(len = chunk.len(), buffered = buffer.len(), "chunk ingested");
    }

    /// Spawn the background scan loop.
    ///
    /// Each tick takes the buffer lock, extracts at most one frame and
    /// sends it to the subscriber. On cancellation the loop sends
    /// [`CollectorEvent::EndOfStream`] exactly once and returns; call
    /// this at most once per collector.
    pub fn run(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let buffer = Arc::clone(&self.buffer);
        let frame_tx = self.frame_tx.clone();
        let scan_interval = self.config.scan_interval;

        tokio::spawn(async move {
            let mut ticker = interval(scan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = frame_tx.send(CollectorEvent::EndOfStream).await;
                        return;
                    }
                    _ = ticker.tick() => {
                        let frame = {
                            let mut buffer = buffer.lock().await;
                            extract_frame(&mut buffer)
                        };
                        if let Some(frame) = frame {
                            debug!(len = frame.len(), "telegram framed");
                            if frame_tx.send(CollectorEvent::Telegram(frame)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        })
    }
}

/// Carve the first complete frame out of the buffer.
///
/// Bytes before the start marker are discarded as noise. On a match the
/// buffer is advanced past the frame plus one boundary byte (the newline
/// after the end marker) when one is present; on no match the buffer is
/// left untouched for the next scan.
fn extract_frame(buffer: &mut BytesMut) -> Option<Bytes> {
    let (frame, end) = {
        let found = telegram_pattern().find(&buffer[..])?;
        (Bytes::copy_from_slice(found.as_bytes()), found.end())
    };

    let consumed = if end < buffer.len() { end + 1 } else { end };
    buffer.advance(consumed);

    Some(frame)
}

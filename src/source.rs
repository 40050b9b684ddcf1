//! P1 port byte source.
//!
//! Reads raw chunks from the meter's serial link on a fixed cadence and
//! feeds them to the [`TelegramCollector`]. Chunk-size policy (skipping
//! empty or implausibly-sized reads) lives here; the collector itself
//! accepts anything.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_serial::SerialStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collector::TelegramCollector;
use crate::error::Result;

/// Default path of the P1-over-USB serial device.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyUSB0";

/// Default baud rate of a DSMR 4/5 P1 port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default interval between port reads in seconds.
pub const DEFAULT_READ_INTERVAL_SECS: u64 = 10;

/// Default maximum size of a single read in bytes.
pub const DEFAULT_READ_SIZE: usize = 1024;

/// Byte source configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Serial device path
    pub path: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Interval between reads
    pub read_interval: Duration,
    /// Maximum bytes per read
    pub read_size: usize,
    /// Accept only reads whose length falls in this inclusive window;
    /// everything else is skipped with a warning. None accepts any
    /// non-empty read.
    pub accept_range: Option<(usize, usize)>,
}

impl SourceConfig {
    /// Create a configuration for the given device path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_interval: Duration::from_secs(DEFAULT_READ_INTERVAL_SECS),
            read_size: DEFAULT_READ_SIZE,
            accept_range: None,
        }
    }

    /// Set the baud rate.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read interval.
    pub fn read_interval(mut self, interval: Duration) -> Self {
        self.read_interval = interval;
        self
    }

    /// Set the maximum read size.
    pub fn read_size(mut self, size: usize) -> Self {
        self.read_size = size;
        self
    }

    /// Accept only reads whose length is within `min..=max`.
    pub fn accept_range(mut self, min: usize, max: usize) -> Self {
        self.accept_range = Some((min, max));
        self
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_PATH)
    }
}

/// Open the configured serial device.
pub fn open_serial(config: &SourceConfig) -> Result<SerialStream> {
    let builder = tokio_serial::new(&config.path, config.baud_rate);
    let stream = SerialStream::open(&builder)?;
    Ok(stream)
}

/// Interval-driven read loop over an async byte reader.
///
/// Generic over the reader so tests (and non-serial deployments) can
/// substitute any [`AsyncRead`] for the P1 port.
pub struct ByteSource<R> {
    reader: R,
    config: SourceConfig,
}

impl<R: AsyncRead + Unpin> ByteSource<R> {
    /// Wrap a reader with the given configuration.
    pub fn new(reader: R, config: SourceConfig) -> Self {
        Self { reader, config }
    }

    /// Read chunks until cancelled, feeding each accepted chunk to the
    /// collector.
    ///
    /// Empty reads are skipped without error. Read errors are fatal and
    /// propagate to the caller.
    pub async fn run(
        mut self,
        collector: &TelegramCollector,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut ticker = interval(self.config.read_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut chunk = vec![0u8; self.config.read_size];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    // The port may sit silent for seconds; keep the read
                    // interruptible so shutdown is not held hostage.
                    let n = tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        read = self.reader.read(&mut chunk) => read?,
                    };
                    if n == 0 {
                        continue;
                    }
                    if let Some((min, max)) = self.config.accept_range {
                        if n < min || n > max {
                            warn!(len = n, min, max, "skipping read outside accept window");
                            continue;
                        }
                    }
                    debug!(len = n, "read chunk");
                    collector.ingest(&chunk[..n]).await;
                }
            }
        }
    }
}

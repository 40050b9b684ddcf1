//! End-to-end P1 meter pipeline.
//!
//! [`DsmrMeter`] wires the byte source, the telegram collector and the
//! field parser together behind a single event stream: one
//! [`MeterEvent::Reading`] per framed telegram, and one
//! [`MeterEvent::EndOfStream`] when the pipeline shuts down.

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::collector::{CollectorConfig, CollectorEvent, TelegramCollector};
use crate::error::{DsmrError, FieldError, Result};
use crate::parser::parse_telegram;
use crate::source::{open_serial, ByteSource, SourceConfig};
use crate::types::EnergyReading;

/// Capacity of the reading event channel.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Meter pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct MeterConfig {
    /// Byte source settings
    pub source: SourceConfig,
    /// Collector settings
    pub collector: CollectorConfig,
}

/// Events emitted by the meter pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum MeterEvent {
    /// One parsed reading, with any non-fatal field errors alongside
    Reading {
        /// The extracted reading, zero-filled where lines were absent
        reading: EnergyReading,
        /// Per-line extraction failures, empty on a clean parse
        errors: Vec<FieldError>,
    },
    /// The pipeline shut down; no more readings will follow
    EndOfStream,
}

/// DSMR P1 meter pipeline.
pub struct DsmrMeter<R> {
    reader: R,
    config: MeterConfig,
    event_tx: mpsc::Sender<MeterEvent>,
    event_rx: Option<mpsc::Receiver<MeterEvent>>,
}

impl DsmrMeter<SerialStream> {
    /// Open the configured serial device and build a meter on top of it.
    pub fn open(config: MeterConfig) -> Result<Self> {
        let reader = open_serial(&config.source)?;
        Ok(Self::from_reader(reader, config))
    }
}

impl<R: AsyncRead + Unpin + Send + 'static> DsmrMeter<R> {
    /// Build a meter over an already-open byte reader.
    pub fn from_reader(reader: R, config: MeterConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            reader,
            config,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Take the event receiver.
    ///
    /// This can only be called once. Returns None if already taken.
    pub fn subscribe(&mut self) -> Option<mpsc::Receiver<MeterEvent>> {
        self.event_rx.take()
    }

    /// Spawn the pipeline: source read loop, collector scan loop and the
    /// parse loop feeding the event channel.
    ///
    /// Runs until the token is cancelled or the byte source fails; either
    /// way the subscriber receives [`MeterEvent::EndOfStream`] last.
    pub fn run(self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let mut collector = TelegramCollector::new(self.config.collector.clone());
            let mut frames = collector
                .subscribe()
                .ok_or_else(|| DsmrError::Internal("frame receiver already taken".into()))?;
            let scan_task = collector.run(cancel.clone());

            let source = ByteSource::new(self.reader, self.config.source.clone());
            let source_task = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    let result = source.run(&collector, cancel.clone()).await;
                    if result.is_err() {
                        // Shut the rest of the pipeline down so the
                        // subscriber still sees the sentinel.
                        cancel.cancel();
                    }
                    result
                }
            });

            info!("meter pipeline started");

            while let Some(event) = frames.recv().await {
                match event {
                    CollectorEvent::Telegram(frame) => {
                        let (reading, errors) = parse_telegram(&frame);
                        if !errors.is_empty() {
                            warn!(count = errors.len(), "telegram parsed with field errors");
                        }
                        let event = MeterEvent::Reading { reading, errors };
                        if self.event_tx.send(event).await.is_err() {
                            // Subscriber is gone; wind the tasks down.
                            cancel.cancel();
                            break;
                        }
                    }
                    CollectorEvent::EndOfStream => {
                        let _ = self.event_tx.send(MeterEvent::EndOfStream).await;
                        break;
                    }
                }
            }

            // Wake a scanner blocked on a frame send before joining it.
            drop(frames);

            let source_result = source_task
                .await
                .map_err(|err| DsmrError::Internal(err.to_string()))?;
            scan_task
                .await
                .map_err(|err| DsmrError::Internal(err.to_string()))?;
            source_result?;

            info!("meter pipeline stopped");
            Ok(())
        })
    }
}

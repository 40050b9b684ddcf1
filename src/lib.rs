//! # voltage_dsmr
//!
//! DSMR P1 smart-meter telegram framing and parsing for Rust.
//!
//! This crate turns the continuous byte stream of a Dutch smart meter's
//! P1 port into typed energy readings: cumulative consumption and
//! feed-in counters per tariff, instantaneous rates, and per-phase
//! power.
//!
//! ## Features
//!
//! - **Stream framing**: telegrams are re-synchronized from
//!   arbitrary-sized chunks, tolerating noise, partial reads and frames
//!   split at any byte offset
//! - **Best-effort parsing**: a malformed data line yields a per-line
//!   error and leaves its field at zero instead of failing the telegram
//! - **Event-driven**: readings are delivered asynchronously via channels
//! - **Forward compatible**: unknown OBIS codes are silently ignored
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use voltage_dsmr::{DsmrMeter, MeterConfig, MeterEvent, SourceConfig};
//!
//! #[tokio::main]
//! async fn main() -> voltage_dsmr::Result<()> {
//!     let config = MeterConfig {
//!         source: SourceConfig::new("/dev/ttyUSB0"),
//!         ..MeterConfig::default()
//!     };
//!     let mut meter = DsmrMeter::open(config)?;
//!
//!     let mut events = meter.subscribe().unwrap();
//!     let cancel = CancellationToken::new();
//!     let pipeline = meter.run(cancel.clone());
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             MeterEvent::Reading { reading, .. } => {
//!                 println!("drawing {} kW", reading.current_consumption);
//!             }
//!             MeterEvent::EndOfStream => break,
//!         }
//!     }
//!
//!     pipeline.await.expect("pipeline")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol Overview
//!
//! A P1 telegram is a periodic ASCII message, delimited by a `/` start
//! marker and an `!` end marker followed by a four-character checksum
//! (matched, not verified). Inside, each data line carries an OBIS
//! reference code and a parenthesised value with unit:
//!
//! ```text
//! /ISK5\2M550T-1012
//!
//! 1-0:1.8.1(013977.847*kWh)
//! 1-0:1.8.2(014745.839*kWh)
//! 1-0:1.7.0(00.167*kW)
//! !1E1D
//! ```

pub mod collector;
pub mod error;
pub mod meter;
pub mod parser;
pub mod source;
pub mod types;

// Re-export main types
pub use collector::{CollectorConfig, CollectorEvent, TelegramCollector};
pub use error::{DsmrError, FieldError, Result};
pub use meter::{DsmrMeter, MeterConfig, MeterEvent};
pub use parser::parse_telegram;
pub use source::{open_serial, ByteSource, SourceConfig};
pub use types::*;

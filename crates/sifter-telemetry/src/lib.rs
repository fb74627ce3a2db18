//! # Sifter Telemetry
//!
//! Query telemetry: a bounded in-memory collector of per-query entries
//! flushed periodically to a pluggable sink, plus the tracing/logging
//! setup shared by the server binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collector;
mod entry;
pub mod logging;
mod sink;

pub use collector::Collector;
pub use entry::Entry;
pub use sink::{DiscardSink, Sink, SinkError};

//! The query collector.

use crate::{Entry, Sink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Bounded in-memory collector of query entries.
///
/// Entries accumulate under a mutex until either the buffer reaches
/// `max_entries` (immediate flush) or the periodic flush task fires.
/// Flushes are mutually exclusive; the buffer lock is held only while
/// the batch is moved out, so queries recorded during a slow sink write
/// only wait for that move.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Box<dyn Sink>,
    max_entries: usize,
    interval: Duration,
    anonymize: bool,
    entries: Mutex<Vec<Entry>>,
    last_flush: Mutex<Instant>,
    flush_lock: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

impl Collector {
    /// Creates a collector flushing to `sink`.
    pub fn new(sink: Box<dyn Sink>, max_entries: usize, interval: Duration, anonymize: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                max_entries: max_entries.max(1),
                interval,
                anonymize,
                entries: Mutex::new(Vec::new()),
                last_flush: Mutex::new(Instant::now()),
                flush_lock: tokio::sync::Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the number of buffered entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records a query entry.
    ///
    /// Assigns the sequence ID, applies anonymization, and triggers an
    /// immediate flush when the buffer reaches capacity.
    pub async fn record(&self, mut entry: Entry) {
        entry.id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if self.inner.anonymize {
            entry.anonymize();
        }

        let full = {
            let mut entries = self.inner.entries.lock();
            entries.push(entry);
            entries.len() >= self.inner.max_entries
        };

        if full {
            self.flush().await;
        }
    }

    /// Flushes the buffered batch to the sink.
    pub async fn flush(&self) {
        let _exclusive = self.inner.flush_lock.lock().await;

        let batch = {
            let mut entries = self.inner.entries.lock();
            std::mem::take(&mut *entries)
        };

        if batch.is_empty() {
            return;
        }

        *self.inner.last_flush.lock() = Instant::now();
        debug!(entries = batch.len(), "flushing collector batch");

        if let Err(e) = self.inner.sink.store(batch).await {
            warn!(error = %e, "collector sink failed");
        }
    }

    /// Starts the periodic flush task.
    ///
    /// Ticks every `interval`; a tick is skipped when an immediate flush
    /// happened within the last half interval. Abort the returned handle
    /// on shutdown.
    pub fn run(&self) -> JoinHandle<()> {
        let collector = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(collector.inner.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let since_last = collector.inner.last_flush.lock().elapsed();
                if since_last < collector.inner.interval / 2 {
                    continue;
                }

                collector.flush().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SinkError;
    use async_trait::async_trait;
    use sifter_proto::{Name, Question};
    use std::net::{IpAddr, Ipv4Addr};
    use std::str::FromStr;

    /// Sink capturing every flushed batch.
    #[derive(Clone, Default)]
    struct CaptureSink {
        batches: Arc<Mutex<Vec<Vec<Entry>>>>,
    }

    #[async_trait]
    impl Sink for CaptureSink {
        async fn store(&self, entries: Vec<Entry>) -> Result<(), SinkError> {
            self.batches.lock().push(entries);
            Ok(())
        }
    }

    fn entry() -> Entry {
        Entry::new(
            Question::a(Name::from_str("example.com").unwrap()),
            vec![],
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            Duration::from_millis(3),
        )
    }

    #[tokio::test]
    async fn test_capacity_triggers_flush() {
        let sink = CaptureSink::default();
        let collector = Collector::new(Box::new(sink.clone()), 3, Duration::from_secs(900), false);

        collector.record(entry()).await;
        collector.record(entry()).await;
        assert_eq!(collector.len(), 2);
        assert!(sink.batches.lock().is_empty());

        collector.record(entry()).await;
        assert!(collector.is_empty());

        let batches = sink.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let sink = CaptureSink::default();
        let collector =
            Collector::new(Box::new(sink.clone()), 2, Duration::from_secs(900), false);

        collector.record(entry()).await;
        collector.record(entry()).await;

        let batches = sink.batches.lock();
        assert_eq!(batches[0][0].id, 1);
        assert_eq!(batches[0][1].id, 2);
    }

    #[tokio::test]
    async fn test_anonymize_applied_on_record() {
        let sink = CaptureSink::default();
        let collector = Collector::new(Box::new(sink.clone()), 1, Duration::from_secs(900), true);

        collector.record(entry()).await;

        let batches = sink.batches.lock();
        assert_eq!(batches[0][0].client, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)));
    }

    #[tokio::test]
    async fn test_empty_flush_is_noop() {
        let sink = CaptureSink::default();
        let collector = Collector::new(Box::new(sink.clone()), 10, Duration::from_secs(900), false);

        collector.flush().await;
        assert!(sink.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_interval_flush() {
        let sink = CaptureSink::default();
        let collector =
            Collector::new(Box::new(sink.clone()), 100, Duration::from_millis(50), false);

        collector.record(entry()).await;
        let handle = collector.run();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(sink.batches.lock().len(), 1);
        handle.abort();
    }
}

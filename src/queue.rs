use crate::config::{ConfigError, OverflowPolicy};
use crate::entry::LogEntry;
use crate::formatter::Formatter;
use crate::sink::LogSink;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Target of the queue's own `tracing` diagnostics.
pub const DIAGNOSTICS_TARGET: &str = "logagent_hook::dispatch";

const RUNNING: u8 = 0;
const STOPPED: u8 = 1;

/// Lifecycle of a [`DeliveryQueue`]: `Running -> Stopped`.
///
/// Construction is atomic: [`DeliveryQueue::spawn`] only returns once the
/// worker is spawned, so no caller ever sees a queue that is not running yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Stopped,
}

impl QueueState {
    fn from_u8(value: u8) -> Self {
        match value {
            RUNNING => QueueState::Running,
            _ => QueueState::Stopped,
        }
    }
}

/// Counters maintained by the queue and its dispatch worker.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    /// Entries handed to `submit` / `try_submit`.
    pub submitted: AtomicU64,
    /// Accepted into the channel.
    pub enqueued: AtomicU64,
    /// Rejected because the channel was full or already closed.
    pub dropped: AtomicU64,
    /// Formatted and written to the sink.
    pub delivered: AtomicU64,
    pub format_failures: AtomicU64,
    pub write_failures: AtomicU64,
    /// Still queued when the worker was stopped.
    pub discarded: AtomicU64,
}

struct Shared {
    state: AtomicU8,
    stats: DeliveryStats,
}

/// How the worker treats entries still queued when it is told to stop.
#[derive(Debug, Clone, Copy)]
enum StopMode {
    Discard,
    Drain,
}

/// Producer side of the bounded delivery queue.
///
/// Every clone feeds the same single dispatch worker, which formats each
/// entry and writes it to the sink. Because only the worker touches the
/// sink, writes are serialized without any lock around the sink itself.
#[derive(Clone)]
pub struct DeliveryQueue {
    sender: mpsc::Sender<LogEntry>,
    overflow: OverflowPolicy,
    shared: Arc<Shared>,
}

impl DeliveryQueue {
    /// Create the channel and spawn its dispatch worker on the current
    /// Tokio runtime.
    ///
    /// **Parameters**
    /// - `sink`: destination of every formatted record.
    /// - `formatter`: turns entries into records, called only by the worker.
    /// - `capacity`: maximum number of queued entries, must be non-zero.
    /// - `overflow`: what `submit` does when the queue is full.
    ///
    /// **Returns**
    /// - The queue plus the [`StopHandle`] that shuts the worker down.
    /// - `Err(ConfigError::InvalidCapacity)` for a zero capacity.
    /// - `Err(ConfigError::NoRuntime)` outside a Tokio runtime.
    pub fn spawn(
        sink: Arc<dyn LogSink>,
        formatter: Arc<dyn Formatter>,
        capacity: usize,
        overflow: OverflowPolicy,
    ) -> Result<(Self, StopHandle), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity(capacity));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let shared = Arc::new(Shared {
            state: AtomicU8::new(RUNNING),
            stats: DeliveryStats::default(),
        });
        let (sender, receiver) = mpsc::channel::<LogEntry>(capacity);
        let (signal, signal_rx) = oneshot::channel::<StopMode>();

        let worker = Worker {
            receiver,
            sink,
            formatter,
            shared: Arc::clone(&shared),
        };
        let worker = runtime.spawn(worker.run(signal_rx));
        debug!(target: DIAGNOSTICS_TARGET, capacity, ?overflow, "delivery queue started");

        let queue = DeliveryQueue {
            sender,
            overflow,
            shared: Arc::clone(&shared),
        };
        let handle = StopHandle {
            signal,
            worker,
            shared,
        };
        Ok((queue, handle))
    }

    /// Queue a copy of `entry` according to the overflow policy.
    ///
    /// With [`OverflowPolicy::Drop`] this never waits: a full queue drops
    /// the copy. With [`OverflowPolicy::Block`] it waits for a free slot,
    /// or until the worker stops. Either way nothing is reported back.
    ///
    /// # Panics
    ///
    /// If the queue has been stopped. Submitting after
    /// [`StopHandle::stop`] is a caller bug.
    pub async fn submit(&self, entry: &LogEntry) {
        self.assert_running();
        self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
        let entry = entry.clone();

        match self.overflow {
            OverflowPolicy::Drop => {
                self.enqueue_or_drop(entry);
            }
            OverflowPolicy::Block => {
                if self.sender.send(entry).await.is_ok() {
                    self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        target: DIAGNOSTICS_TARGET,
                        "delivery queue closed while waiting for capacity, dropping log entry"
                    );
                }
            }
        }
    }

    /// Queue a copy of `entry` without ever waiting, whatever the overflow
    /// policy. Returns whether the entry was accepted.
    ///
    /// # Panics
    ///
    /// If the queue has been stopped.
    pub fn try_submit(&self, entry: &LogEntry) -> bool {
        self.assert_running();
        self.shared.stats.submitted.fetch_add(1, Ordering::Relaxed);
        self.enqueue_or_drop(entry.clone())
    }

    pub fn state(&self) -> QueueState {
        QueueState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.shared.stats
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    fn assert_running(&self) {
        let state = self.state();
        assert!(
            state == QueueState::Running,
            "log entry submitted to a {state:?} delivery queue; submit must not be called after stop"
        );
    }

    fn enqueue_or_drop(&self, entry: LogEntry) -> bool {
        match self.sender.try_send(entry) {
            Ok(()) => {
                self.shared.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(target: DIAGNOSTICS_TARGET, "delivery queue full, dropping log entry");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(target: DIAGNOSTICS_TARGET, "delivery queue closed, dropping log entry");
                false
            }
        }
    }
}

/// Shuts down the dispatch worker of a [`DeliveryQueue`].
///
/// Dropping the handle without calling [`stop`](Self::stop) or
/// [`close`](Self::close) detaches the worker: it keeps delivering until
/// every queue clone is dropped.
pub struct StopHandle {
    signal: oneshot::Sender<StopMode>,
    worker: JoinHandle<()>,
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Stop the worker and wait for it to exit.
    ///
    /// A write already in progress completes; entries still queued are
    /// discarded and counted in [`DeliveryStats::discarded`].
    pub async fn stop(self) {
        self.finish(StopMode::Discard).await;
    }

    /// Stop accepting entries, let the worker deliver everything already
    /// queued, and wait for it to exit.
    pub async fn close(self) {
        self.finish(StopMode::Drain).await;
    }

    pub fn state(&self) -> QueueState {
        QueueState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.shared.stats
    }

    async fn finish(self, mode: StopMode) {
        self.shared.state.store(STOPPED, Ordering::SeqCst);
        // Fails only if the worker is already gone.
        let _ = self.signal.send(mode);
        if let Err(err) = self.worker.await {
            warn!(
                target: DIAGNOSTICS_TARGET,
                error = %err,
                "dispatch worker terminated abnormally"
            );
        }
    }
}

struct Worker {
    receiver: mpsc::Receiver<LogEntry>,
    sink: Arc<dyn LogSink>,
    formatter: Arc<dyn Formatter>,
    shared: Arc<Shared>,
}

impl Worker {
    async fn run(mut self, mut signal: oneshot::Receiver<StopMode>) {
        let mut detached = false;

        let mode = loop {
            tokio::select! {
                biased;
                stop = &mut signal, if !detached => match stop {
                    Ok(mode) => break mode,
                    // Handle dropped without stopping: run until the senders go away.
                    Err(_) => detached = true,
                },
                next = self.receiver.recv() => match next {
                    Some(entry) => self.deliver(entry).await,
                    None => break StopMode::Drain,
                },
            }
        };

        self.receiver.close();
        match mode {
            StopMode::Drain => {
                while let Some(entry) = self.receiver.recv().await {
                    self.deliver(entry).await;
                }
            }
            StopMode::Discard => {
                let mut discarded = 0u64;
                while self.receiver.try_recv().is_ok() {
                    discarded += 1;
                }
                if discarded > 0 {
                    self.shared
                        .stats
                        .discarded
                        .fetch_add(discarded, Ordering::Relaxed);
                    debug!(
                        target: DIAGNOSTICS_TARGET,
                        discarded,
                        "discarded queued log entries on stop"
                    );
                }
            }
        }

        if let Err(err) = self.sink.flush().await {
            warn!(
                target: DIAGNOSTICS_TARGET,
                error = %err,
                "failed to flush log sink on shutdown"
            );
        }
        debug!(target: DIAGNOSTICS_TARGET, "dispatch worker stopped");
    }

    async fn deliver(&self, entry: LogEntry) {
        let stats = &self.shared.stats;
        let line = match self.formatter.format(&entry) {
            Ok(line) => line,
            Err(err) => {
                stats.format_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: DIAGNOSTICS_TARGET,
                    error = %err,
                    "dropping log entry that failed to format"
                );
                return;
            }
        };

        match self.sink.write(&line).await {
            Ok(()) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                stats.write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: DIAGNOSTICS_TARGET,
                    error = %err,
                    "log sink write failed, entry dropped"
                );
            }
        }
    }
}

use crate::config::{ConfigError, DeliveryMode, HookConfig, OverflowPolicy, DEFAULT_QUEUE_CAPACITY};
use crate::entry::{Level, LogEntry};
use crate::formatter::{FormatError, Formatter};
use crate::queue::{DeliveryQueue, DeliveryStats, StopHandle};
use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use std::sync::Arc;

/// Error surfaced by [`Hook::fire`]. Only the synchronous hook returns one.
#[derive(thiserror::Error, Debug)]
pub enum HookError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Write(#[from] SinkError),
}

/// Receiver of log entries from the host logging framework.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Deliver one entry. The entry is only read, never modified.
    async fn fire(&self, entry: &LogEntry) -> Result<(), HookError>;

    /// Levels this hook wants to receive. Filtering is up to the caller.
    fn levels(&self) -> &'static [Level] {
        &Level::ALL
    }
}

/// Fire-and-forget hook backed by a [`DeliveryQueue`].
///
/// `fire` copies the entry into the queue and returns `Ok(())` right away;
/// formatting and writing happen on the background dispatch worker.
/// Backpressure and write errors are never reported to the caller, only
/// counted in [`stats`](Self::stats).
#[derive(Clone)]
pub struct AsyncHook {
    queue: DeliveryQueue,
}

impl AsyncHook {
    /// Create a hook with the default queue capacity (1024) that drops
    /// entries when the queue is full.
    ///
    /// Must be called from within a Tokio runtime. Call
    /// [`StopHandle::stop`] on the returned handle to shut the worker
    /// down; calling [`fire`](Hook::fire) afterwards panics.
    pub fn new(
        sink: Arc<dyn LogSink>,
        formatter: Arc<dyn Formatter>,
    ) -> Result<(Self, StopHandle), ConfigError> {
        Self::with_capacity(sink, formatter, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(
        sink: Arc<dyn LogSink>,
        formatter: Arc<dyn Formatter>,
        capacity: usize,
    ) -> Result<(Self, StopHandle), ConfigError> {
        let (queue, handle) = DeliveryQueue::spawn(sink, formatter, capacity, OverflowPolicy::Drop)?;
        Ok((AsyncHook { queue }, handle))
    }

    /// Create a hook using the capacity and overflow policy of `config`.
    pub fn with_config(
        sink: Arc<dyn LogSink>,
        formatter: Arc<dyn Formatter>,
        config: &HookConfig,
    ) -> Result<(Self, StopHandle), ConfigError> {
        config.validate()?;
        let (queue, handle) =
            DeliveryQueue::spawn(sink, formatter, config.queue_capacity, config.overflow)?;
        Ok((AsyncHook { queue }, handle))
    }

    /// Queue an entry from synchronous code. Never waits; returns whether
    /// the entry was accepted.
    pub fn try_fire(&self, entry: &LogEntry) -> bool {
        self.queue.try_submit(entry)
    }

    pub fn stats(&self) -> &DeliveryStats {
        self.queue.stats()
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }
}

#[async_trait]
impl Hook for AsyncHook {
    async fn fire(&self, entry: &LogEntry) -> Result<(), HookError> {
        self.queue.submit(entry).await;
        Ok(())
    }
}

/// Hook that formats and writes on the caller's task.
///
/// Errors from the formatter or the sink are returned from `fire`.
#[derive(Clone)]
pub struct SyncHook {
    sink: Arc<dyn LogSink>,
    formatter: Arc<dyn Formatter>,
}

impl SyncHook {
    pub fn new(sink: Arc<dyn LogSink>, formatter: Arc<dyn Formatter>) -> Self {
        SyncHook { sink, formatter }
    }
}

#[async_trait]
impl Hook for SyncHook {
    async fn fire(&self, entry: &LogEntry) -> Result<(), HookError> {
        let line = self.formatter.format(entry)?;
        self.sink.write(&line).await?;
        Ok(())
    }
}

/// Either hook variant, picked by [`HookConfig::mode`].
#[derive(Clone)]
pub enum LogHook {
    Async(AsyncHook),
    Sync(SyncHook),
}

impl LogHook {
    /// Build the hook described by `config`.
    ///
    /// **Returns**
    /// - The hook, plus a [`StopHandle`] when the asynchronous variant was
    ///   chosen (`None` for the synchronous one, which has nothing to stop).
    /// - `Err(..)` for an invalid configuration or, in asynchronous mode,
    ///   when called outside a Tokio runtime.
    pub fn build(
        sink: Arc<dyn LogSink>,
        formatter: Arc<dyn Formatter>,
        config: &HookConfig,
    ) -> Result<(Self, Option<StopHandle>), ConfigError> {
        match config.mode {
            DeliveryMode::Async => {
                let (hook, handle) = AsyncHook::with_config(sink, formatter, config)?;
                Ok((LogHook::Async(hook), Some(handle)))
            }
            DeliveryMode::Sync => Ok((LogHook::Sync(SyncHook::new(sink, formatter)), None)),
        }
    }

    pub fn mode(&self) -> DeliveryMode {
        match self {
            LogHook::Async(_) => DeliveryMode::Async,
            LogHook::Sync(_) => DeliveryMode::Sync,
        }
    }
}

#[async_trait]
impl Hook for LogHook {
    async fn fire(&self, entry: &LogEntry) -> Result<(), HookError> {
        match self {
            LogHook::Async(hook) => hook.fire(entry).await,
            LogHook::Sync(hook) => hook.fire(entry).await,
        }
    }
}

use crate::config::{ConfigError, DeliveryMode, HookConfig};
use crate::formatter::Formatter;
use crate::hook::AsyncHook;
use crate::layer::HookLayer;
use crate::queue::StopHandle;
use crate::sink::LogSink;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::Registry;

/// Error returned when the global subscriber cannot be installed.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A `tracing` event cannot wait on a sink write, so the layer only
    /// works with the queued hook.
    #[error("the tracing layer requires asynchronous delivery, got {0:?}")]
    UnsupportedMode(DeliveryMode),

    #[error("failed to set global subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Initialize the global `tracing` subscriber using the provided sink,
/// formatter and [`HookConfig`].
///
/// **Parameters**
/// - `sink`: destination of the formatted records.
/// - `formatter`: usually a [`LogstashFormatter`](crate::formatter::LogstashFormatter).
/// - `config`: queue capacity and console output; `mode` must be
///   [`DeliveryMode::Async`].
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`HookLayer`] as the global default
/// subscriber, so all `tracing` events in the process are forwarded. With
/// `enable_stdout` a `fmt` layer is stacked on top.
///
/// **Returns**
/// - The [`StopHandle`] of the dispatch worker; call
///   [`close`](StopHandle::close) before exiting to deliver pending entries.
///
/// # Panics
///
/// The installed subscriber stays global after the handle is used. Once
/// [`close`](StopHandle::close) or [`stop`](StopHandle::stop) has been
/// called, every later `tracing` event in the process panics inside
/// [`HookLayer`], because entries must not be submitted to a stopped queue.
/// Only shut the worker down when nothing will log anymore.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    formatter: Arc<dyn Formatter>,
    config: HookConfig,
) -> Result<StopHandle, InitError> {
    if config.mode != DeliveryMode::Async {
        return Err(InitError::UnsupportedMode(config.mode));
    }
    let (hook, handle) = AsyncHook::with_config(sink, formatter, &config)?;
    let layer = HookLayer::new(hook);

    // The two stacks have different types, so each branch installs its own.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        Registry::default().with(layer).with(fmt_layer).try_init()?;
    } else {
        Registry::default().with(layer).try_init()?;
    }
    Ok(handle)
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`HookConfig::default`].
pub fn init_tracing(
    sink: Arc<dyn LogSink>,
    formatter: Arc<dyn Formatter>,
) -> Result<StopHandle, InitError> {
    init_tracing_with_config(sink, formatter, HookConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Fields;
    use crate::formatter::LogstashFormatter;
    use crate::memory_sink::MemorySink;

    #[tokio::test]
    async fn test_sync_mode_is_rejected() {
        let config = HookConfig {
            mode: DeliveryMode::Sync,
            ..HookConfig::default()
        };
        let result = init_tracing_with_config(
            Arc::new(MemorySink::new()),
            Arc::new(LogstashFormatter::new(Fields::new())),
            config,
        );
        assert!(matches!(
            result,
            Err(InitError::UnsupportedMode(DeliveryMode::Sync))
        ));
    }

    #[tokio::test]
    async fn test_zero_capacity_is_rejected() {
        let config = HookConfig {
            queue_capacity: 0,
            ..HookConfig::default()
        };
        let result = init_tracing_with_config(
            Arc::new(MemorySink::new()),
            Arc::new(LogstashFormatter::new(Fields::new())),
            config,
        );
        assert!(matches!(
            result,
            Err(InitError::Config(ConfigError::InvalidCapacity(0)))
        ));
    }
}

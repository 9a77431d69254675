pub mod entry;
pub mod pool;
pub mod formatter;
pub mod sink;
pub mod queue;
pub mod hook;
pub mod config;
pub mod env;

#[cfg(feature = "layer")]
pub mod layer;
#[cfg(feature = "layer")]
pub mod init;

pub mod memory_sink;
pub mod noop_sink;

pub use config::{ConfigError, DeliveryMode, HookConfig, OverflowPolicy};
pub use entry::{FieldValue, Fields, Level, LogEntry};
pub use formatter::{default_formatter, FormatError, Formatter, LogstashFormatter};
pub use hook::{AsyncHook, Hook, HookError, LogHook, SyncHook};
pub use queue::{DeliveryStats, StopHandle};
pub use sink::{LogSink, SinkError, WriterSink};

use serde::Deserialize;
use std::str::FromStr;

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Error raised while building a hook or reading its configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("queue capacity must be greater than zero, got {0}")]
    InvalidCapacity(usize),

    #[error("the asynchronous hook must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

/// What the asynchronous hook does when its queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new entry and return immediately.
    #[default]
    Drop,
    /// Wait for a free slot, or until the worker has stopped.
    Block,
}

impl FromStr for OverflowPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(OverflowPolicy::Drop),
            "block" => Ok(OverflowPolicy::Block),
            _ => Err(()),
        }
    }
}

/// Which hook variant [`LogHook::build`](crate::hook::LogHook::build) creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Queue entries for the background dispatch worker.
    #[default]
    Async,
    /// Format and write on the caller's task.
    Sync,
}

impl FromStr for DeliveryMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "async" => Ok(DeliveryMode::Async),
            "sync" => Ok(DeliveryMode::Sync),
            _ => Err(()),
        }
    }
}

/// Hook configuration.
///
/// **Fields**
/// - `queue_capacity`: number of entries the delivery queue holds before
///   the overflow policy kicks in. Must be greater than zero.
/// - `overflow`: drop or block when the queue is full.
/// - `mode`: asynchronous (queued) or synchronous (inline) delivery.
/// - `enable_stdout`: when installed through [`crate::init`], also print
///   events to the console through a `fmt` layer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
    pub mode: DeliveryMode,
    pub enable_stdout: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::Drop,
            mode: DeliveryMode::Async,
            enable_stdout: true,
        }
    }
}

impl HookConfig {
    /// Fail early on values the queue would reject.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidCapacity(self.queue_capacity));
        }
        Ok(())
    }
}

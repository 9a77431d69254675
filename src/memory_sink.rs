use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Sink that appends every record to a shared in-memory buffer.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to a hook.
#[derive(Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Written records as strings, without their trailing newline.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .map(str::to_owned)
            .collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn write(&self, line: &[u8]) -> Result<(), SinkError> {
        self.buffer.lock().extend_from_slice(line);
        Ok(())
    }
}

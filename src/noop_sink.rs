use crate::sink::{LogSink, SinkError};
use async_trait::async_trait;

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of the formatter and the dispatch
/// worker without any external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn write(&self, _line: &[u8]) -> Result<(), SinkError> {
        Ok(())
    }
}

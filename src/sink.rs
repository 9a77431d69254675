use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Error returned by a [`LogSink`] that could not take a record.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Byte-stream destination for formatted records.
///
/// Implementations only need to accept one complete, newline-terminated
/// record at a time. Connection management (dialing, reconnecting, TLS)
/// belongs to whoever builds the sink.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Write a single formatted record.
    ///
    /// **Parameters**
    /// - `line`: one JSON object followed by `\n`.
    ///
    /// **Returns**
    /// - `Ok(())` once the whole record was accepted.
    /// - `Err(..)` if the write failed. The asynchronous hook counts and
    ///   skips the record; the synchronous hook hands the error back to the
    ///   caller. Nothing is retried.
    async fn write(&self, line: &[u8]) -> Result<(), SinkError>;

    /// Flush any buffered bytes.
    ///
    /// Called once by the dispatch worker before it exits. Default
    /// implementation is a no-op.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// [`LogSink`] over any Tokio [`AsyncWrite`]: a connected `TcpStream`, a
/// `File`, `Stdout`, or a `BufWriter` around one of those.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
        }
    }

    /// Give back the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> LogSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&self, line: &[u8]) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_writer_sink_writes_whole_lines() {
        let (client, mut server) = tokio::io::duplex(1024);
        let sink = WriterSink::new(client);

        sink.write(b"{\"a\":1}\n").await.unwrap();
        sink.write(b"{\"b\":2}\n").await.unwrap();
        sink.flush().await.unwrap();
        drop(sink);

        let mut received = String::new();
        server.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test]
    async fn test_writer_sink_reports_broken_pipe() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);
        let sink = WriterSink::new(client);

        let err = sink.write(b"line\n").await.unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }
}

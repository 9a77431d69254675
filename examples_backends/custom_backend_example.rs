use std::sync::Arc;

use async_trait::async_trait;
use logagent_hook::{
    default_formatter, AsyncHook, FieldValue, Fields, Hook, Level, LogEntry, LogSink, SinkError,
};

/// Example of integrating a completely custom destination by implementing
/// the `LogSink` trait directly. Imagine this talks to some proprietary
/// collector for which this crate does not provide a built-in sink.
struct MyCollectorSink;

#[async_trait]
impl LogSink for MyCollectorSink {
    async fn write(&self, line: &[u8]) -> Result<(), SinkError> {
        // Here you would call your own client library.
        // For the sake of example we just print the record.
        print!("[my-collector] {}", String::from_utf8_lossy(line));
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let mut fields = Fields::new();
    fields.insert("app_id".to_string(), FieldValue::from("custom-backend"));

    let sink: Arc<dyn LogSink> = Arc::new(MyCollectorSink);
    let (hook, handle) = AsyncHook::new(sink, Arc::new(default_formatter(fields))).expect("create hook");

    let _ = hook.fire(&LogEntry::new(Level::Info, "custom backend example started")).await;
    let _ = hook
        .fire(&LogEntry::new(Level::Error, "simulated error sent via custom backend").with_field("db", "my-collector"))
        .await;

    handle.close().await;
}

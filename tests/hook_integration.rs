//! End-to-end tests of the hooks: entry in, newline-delimited JSON out.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use logagent_hook::memory_sink::MemorySink;
use logagent_hook::{
    default_formatter, AsyncHook, FieldValue, Fields, Hook, Level, LogEntry, LogSink,
    LogstashFormatter, SinkError, SyncHook,
};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

fn app_fields() -> Fields {
    let mut fields = Fields::new();
    fields.insert("app_id".to_string(), FieldValue::from("foo"));
    fields
}

/// Sink that takes its time on every write.
struct SlowSink {
    delay: Duration,
    inner: MemorySink,
}

#[async_trait]
impl LogSink for SlowSink {
    async fn write(&self, line: &[u8]) -> Result<(), SinkError> {
        sleep(self.delay).await;
        self.inner.write(line).await
    }
}

#[tokio::test]
async fn test_hello_world_through_async_hook() {
    let sink = MemorySink::new();
    let formatter = LogstashFormatter::new(app_fields());
    let (hook, handle) = AsyncHook::new(Arc::new(sink.clone()), Arc::new(formatter)).unwrap();

    let time = Utc.with_ymd_and_hms(2018, 7, 21, 14, 34, 42).unwrap();
    let entry = LogEntry::new(Level::Info, "Hello World!").at(time);
    hook.fire(&entry).await.unwrap();
    handle.close().await;

    assert_eq!(
        String::from_utf8(sink.contents()).unwrap(),
        "{\"@timestamp\":\"2018-07-21T14:34:42.000Z\",\"@version\":\"1\",\"app_id\":\"foo\",\"level\":\"INFO\",\"message\":\"Hello World!\"}\n"
    );
}

#[tokio::test]
async fn test_every_entry_is_delivered_once_in_order() {
    let sink = MemorySink::new();
    let formatter = default_formatter(app_fields());
    let (hook, handle) = AsyncHook::new(Arc::new(sink.clone()), Arc::new(formatter)).unwrap();

    for i in 0..200 {
        let entry = LogEntry::new(Level::Warn, "tick").with_field("seq", i as i64);
        hook.fire(&entry).await.unwrap();
    }
    handle.close().await;

    let lines = sink.lines();
    assert_eq!(lines.len(), 200);
    for (i, line) in lines.iter().enumerate() {
        let json: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(json["message"], format!("tick seq={i}"));
        for key in ["@timestamp", "level", "message", "@version"] {
            assert!(json.get(key).is_some());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers() {
    let sink = MemorySink::new();
    let formatter = LogstashFormatter::new(Fields::new());
    let (hook, handle) =
        AsyncHook::with_capacity(Arc::new(sink.clone()), Arc::new(formatter), 4096).unwrap();

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let hook = hook.clone();
            tokio::spawn(async move {
                for n in 0..100 {
                    let entry = LogEntry::new(Level::Info, format!("{p}-{n}"));
                    hook.fire(&entry).await.unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }
    handle.close().await;

    let messages: Vec<String> = sink
        .lines()
        .iter()
        .map(|line| {
            let json: serde_json::Value = serde_json::from_str(line).unwrap();
            json["message"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(messages.len(), 800);
    let unique: HashSet<&String> = messages.iter().collect();
    assert_eq!(unique.len(), 800);

    // Per-producer order survives the queue.
    for p in 0..8 {
        let seq: Vec<u32> = messages
            .iter()
            .filter_map(|m| m.strip_prefix(&format!("{p}-")))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(seq, (0..100).collect::<Vec<u32>>());
    }
}

#[tokio::test]
async fn test_capacity_one_with_slow_sink() {
    let inner = MemorySink::new();
    let sink = Arc::new(SlowSink {
        delay: Duration::from_millis(100),
        inner: inner.clone(),
    });
    let formatter = LogstashFormatter::new(Fields::new());
    let (hook, handle) = AsyncHook::with_capacity(sink, Arc::new(formatter), 1).unwrap();

    assert!(hook.fire(&LogEntry::new(Level::Info, "one")).await.is_ok());
    assert!(hook.fire(&LogEntry::new(Level::Info, "two")).await.is_ok());
    handle.close().await;

    let stats = hook.stats();
    assert_eq!(stats.submitted.load(Ordering::Relaxed), 2);
    let lines = inner.lines();
    assert!(!lines.is_empty() && lines.len() <= 2);
    assert_eq!(
        stats.delivered.load(Ordering::Relaxed) + stats.dropped.load(Ordering::Relaxed),
        2
    );
}

#[tokio::test]
async fn test_caller_entry_is_not_modified() {
    let sink = MemorySink::new();
    let (hook, handle) =
        AsyncHook::new(Arc::new(sink.clone()), Arc::new(default_formatter(app_fields()))).unwrap();

    let entry = LogEntry::new(Level::Error, "original").with_field("extra", "value");
    hook.fire(&entry).await.unwrap();
    handle.close().await;

    assert_eq!(entry.message, "original");
    assert_eq!(entry.fields.len(), 1);
    assert_eq!(sink.lines().len(), 1);
    assert!(sink.lines()[0].contains("\"message\":\"original extra=value\""));
}

#[tokio::test]
async fn test_sync_and_async_hooks_write_identical_records() {
    let time = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
    let entry = LogEntry::new(Level::Debug, "same")
        .at(time)
        .with_field("k", "a b");

    let sync_sink = MemorySink::new();
    let sync_hook = SyncHook::new(
        Arc::new(sync_sink.clone()),
        Arc::new(default_formatter(app_fields())),
    );
    sync_hook.fire(&entry).await.unwrap();

    let async_sink = MemorySink::new();
    let (async_hook, handle) = AsyncHook::new(
        Arc::new(async_sink.clone()),
        Arc::new(default_formatter(app_fields())),
    )
    .unwrap();
    async_hook.fire(&entry).await.unwrap();
    handle.close().await;

    assert_eq!(sync_sink.contents(), async_sink.contents());
    assert!(sync_sink.lines()[0].contains("same k=\\\"a b\\\""));
}

#[tokio::test]
#[should_panic(expected = "submit must not be called after stop")]
async fn test_fire_after_stop_panics() {
    let (hook, handle) = AsyncHook::new(
        Arc::new(MemorySink::new()),
        Arc::new(LogstashFormatter::new(Fields::new())),
    )
    .unwrap();
    handle.stop().await;
    let _ = hook.fire(&LogEntry::new(Level::Info, "late")).await;
}

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use logagent_hook::noop_sink::NoopSink;
use logagent_hook::{
    AsyncHook, FieldValue, Fields, Hook, HookConfig, Level, LogEntry, LogstashFormatter,
    OverflowPolicy,
};

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink::default());

    let mut fields = Fields::new();
    fields.insert("app_id".to_string(), FieldValue::from("load-test"));
    let formatter = Arc::new(LogstashFormatter::new(fields).split_extras(true).disable_sorting(true));

    let config = HookConfig {
        queue_capacity: 50_000,
        overflow: OverflowPolicy::Block,
        ..HookConfig::default()
    };
    let (hook, handle) = AsyncHook::with_config(sink, formatter, &config).expect("create hook");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let entry = LogEntry::new(Level::Error, "custom load test error").with_field("iteration", i);
        let _ = hook.fire(&entry).await;
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} entries in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    handle.close().await;
    println!("delivered {}", hook.stats().delivered.load(Ordering::Relaxed));
}

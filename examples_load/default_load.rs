use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use logagent_hook::noop_sink::NoopSink;
use logagent_hook::{default_formatter, AsyncHook, Fields, Hook, Level, LogEntry};

#[tokio::main]
async fn main() {
    let sink = Arc::new(NoopSink::default());
    let formatter = Arc::new(default_formatter(Fields::new()));
    let (hook, handle) = AsyncHook::new(sink, formatter).expect("create hook");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let entry = LogEntry::new(Level::Error, "default load test error").with_field("iteration", i);
        let _ = hook.fire(&entry).await;
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} entries in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    handle.close().await;
    let stats = hook.stats();
    println!("delivered {}, dropped {}",
        stats.delivered.load(Ordering::Relaxed),
        stats.dropped.load(Ordering::Relaxed)
    );
}

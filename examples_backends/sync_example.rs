use std::sync::Arc;

use logagent_hook::{
    DeliveryMode, FieldValue, Fields, Hook, HookConfig, Level, LogEntry, LogHook,
    LogstashFormatter, WriterSink,
};

/// Writes straight to stdout on the calling task; write errors come back
/// from `fire`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(WriterSink::new(tokio::io::stdout()));

    let mut fields = Fields::new();
    fields.insert("app_id".to_string(), FieldValue::from("sync-example"));
    let formatter = Arc::new(LogstashFormatter::new(fields));

    let config = HookConfig {
        mode: DeliveryMode::Sync,
        ..HookConfig::default()
    };
    let (hook, _handle) = LogHook::build(sink, formatter, &config)?;

    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    hook.fire(
        &LogEntry::new(Level::Warn, "request failed")
            .with_field("error", FieldValue::error(err))
            .with_field("attempt", 3i64),
    )
    .await?;
    Ok(())
}

use std::sync::Arc;

use logagent_hook::env::env_or;
use logagent_hook::init::init_tracing_with_config;
use logagent_hook::{FieldValue, Fields, HookConfig, LogstashFormatter, WriterSink};
use tokio::io::BufWriter;
use tokio::net::TcpStream;
use tracing::{error, info};

/// Ships every `tracing` event to a Logstash TCP input
/// (`codec => json_lines`). Dialing the connection is up to the
/// application; the hook only writes to it.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = env_or("LOGSTASH_ADDR", "127.0.0.1:5000");
    let stream = TcpStream::connect(&addr).await?;
    let sink = Arc::new(WriterSink::new(BufWriter::new(stream)));

    let mut fields = Fields::new();
    fields.insert("app_id".to_string(), FieldValue::from("tcp-example"));
    let formatter = Arc::new(LogstashFormatter::new(fields));

    let handle = init_tracing_with_config(sink, formatter, HookConfig::from_env()?)?;

    info!("starting service");
    error!(user_id = 42, reason = "invalid password", "authentication failed");

    // Deliver what is queued and flush the buffered writer.
    handle.close().await;
    Ok(())
}

use crate::entry::{FieldValue, Fields, Level, LogEntry};
use crate::hook::AsyncHook;
use crate::queue::DIAGNOSTICS_TARGET;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns every event into a [`LogEntry`]
/// and hands it to an [`AsyncHook`].
///
/// The hook is fed through [`AsyncHook::try_fire`], so the application
/// thread never waits on the queue or the sink: when the queue is full the
/// entry is dropped. Level filtering is left to the subscriber stack.
///
/// Events recorded after the hook's queue has been stopped panic, like any
/// other submit after stop.
pub struct HookLayer {
    hook: AsyncHook,
    /// Events skipped because they came from this crate.
    pub skipped_events: Arc<AtomicU64>,
}

impl HookLayer {
    pub fn new(hook: AsyncHook) -> Self {
        HookLayer {
            hook,
            skipped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn hook(&self) -> &AsyncHook {
        &self.hook
    }
}

impl<S> Layer<S> for HookLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // The queue and worker log through `tracing` too; forwarding those
        // events would feed the queue from itself.
        if meta.target() == DIAGNOSTICS_TARGET {
            self.skipped_events.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let mut fields = Fields::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);

        let entry = LogEntry {
            message: message.unwrap_or_default(),
            level: Level::from(*meta.level()),
            timestamp: Utc::now(),
            fields,
        };

        self.hook.try_fire(&entry);
    }
}

/// Collects event fields into a [`Fields`] map, pulling out `message`.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut Fields,
    pub message: &'a mut Option<String>,
}

impl FieldVisitor<'_> {
    fn insert(&mut self, field: &Field, value: impl Into<FieldValue>) {
        self.fields.insert(field.name().to_string(), value.into());
    }
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, format!("{:?}", value));
        }
    }
}

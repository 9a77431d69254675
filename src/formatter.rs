use crate::entry::{FieldValue, Fields, LogEntry};
use crate::pool::EntryPool;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Key holding the record time.
pub const FIELD_KEY_TIME: &str = "@timestamp";
/// Key holding the (possibly extended) message text.
pub const FIELD_KEY_MSG: &str = "message";
/// Key holding the upper-case level name.
pub const FIELD_KEY_LEVEL: &str = "level";
/// Entry key that is always kept as a top-level field, even in split mode.
pub const FIELD_KEY_CATEGORY: &str = "category";
/// Logstash event schema version key.
pub const FIELD_KEY_VERSION: &str = "@version";

/// `strftime` pattern of `@timestamp`: UTC, millisecond precision.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Error returned when an entry cannot be turned into a wire record.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to marshal fields to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Turns a [`LogEntry`] into the bytes written to a sink.
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry) -> Result<Vec<u8>, FormatError>;
}

/// Logstash JSON formatter.
///
/// Produces one JSON object per entry followed by `\n`, with `@timestamp`,
/// `level`, `message` and `@version` plus the configured static fields and
/// the entry's own fields.
///
/// With [`split_extras`](Self::split_extras) enabled only entry fields that
/// match a static field (or are named `category`) become JSON keys. Every
/// other field is appended to the message as a ` key=value` token.
#[derive(Debug, Clone)]
pub struct LogstashFormatter {
    fields: Fields,
    split_extras: bool,
    quote_empty_fields: bool,
    disable_sorting: bool,
    pool: Arc<EntryPool>,
}

/// Formatter with split extras enabled, the classic Logstash agent layout.
///
/// `@version` defaults to `"1"` unless `fields` sets it.
pub fn default_formatter(fields: Fields) -> LogstashFormatter {
    LogstashFormatter::new(fields).split_extras(true)
}

impl LogstashFormatter {
    /// Create a formatter that merges every entry field into the output.
    pub fn new(mut fields: Fields) -> Self {
        fields
            .entry(FIELD_KEY_VERSION.to_string())
            .or_insert_with(|| FieldValue::from("1"));

        LogstashFormatter {
            fields,
            split_extras: false,
            quote_empty_fields: false,
            disable_sorting: false,
            pool: Arc::new(EntryPool::new()),
        }
    }

    pub fn split_extras(mut self, enabled: bool) -> Self {
        self.split_extras = enabled;
        self
    }

    /// Quote empty extras values (`key=""`) instead of writing `key=`.
    pub fn quote_empty_fields(mut self, enabled: bool) -> Self {
        self.quote_empty_fields = enabled;
        self
    }

    /// Append extras in map iteration order instead of sorted by key.
    pub fn disable_sorting(mut self, disabled: bool) -> Self {
        self.disable_sorting = disabled;
        self
    }

    /// Share an entry pool with other formatters.
    pub fn with_pool(mut self, pool: Arc<EntryPool>) -> Self {
        self.pool = pool;
        self
    }

    pub fn static_fields(&self) -> &Fields {
        &self.fields
    }

    pub fn pool(&self) -> &Arc<EntryPool> {
        &self.pool
    }

    fn keeps_as_field(&self, key: &str) -> bool {
        !self.split_extras || key == FIELD_KEY_CATEGORY || self.fields.contains_key(key)
    }

    fn needs_quoting(&self, text: &str) -> bool {
        if self.quote_empty_fields && text.is_empty() {
            return true;
        }
        !text.chars().all(|ch| {
            ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '/' | '@' | '^' | '+')
        })
    }

    fn append_key_value(&self, buf: &mut String, key: &str, value: &FieldValue) {
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(key);
        buf.push('=');

        let text = value.to_text();
        if self.needs_quoting(&text) {
            // Writing into a String cannot fail.
            let _ = write!(buf, "{:?}", text.as_ref());
        } else {
            buf.push_str(&text);
        }
    }
}

impl Formatter for LogstashFormatter {
    fn format(&self, entry: &LogEntry) -> Result<Vec<u8>, FormatError> {
        // Returned to the pool when `record` goes out of scope, on every path.
        let mut record = self.pool.acquire();
        record.fill(entry, &self.fields);

        // Keys are written in sorted order whatever serde_json features the
        // build enables.
        let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        let mut extras: Vec<(String, FieldValue)> = Vec::new();
        for (key, value) in record.data.drain() {
            if self.keeps_as_field(&key) {
                data.insert(key, value.into_json());
            } else {
                extras.push((key, value));
            }
        }

        data.insert(
            FIELD_KEY_TIME.to_string(),
            record.timestamp.format(TIME_FORMAT).to_string().into(),
        );
        data.insert(
            FIELD_KEY_LEVEL.to_string(),
            record.level.wire_name().into(),
        );

        let message = if extras.is_empty() {
            std::mem::take(&mut record.message)
        } else {
            if !self.disable_sorting {
                extras.sort_by(|a, b| a.0.cmp(&b.0));
            }
            let mut buf = std::mem::take(&mut record.message);
            for (key, value) in &extras {
                self.append_key_value(&mut buf, key, value);
            }
            buf
        };
        data.insert(FIELD_KEY_MSG.to_string(), message.into());

        let mut serialized = serde_json::to_vec(&data)?;
        serialized.push(b'\n');
        Ok(serialized)
    }
}

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Severity of a [`LogEntry`], ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    Panic,
    Fatal,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Level {
    /// Every level, most severe first.
    pub const ALL: [Level; 7] = [
        Level::Panic,
        Level::Fatal,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
    ];

    /// Upper-case name written to the `level` key.
    ///
    /// The wire vocabulary only knows six levels; anything outside it
    /// (currently `Trace`) is written as `UNKNOWN`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Panic => "PANIC",
            _ => "UNKNOWN",
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG => Level::Debug,
            _ => Level::Trace,
        }
    }
}

/// Value attached to a field of a [`LogEntry`].
///
/// Errors are kept as a separate variant because they have no JSON
/// representation of their own; the formatter writes their `Display` text.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Value(serde_json::Value),
    Error(Arc<dyn Error + Send + Sync>),
}

impl FieldValue {
    /// Wrap an error so it is rendered through its description.
    pub fn error<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        FieldValue::Error(Arc::new(err))
    }

    /// Convert into the JSON value that ends up in the formatted record.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            FieldValue::Value(value) => value,
            FieldValue::Error(err) => serde_json::Value::String(err.to_string()),
        }
    }

    /// Plain text form used for `key=value` tokens.
    ///
    /// Strings are returned as-is; other JSON values use their compact JSON
    /// text (`42`, `true`, `null`, `[1,2]`).
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Value(serde_json::Value::String(s)) => Cow::Borrowed(s),
            FieldValue::Value(value) => Cow::Owned(value.to_string()),
            FieldValue::Error(err) => Cow::Owned(err.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(serde_json::Value::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(serde_json::Value::String(value))
    }
}

macro_rules! field_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::Value(serde_json::Value::from(value))
                }
            }
        )*
    };
}

field_value_from!(bool, i32, i64, u32, u64, f64);

/// Field map carried by an entry. Iteration order is unspecified.
pub type Fields = HashMap<String, FieldValue>;

/// One structured log event as produced by the calling application.
///
/// The delivery pipeline only ever reads an entry or clones it; the
/// caller's value is never modified.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub message: String,
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    pub fields: Fields,
}

impl LogEntry {
    /// Create an entry stamped with the current time and no fields.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogEntry {
            message: message.into(),
            level,
            timestamp: Utc::now(),
            fields: Fields::new(),
        }
    }

    /// Replace the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add or overwrite a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(Level::Debug.wire_name(), "DEBUG");
        assert_eq!(Level::Info.wire_name(), "INFO");
        assert_eq!(Level::Warn.wire_name(), "WARN");
        assert_eq!(Level::Error.wire_name(), "ERROR");
        assert_eq!(Level::Fatal.wire_name(), "FATAL");
        assert_eq!(Level::Panic.wire_name(), "PANIC");
        assert_eq!(Level::Trace.wire_name(), "UNKNOWN");
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(Level::from(tracing::Level::ERROR), Level::Error);
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Trace);
    }

    #[test]
    fn test_error_value_renders_description() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let value = FieldValue::error(err);
        assert_eq!(value.to_text(), "disk on fire");
        assert_eq!(value.into_json(), serde_json::json!("disk on fire"));
    }

    #[test]
    fn test_text_of_non_string_values() {
        assert_eq!(FieldValue::from(42i64).to_text(), "42");
        assert_eq!(FieldValue::from(true).to_text(), "true");
        assert_eq!(FieldValue::from(serde_json::Value::Null).to_text(), "null");
        assert_eq!(FieldValue::from(serde_json::json!([1, 2])).to_text(), "[1,2]");
        assert_eq!(FieldValue::from("plain").to_text(), "plain");
    }

    #[test]
    fn test_clone_is_independent_of_original() {
        let original = LogEntry::new(Level::Warn, "hi").with_field("a", 1i64);
        let mut copy = original.clone();
        copy.fields.insert("b".to_string(), 2i64.into());
        copy.message.push_str(" there");

        assert_eq!(original.fields.len(), 1);
        assert_eq!(original.message, "hi");
    }
}

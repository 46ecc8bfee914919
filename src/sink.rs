//! Structured logging sink.
//!
//! The middleware talks to its sink through three calls and nothing else:
//!
//! ```text
//! sink.with_name("GIN")                  ← once, at construction
//! sink.error(&last_error, "a b c")       ← request carried errors
//! sink.info(verbosity, path, &fields)    ← everything else
//! ```
//!
//! [`TracingSink`] routes those calls into `tracing`. Implement [`LogSink`]
//! yourself to log somewhere else, or to capture records in tests.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A leveled, structured logger.
///
/// Implementations own every failure mode (encoding, I/O, transport); none
/// of these methods can report an error back to the caller.
pub trait LogSink: Send + Sync + 'static {
    /// Returns a sink whose records carry `name` appended to this sink's name.
    fn with_name(&self, name: &str) -> Self
    where
        Self: Sized;

    /// Error-level record.
    fn error(&self, err: &(dyn StdError + 'static), message: &str);

    /// Info record at verbosity `level`. Higher is chattier; 0 is always shown.
    fn info(&self, level: u8, message: &str, fields: &[Field]);
}

// ── Field / Value ─────────────────────────────────────────────────────────────

/// One key/value pair of a structured record.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: &'static str,
    pub value: Value,
}

impl Field {
    pub fn new(key: &'static str, value: impl Into<Value>) -> Self {
        Self { key, value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Duration(Duration),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            // Debug gives the human form: `1.234ms`, `2s`, `350ns`.
            Self::Duration(d) => write!(f, "{d:?}"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Self::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Renders fields as `key=value key="two words"`.
pub struct Logfmt<'a>(pub &'a [Field]);

impl fmt::Display for Logfmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let value = field.value.to_string();
            if needs_quotes(&value) {
                write!(f, "{}={:?}", field.key, value)?;
            } else {
                write!(f, "{}={}", field.key, value)?;
            }
        }
        Ok(())
    }
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}

// ── TracingSink ───────────────────────────────────────────────────────────────

/// [`LogSink`] backed by the `tracing` macros.
///
/// Verbosity maps onto tracing levels: 0 → `INFO`, 1 → `DEBUG`, 2 and up →
/// `TRACE`. Every event carries a `logger` field holding the name chain built
/// by [`with_name`](LogSink::with_name), joined with `/`.
#[derive(Clone, Debug, Default)]
pub struct TracingSink {
    name: Option<Arc<str>>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

impl LogSink for TracingSink {
    fn with_name(&self, name: &str) -> Self {
        let name = match &self.name {
            Some(parent) => format!("{parent}/{name}"),
            None => name.to_owned(),
        };
        Self { name: Some(Arc::from(name)) }
    }

    fn error(&self, err: &(dyn StdError + 'static), message: &str) {
        tracing::error!(logger = self.name(), error = %err, "{message}");
    }

    fn info(&self, level: u8, message: &str, fields: &[Field]) {
        let logger = self.name();
        let fields = Logfmt(fields);
        match level {
            0 => tracing::info!(logger, fields = %fields, "{message}"),
            1 => tracing::debug!(logger, fields = %fields, "{message}"),
            _ => tracing::trace!(logger, fields = %fields, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_chain() {
        let sink = TracingSink::new();
        assert_eq!(sink.name(), "");
        let gin = sink.with_name("GIN");
        assert_eq!(gin.name(), "GIN");
        assert_eq!(gin.with_name("access").name(), "GIN/access");
        // the parent is untouched
        assert_eq!(sink.name(), "");
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::from("GET").to_string(), "GET");
        assert_eq!(Value::from(404u16).to_string(), "404");
        assert_eq!(Value::from(Duration::from_micros(1500)).to_string(), "1.5ms");
    }

    #[test]
    fn logfmt_quotes_when_needed() {
        let fields = [
            Field::new("status", 200u16),
            Field::new("query", ""),
            Field::new("user-agent", "curl/8.4 (x86_64)"),
            Field::new("path", "/a=b"),
        ];
        assert_eq!(
            Logfmt(&fields).to_string(),
            r#"status=200 query="" user-agent="curl/8.4 (x86_64)" path="/a=b""#
        );
    }
}

//! Unified error type.

/// The error type returned by reqlogr's fallible operations.
///
/// Logging itself never fails from the middleware's point of view: whatever
/// goes wrong inside a [`LogSink`](crate::LogSink) stays inside the sink.
/// This type only surfaces mistakes made while building configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `strftime` pattern chrono cannot render.
    #[error("invalid time format `{0}`")]
    InvalidTimeFormat(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

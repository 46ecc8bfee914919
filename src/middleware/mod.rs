//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns. This module holds the request logger: one record
//! per request with method, path, query, status, client address, user agent
//! and latency, or one error record when handlers attached errors.
//!
//! Two ways to plug it in:
//!
//! - [`RequestLogger::wrap`] returns a [`Logged`] hyper service. Nothing else
//!   to do; the context is read straight off `http` types.
//! - [`RequestLogger::start`] / [`RequestLogger::finish`] (or
//!   [`RequestLogger::around`]) for any other pipeline, given a
//!   [`RequestContext`](crate::RequestContext) implementation.

mod logger;
mod service;

pub use logger::{LOGGER_NAME, RequestLogger, RequestStart};
pub use service::{BoxFuture, CLIENT_CLOSED_REQUEST, HttpContext, Logged, ResponseErrors};

//! # reqlogr
//!
//! Request-logging middleware for hyper services. One structured record per
//! request, handed to a pluggable sink. Nothing more.
//!
//! ## What gets logged
//!
//! A request that finished cleanly produces one info record whose message is
//! the path, carrying these fields in this order:
//!
//! | Field | Value |
//! |---|---|
//! | `time` | completion time, RFC 3339 by default |
//! | `status` | response status code |
//! | `method` | request method |
//! | `path` | request path |
//! | `query` | raw query string, possibly empty |
//! | `ip` | client address, proxy headers honoured |
//! | `user-agent` | `User-Agent` header |
//! | `latency` | time spent downstream |
//!
//! A request whose handlers attached errors produces one error record
//! instead: the last error, with every error's message joined by spaces.
//! Paths listed in [`LoggerConfig::skip_paths`] produce nothing.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::convert::Infallible;
//!
//! use hyper::service::service_fn;
//! use reqlogr::{LoggerConfig, RequestLogger, ResponseErrors, TracingSink};
//!
//! let config = LoggerConfig::default().utc(true).skip("/healthz");
//! let logger = RequestLogger::with_config(TracingSink::new(), config);
//!
//! let app = logger.wrap(service_fn(|req: http::Request<hyper::body::Incoming>| async move {
//!     let mut res = http::Response::new(String::new());
//!     if req.uri().path() == "/fail" {
//!         *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
//!         res.push_error("database unavailable");
//!     }
//!     Ok::<_, Infallible>(res)
//! }));
//! // hand `app` to hyper-util's connection builder
//! # let _ = app;
//! ```

mod client_ip;
mod config;
mod context;
mod error;
mod sink;

pub mod middleware;

pub use client_ip::{ClientIpPolicy, RemoteAddr, Trust};
pub use config::{LoggerConfig, TimeFormat};
pub use context::{ErrorList, RequestContext, RequestError};
pub use error::{Error, Result};
pub use middleware::{HttpContext, Logged, RequestLogger, ResponseErrors};
pub use sink::{Field, LogSink, Logfmt, TracingSink, Value};

//! The request logger itself.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::config::LoggerConfig;
use crate::context::RequestContext;
use crate::sink::{Field, LogSink};

/// Name every record from this middleware is tagged with.
pub const LOGGER_NAME: &str = "GIN";

/// Logs one record per completed request.
///
/// Cloning is one `Arc` increment; every clone shares the same sink, config
/// and skip set, none of which change after construction.
pub struct RequestLogger<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    sink: S,
    config: LoggerConfig,
    skip: HashSet<String>,
}

/// What the logger remembers about a request while it is in flight.
///
/// Path and query are copied out of the request before it is handed
/// downstream, so nothing a handler does to the URI changes what is logged.
#[derive(Clone, Debug)]
pub struct RequestStart {
    at: Instant,
    path: String,
    query: String,
}

impl RequestStart {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl<S: LogSink> RequestLogger<S> {
    /// Default configuration: local time, RFC 3339, verbosity 0, nothing skipped.
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, LoggerConfig::default())
    }

    pub fn with_config(sink: S, config: LoggerConfig) -> Self {
        let skip = config.skip_paths.iter().cloned().collect();
        let inner = Inner { sink: sink.with_name(LOGGER_NAME), config, skip };
        Self { inner: Arc::new(inner) }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    pub fn sink(&self) -> &S {
        &self.inner.sink
    }

    pub fn is_skipped(&self, path: &str) -> bool {
        self.inner.skip.contains(path)
    }

    /// First half of the contract: call before handing the request downstream.
    pub fn start(&self, ctx: &impl RequestContext) -> RequestStart {
        RequestStart {
            at: Instant::now(),
            path: ctx.path().to_owned(),
            query: ctx.raw_query().to_owned(),
        }
    }

    /// Second half: call once downstream has returned. Emits at most one record.
    pub fn finish(&self, start: RequestStart, ctx: &impl RequestContext) {
        if self.is_skipped(&start.path) {
            return;
        }

        let latency = start.at.elapsed();
        let time = self.stamp(Local::now());

        let errors = ctx.errors();
        if let Some(last) = errors.last() {
            self.inner.sink.error(&**last, &errors.joined());
            return;
        }

        let ip = ctx.client_ip().map(|ip| ip.to_string()).unwrap_or_default();
        let fields = [
            Field::new("time", time),
            Field::new("status", ctx.status()),
            Field::new("method", ctx.method()),
            Field::new("path", start.path.as_str()),
            Field::new("query", start.query),
            Field::new("ip", ip),
            Field::new("user-agent", ctx.user_agent()),
            Field::new("latency", latency),
        ];
        self.inner.sink.info(self.inner.config.verbosity, &start.path, &fields);
    }

    /// Runs `next` between [`start`](Self::start) and [`finish`](Self::finish).
    ///
    /// For hosts whose chain takes the context by value and hands it back:
    ///
    /// ```rust
    /// # use reqlogr::{RequestContext, RequestLogger, TracingSink};
    /// # async fn demo<C: RequestContext>(ctx: C) -> C {
    /// let logger = RequestLogger::new(TracingSink::new());
    /// logger.around(ctx, |ctx| async move {
    ///     // handlers run here
    ///     ctx
    /// }).await
    /// # }
    /// ```
    pub async fn around<C, N, Fut>(&self, ctx: C, next: N) -> C
    where
        C: RequestContext,
        N: FnOnce(C) -> Fut,
        Fut: Future<Output = C>,
    {
        let start = self.start(&ctx);
        let ctx = next(ctx).await;
        self.finish(start, &ctx);
        ctx
    }

    /// Formats the completion time. UTC conversion only touches the rendering.
    pub(crate) fn stamp<Tz>(&self, end: DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let format = &self.inner.config.time_format;
        if self.inner.config.utc {
            format.render(&end.with_timezone(&Utc))
        } else {
            format.render(&end)
        }
    }
}

impl<S> Clone for RequestLogger<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> fmt::Debug for RequestLogger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogger")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

//! hyper binding.
//!
//! [`Logged`] wraps any `hyper::service::Service` that turns an
//! `http::Request` into an `http::Response`:
//!
//! ```text
//! request ──▶ Logged::call ──snapshot──▶ HttpContext
//!                │                          │
//!                ▼                          │
//!          inner.call(req)                  │
//!                │ response                 │
//!                ▼                          ▼
//!          status + ErrorList ──────▶ RequestLogger::finish
//! ```
//!
//! The snapshot is taken while `call` runs, before the returned future is
//! ever polled. That makes the "request dropped before it finished" case
//! loggable too: the future owns a `Pending` guard whose `Drop` emits the
//! record with whatever the context holds at that point.

use std::error::Error as StdError;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;

use http::header::USER_AGENT;
use http::{Request, Response};
use hyper::service::Service;
use percent_encoding::percent_decode_str;

use crate::client_ip::{ClientIpPolicy, RemoteAddr};
use crate::context::{ErrorList, RequestContext};
use crate::middleware::logger::{RequestLogger, RequestStart};
use crate::sink::LogSink;

/// Status logged for a request whose future was dropped before the inner
/// service produced a response (nginx's "client closed request").
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// A heap-allocated future resolving to the inner service's result.
///
/// `Send + 'static` so hyper-util's executor can move it across threads.
pub type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

// ── Attaching errors ──────────────────────────────────────────────────────────

/// Lets handlers attach request-scoped errors to the response they return.
///
/// ```rust
/// use reqlogr::ResponseErrors;
///
/// let mut res = http::Response::new(());
/// *res.status_mut() = http::StatusCode::BAD_GATEWAY;
/// res.push_error("upstream timed out");
/// ```
pub trait ResponseErrors {
    fn push_error(&mut self, err: impl Into<Box<dyn StdError + Send + Sync + 'static>>);

    fn errors(&self) -> Option<&ErrorList>;
}

impl<B> ResponseErrors for Response<B> {
    fn push_error(&mut self, err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) {
        let extensions = self.extensions_mut();
        match extensions.get_mut::<ErrorList>() {
            Some(list) => list.push(err),
            None => {
                let mut list = ErrorList::new();
                list.push(err);
                extensions.insert(list);
            }
        }
    }

    fn errors(&self) -> Option<&ErrorList> {
        self.extensions().get::<ErrorList>()
    }
}

// ── HttpContext ───────────────────────────────────────────────────────────────

/// [`RequestContext`] over an `http` request/response pair.
#[derive(Clone, Debug)]
pub struct HttpContext {
    path: String,
    query: String,
    method: String,
    user_agent: String,
    client_ip: Option<IpAddr>,
    status: u16,
    errors: ErrorList,
}

impl HttpContext {
    /// Snapshots the request side. Status starts at [`CLIENT_CLOSED_REQUEST`]
    /// until [`complete`](Self::complete) sees a response.
    ///
    /// The path is percent-decoded (skip matching and the logged path see
    /// `/a b`, not `/a%20b`); the query is kept exactly as sent.
    pub fn from_request<B>(req: &Request<B>, policy: &ClientIpPolicy) -> Self {
        let remote = req.extensions().get::<RemoteAddr>().map(|r| r.0);
        Self {
            path: percent_decode_str(req.uri().path()).decode_utf8_lossy().into_owned(),
            query: req.uri().query().unwrap_or_default().to_owned(),
            method: req.method().as_str().to_owned(),
            user_agent: req
                .headers()
                .get(USER_AGENT)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .unwrap_or_default(),
            client_ip: policy.resolve(remote, req.headers()),
            status: CLIENT_CLOSED_REQUEST,
            errors: ErrorList::new(),
        }
    }

    /// Fills in the response side.
    pub fn complete<B>(&mut self, res: &Response<B>) {
        self.status = res.status().as_u16();
        if let Some(errors) = res.errors() {
            self.errors = errors.clone();
        }
    }

    /// Records a failure of the inner service itself.
    pub fn fail(&mut self, err: &(dyn StdError + 'static)) {
        self.errors.push(err.to_string());
    }
}

impl RequestContext for HttpContext {
    fn path(&self) -> &str { &self.path }
    fn raw_query(&self) -> &str { &self.query }
    fn method(&self) -> &str { &self.method }
    fn status(&self) -> u16 { self.status }
    fn client_ip(&self) -> Option<IpAddr> { self.client_ip }
    fn user_agent(&self) -> &str { &self.user_agent }
    fn errors(&self) -> &ErrorList { &self.errors }
}

// ── Pending ───────────────────────────────────────────────────────────────────

/// Drop guard owning one in-flight request. Logs exactly once, on drop.
struct Pending<S: LogSink> {
    logger: RequestLogger<S>,
    start: Option<RequestStart>,
    ctx: HttpContext,
}

impl<S: LogSink> Drop for Pending<S> {
    fn drop(&mut self) {
        if let Some(start) = self.start.take() {
            self.logger.finish(start, &self.ctx);
        }
    }
}

// ── Logged ────────────────────────────────────────────────────────────────────

/// A hyper service that logs every request passing through `inner`.
///
/// Build one with [`RequestLogger::wrap`].
pub struct Logged<S, H> {
    logger: RequestLogger<S>,
    inner: H,
    policy: ClientIpPolicy,
}

impl<S: LogSink, H> Logged<S, H> {
    pub fn new(logger: RequestLogger<S>, inner: H) -> Self {
        Self { logger, inner, policy: ClientIpPolicy::default() }
    }

    /// Replaces the default client address policy (trust every proxy).
    pub fn client_ip(mut self, policy: ClientIpPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn get_ref(&self) -> &H {
        &self.inner
    }
}

impl<S: LogSink> RequestLogger<S> {
    /// Wraps a hyper service so each request through it is logged.
    pub fn wrap<H>(&self, inner: H) -> Logged<S, H> {
        Logged::new(self.clone(), inner)
    }
}

impl<S, H: Clone> Clone for Logged<S, H> {
    fn clone(&self) -> Self {
        Self {
            logger: self.logger.clone(),
            inner: self.inner.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S, H, B, RB> Service<Request<B>> for Logged<S, H>
where
    S: LogSink,
    H: Service<Request<B>, Response = Response<RB>>,
    H::Error: StdError + Send + 'static,
    H::Future: Send + 'static,
    RB: Send + 'static,
{
    type Response = Response<RB>;
    type Error = H::Error;
    type Future = BoxFuture<Response<RB>, H::Error>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let ctx = HttpContext::from_request(&req, &self.policy);
        let start = self.logger.start(&ctx);
        let mut pending = Pending { logger: self.logger.clone(), start: Some(start), ctx };
        let fut = self.inner.call(req);

        Box::pin(async move {
            let result = fut.await;
            match &result {
                Ok(res) => pending.ctx.complete(res),
                Err(err) => pending.ctx.fail(err),
            }
            drop(pending);
            result
        })
    }
}

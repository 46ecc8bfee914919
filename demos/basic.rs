//! Minimal reqlogr example — a hyper server with access logging.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42?fields=name
//!   curl http://localhost:3000/fail
//!   curl -H 'x-forwarded-for: 203.0.113.7' http://localhost:3000/users/1
//!   curl http://localhost:3000/healthz        ← not logged

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::{Service, service_fn};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use reqlogr::{LoggerConfig, RemoteAddr, RequestLogger, ResponseErrors, TracingSink};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = LoggerConfig::default()
        .utc(true)
        .skip("/healthz")
        .skip("/readyz");
    let app = RequestLogger::with_config(TracingSink::new(), config).wrap(service_fn(route));

    let addr: SocketAddr = "0.0.0.0:3000".parse()?;
    let listener = TcpListener::bind(addr).await?;
    let server = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    info!(%addr, "listening, Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("accept failed: {e}");
                    continue;
                }
            },
            _ = &mut ctrl_c => break,
        };

        let app = app.clone();
        // Each request learns its TCP peer here; the logger resolves `ip` from it.
        let svc = service_fn(move |mut req: Request<Incoming>| {
            req.extensions_mut().insert(RemoteAddr(peer));
            app.call(req)
        });

        let conn = server.serve_connection_with_upgrades(TokioIo::new(stream), svc);
        let conn = graceful.watch(conn.into_owned());
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!(%peer, "connection closed with error: {e}");
            }
        });
    }

    info!("draining open connections");
    if tokio::time::timeout(Duration::from_secs(10), graceful.shutdown()).await.is_err() {
        warn!("drain timed out, exiting anyway");
    }
    Ok(())
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    let res = match path {
        "/healthz" => text(StatusCode::OK, "ok"),
        "/readyz" => text(StatusCode::OK, "ready"),
        "/fail" => {
            let mut res = text(StatusCode::SERVICE_UNAVAILABLE, "try later");
            res.push_error("database unavailable");
            res.push_error("retry budget exhausted");
            res
        }
        _ => match path.strip_prefix("/users/") {
            Some(id) => {
                let body = format!(r#"{{"id":"{id}","name":"alice"}}"#);
                text(StatusCode::OK, body)
            }
            None => text(StatusCode::NOT_FOUND, "not found"),
        },
    };
    Ok(res)
}

fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut res = Response::new(Full::new(body.into()));
    *res.status_mut() = status;
    res
}

//! What actually reaches a `tracing` subscriber through `TracingSink`.

use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::service::{Service, service_fn};
use reqlogr::{LoggerConfig, RequestLogger, ResponseErrors, TracingSink};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.lock().unwrap());
        String::from_utf8(bytes).unwrap()
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Buffer {
    type Writer = Buffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn subscriber(buffer: Buffer, max: Level) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(buffer)
        .with_max_level(max)
        .with_ansi(false)
        .finish()
}

type Body = Full<Bytes>;

async fn app(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let mut res = Response::new(Full::new(Bytes::new()));
    if req.uri().path() == "/example-error" {
        *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        res.push_error("lorem");
    }
    Ok(res)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Full::new(Bytes::new())).unwrap()
}

#[tokio::test]
async fn writes_status_and_errors() {
    let buffer = Buffer::default();
    let _guard = tracing::subscriber::set_default(subscriber(buffer.clone(), Level::TRACE));

    let svc = RequestLogger::new(TracingSink::new()).wrap(service_fn(app));

    svc.call(get("/example")).await.unwrap();
    let line = buffer.take();
    assert!(line.contains(" INFO "), "{line}");
    assert!(line.contains("status=200"), "{line}");
    assert!(line.contains("path=/example"), "{line}");
    assert!(line.contains(r#"logger="GIN""#), "{line}");

    svc.call(get("/example-error")).await.unwrap();
    let line = buffer.take();
    assert!(line.contains("ERROR"), "{line}");
    assert!(line.contains("lorem"), "{line}");
    assert!(!line.contains("status="), "{line}");
}

#[tokio::test]
async fn verbosity_maps_to_levels() {
    let buffer = Buffer::default();
    let _guard = tracing::subscriber::set_default(subscriber(buffer.clone(), Level::INFO));

    let quiet = RequestLogger::with_config(TracingSink::new(), LoggerConfig::default().verbosity(1))
        .wrap(service_fn(app));
    quiet.call(get("/debug-only")).await.unwrap();
    assert_eq!(buffer.take(), "", "verbosity 1 is DEBUG and filtered at INFO");

    // errors are never subject to verbosity
    quiet.call(get("/example-error")).await.unwrap();
    assert!(buffer.take().contains("lorem"));
}

//! Local target servers and test doubles shared by the integration tests.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use request_relay::infra::{DnsResolver, DnsResult};
use request_relay::RelayError;
use serde_json::{json, Map, Value};
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::net::TcpListener;

/// Resolves every `*.test` host to loopback and counts lookups.
#[derive(Debug, Clone, Default)]
pub struct LoopbackResolver {
    lookups: Arc<AtomicUsize>,
}

impl LoopbackResolver {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DnsResolver for LoopbackResolver {
    async fn resolve(&self, host: &str) -> Result<DnsResult, RelayError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if host.ends_with(".test") {
            Ok(DnsResult {
                ips: vec![IpAddr::V4(Ipv4Addr::LOCALHOST)],
            })
        } else if let Ok(ip) = host.parse::<IpAddr>() {
            Ok(DnsResult { ips: vec![ip] })
        } else {
            Err(RelayError::Dns(format!("{}: no such host", host)))
        }
    }
}

/// Reports back what the target received.
async fn inspect(request: Request) -> Json<Value> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();

    let mut headers = Map::new();
    for (name, value) in &parts.headers {
        headers.insert(
            name.to_string(),
            Value::String(value.to_str().unwrap_or_default().to_string()),
        );
    }

    Json(json!({
        "method": parts.method.as_str(),
        "query": parts.uri.query().unwrap_or(""),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn echo(headers: HeaderMap, body: Body) -> Response {
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or(header::HeaderValue::from_static("application/json"));
    (StatusCode::CREATED, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn gzipped_json() -> Response {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(br#"{"zipped":true}"#).unwrap();
    let compressed = encoder.finish().unwrap();
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_ENCODING, "gzip"),
        ],
        compressed,
    )
        .into_response()
}

fn redirect(status: StatusCode, location: &'static str) -> Response {
    (status, [(header::LOCATION, location)]).into_response()
}

#[derive(serde::Deserialize)]
struct Hop {
    to: String,
}

/// Redirects to whatever `?to=` names, possibly on another origin.
async fn hop(Query(hop): Query<Hop>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, hop.to)]).into_response()
}

pub fn target_app() -> Router {
    Router::new()
        .route("/todos/1", get(|| async { Json(json!({"id": 1})) }))
        .route("/echo", post(echo))
        .route("/inspect", any(inspect))
        .route(
            "/missing",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    [(header::CONTENT_TYPE, "text/plain")],
                    "not found",
                )
            }),
        )
        .route(
            "/broken",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{oops") }),
        )
        .route("/gzip", get(|| async { gzipped_json() }))
        .route(
            "/cookies",
            get(|| async {
                let mut headers = HeaderMap::new();
                headers.append(header::SET_COOKIE, "a=1".parse().unwrap());
                headers.append(header::SET_COOKIE, "b=2".parse().unwrap());
                (headers, "cookies")
            }),
        )
        .route("/redirect", get(|| async { redirect(StatusCode::FOUND, "/todos/1") }))
        .route("/hop", any(hop))
        .route("/loop", get(|| async { redirect(StatusCode::FOUND, "/loop") }))
        .route(
            "/see-other",
            post(|| async { redirect(StatusCode::SEE_OTHER, "/inspect") }),
        )
}

/// Serves `app` on an ephemeral loopback port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn spawn_target() -> SocketAddr {
    serve(target_app()).await
}

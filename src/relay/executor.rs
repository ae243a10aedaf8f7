//! Outbound request execution.
//!
//! Validates a `RequestSpec`, opens one connection to the target (plain TCP or
//! TLS), performs a single HTTP/1.1 exchange and hands the raw response to the
//! response builder. Every failure is converted into an `ErrorEnvelope` here;
//! nothing escapes `execute_request`.

use super::response_builder::{build_response, RawResponse};
use super::target::TargetUrl;
use super::types::*;
use crate::error::RelayError;
use crate::infra::{connect_tls, DnsResolver, HickoryDnsResolver, RustlsTlsProvider, TlsProvider};
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Bytes,
    ext::ReasonPhrase,
    header::{HeaderName, HeaderValue, HOST, LOCATION},
    Request, StatusCode,
};
use hyper_util::rt::TokioIo;
use std::{collections::HashMap, net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    task::JoinHandle,
    time::{timeout_at, Instant},
};

/// Default deadline for one relay call, covering connect through body read.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

/// Default hop limit when redirect following is enabled.
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Knobs the relay reads on every call. Never supplied by the caller.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            follow_redirects: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// A `RequestSpec` that passed validation. Building one performs no I/O.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: RelayMethod,
    pub target: TargetUrl,
    pub payload: Option<String>,
}

impl PreparedRequest {
    pub fn from_spec(spec: &RequestSpec) -> Result<Self, RelayError> {
        let target = TargetUrl::parse(&spec.url)?.with_params(&spec.params);
        let method: RelayMethod = spec.method.parse()?;

        let payload = match &spec.body {
            Some(body) if method.carries_body() => body.to_payload()?,
            _ => None,
        };

        Ok(Self {
            method,
            target,
            payload,
        })
    }
}

/// Aborts the connection driver when dropped, so the socket is released on
/// every exit path, including cancellation of the calling future.
struct ConnectionGuard(JoinHandle<()>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Opens connections to targets using a pluggable resolver and TLS provider.
#[derive(Debug, Default, Clone)]
pub struct Connector<R = HickoryDnsResolver, T = RustlsTlsProvider> {
    resolver: R,
    tls: T,
}

impl Connector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: DnsResolver, T: TlsProvider> Connector<R, T> {
    pub fn with_parts(resolver: R, tls: T) -> Self {
        Self { resolver, tls }
    }

    async fn connect_tcp(&self, target: &TargetUrl) -> Result<TcpStream, RelayError> {
        let host = target.host();
        let dns_result = self.resolver.resolve(&host).await?;

        let mut last_error = None;
        for ip in dns_result.ips {
            let addr = SocketAddr::new(ip, target.port());
            tracing::debug!("Connecting to {}", addr);
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = Some(format!("{}: {}", addr, e)),
            }
        }

        Err(RelayError::Connect(
            last_error.unwrap_or_else(|| format!("{}: no addresses to connect to", host)),
        ))
    }

    /// Performs one request/response exchange on a fresh connection.
    pub async fn exchange(
        &self,
        target: &TargetUrl,
        request: Request<Full<Bytes>>,
    ) -> Result<RawResponse, RelayError> {
        let tcp_stream = self.connect_tcp(target).await?;

        if target.is_https() {
            let tls_stream = connect_tls(&self.tls, tcp_stream, &target.host()).await?;
            send_request(TokioIo::new(tls_stream), request).await
        } else {
            send_request(TokioIo::new(tcp_stream), request).await
        }
    }
}

/// Sends a request over an established stream and reads the full response.
async fn send_request<S>(
    io: TokioIo<S>,
    request: Request<Full<Bytes>>,
) -> Result<RawResponse, RelayError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    let _guard = ConnectionGuard(tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::warn!("Connection error: {}", e);
        }
    }));

    let response = sender.send_request(request).await?;
    let (parts, body) = response.into_parts();

    let body = body
        .collect()
        .await
        .map_err(|e| RelayError::BodyRead(e.to_string()))?
        .to_bytes();

    let reason = parts
        .extensions
        .get::<ReasonPhrase>()
        .map(|r| String::from_utf8_lossy(r.as_bytes()).into_owned());

    Ok(RawResponse {
        status: parts.status,
        reason,
        headers: parts.headers,
        body,
    })
}

/// Builds the outbound request. Caller headers are copied verbatim; `Host`
/// is only supplied when the caller did not set one.
fn build_http_request(
    method: RelayMethod,
    target: &TargetUrl,
    headers: &HashMap<String, String>,
    payload: Option<&str>,
) -> Result<Request<Full<Bytes>>, RelayError> {
    let mut req_builder = Request::builder()
        .method(method.to_http())
        .uri(target.request_target());

    let mut has_host = false;
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| RelayError::InvalidHeader(format!("invalid header name '{}'", key)))?;
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|_| RelayError::InvalidHeader(format!("invalid value for header '{}'", key)))?;
        has_host |= name == HOST;
        req_builder = req_builder.header(name, value);
    }

    if !has_host {
        req_builder = req_builder.header(HOST, target.authority());
    }

    let body = payload
        .map(|p| Bytes::copy_from_slice(p.as_bytes()))
        .unwrap_or_default();
    req_builder
        .body(Full::new(body))
        .map_err(|e| RelayError::InvalidHeader(e.to_string()))
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Headers that must not follow a redirect to another origin.
const CREDENTIAL_HEADERS: [&str; 4] = ["authorization", "cookie", "proxy-authorization", "host"];

/// Drops caller headers that no longer apply to the next hop.
///
/// Credentials and `Host` stay with the origin they were addressed to, and
/// `Content-*` headers go away together with the body.
fn redirect_headers(
    headers: &mut HashMap<String, String>,
    cross_origin: bool,
    body_dropped: bool,
) {
    headers.retain(|name, _| {
        let name = name.to_ascii_lowercase();
        if cross_origin && CREDENTIAL_HEADERS.contains(&name.as_str()) {
            return false;
        }
        !(body_dropped && name.starts_with("content-"))
    });
}

/// Method and body for the next hop, following fetch semantics.
fn redirect_request(
    status: StatusCode,
    method: RelayMethod,
    payload: Option<String>,
) -> (RelayMethod, Option<String>) {
    match status.as_u16() {
        303 if method != RelayMethod::Get => (RelayMethod::Get, None),
        301 | 302 if method == RelayMethod::Post => (RelayMethod::Get, None),
        _ => (method, payload),
    }
}

async fn run<R: DnsResolver, T: TlsProvider>(
    connector: &Connector<R, T>,
    spec: &RequestSpec,
    options: &RelayOptions,
) -> Result<ResponseEnvelope, RelayError> {
    let PreparedRequest {
        mut method,
        mut target,
        mut payload,
    } = PreparedRequest::from_spec(spec)?;

    let deadline = Instant::now() + options.timeout;
    let mut headers = spec.headers.clone();
    let mut hops = 0;

    loop {
        let request = build_http_request(method, &target, &headers, payload.as_deref())?;

        tracing::debug!(method = %method, url = %target.as_str(), "Sending outbound request");
        let raw = timeout_at(deadline, connector.exchange(&target, request))
            .await
            .map_err(|_| RelayError::Timeout)??;

        if options.follow_redirects && is_redirect(raw.status) {
            if let Some(location) = raw.headers.get(LOCATION) {
                hops += 1;
                if hops > options.max_redirects {
                    return Err(RelayError::TooManyRedirects(options.max_redirects));
                }

                let location = location
                    .to_str()
                    .map_err(|e| RelayError::InvalidRedirect(e.to_string()))?;
                let next = target.join(location)?;
                tracing::debug!(status = raw.status.as_u16(), "Redirect to: {}", next.as_str());

                let (next_method, next_payload) = redirect_request(raw.status, method, payload);
                let body_dropped = next_method != method;
                redirect_headers(&mut headers, !target.same_origin(&next), body_dropped);

                (method, payload) = (next_method, next_payload);
                target = next;
                continue;
            }
        }

        return build_response(raw);
    }
}

/// Executes a relay call with an explicit connector.
pub async fn execute_with<R: DnsResolver, T: TlsProvider>(
    connector: &Connector<R, T>,
    spec: &RequestSpec,
    options: &RelayOptions,
) -> Envelope {
    match run(connector, spec, options).await {
        Ok(response) => Envelope::Success(response),
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "Relay request failed");
            Envelope::Failure(e.into_envelope())
        }
    }
}

/// Executes a relay call against the public network.
///
/// Never fails: validation, transport and decode failures all come back as
/// `Envelope::Failure`.
pub async fn execute_request(spec: &RequestSpec, options: &RelayOptions) -> Envelope {
    execute_with(&Connector::new(), spec, options).await
}

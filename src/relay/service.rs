//! Relay service abstraction layer.
//!
//! Provides a trait-based abstraction for relay execution, so the HTTP front
//! door can be driven by a mock in tests.

use super::executor::{execute_with, Connector, RelayOptions};
use super::types::{Envelope, RelayMethod, RequestBody, RequestSpec};
use crate::infra::{DnsResolver, HickoryDnsResolver, RustlsTlsProvider, TlsProvider};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Trait for services that execute relay calls.
pub trait RelayService: Send + Sync {
    /// Executes a request specification and returns its envelope.
    ///
    /// Implementations never fail; relay-level failures are
    /// `Envelope::Failure` values.
    fn execute(&self, spec: RequestSpec) -> Pin<Box<dyn Future<Output = Envelope> + Send + '_>>;
}

/// Default relay service, executing calls over the network.
#[derive(Debug, Default, Clone)]
pub struct HttpRelayService<R = HickoryDnsResolver, T = RustlsTlsProvider> {
    connector: Connector<R, T>,
    options: RelayOptions,
}

impl HttpRelayService {
    pub fn new(options: RelayOptions) -> Self {
        Self {
            connector: Connector::new(),
            options,
        }
    }

    pub fn arc(options: RelayOptions) -> Arc<Self> {
        Arc::new(Self::new(options))
    }
}

impl<R: DnsResolver, T: TlsProvider> HttpRelayService<R, T> {
    /// Creates a service with a custom resolver and TLS provider.
    pub fn with_connector(connector: Connector<R, T>, options: RelayOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }
}

impl<R: DnsResolver, T: TlsProvider> RelayService for HttpRelayService<R, T> {
    fn execute(&self, spec: RequestSpec) -> Pin<Box<dyn Future<Output = Envelope> + Send + '_>> {
        Box::pin(async move { execute_with(&self.connector, &spec, &self.options).await })
    }
}

/// Extension trait for `RelayService` that provides convenience methods.
pub trait RelayServiceExt: RelayService {
    /// Executes a GET request to the specified URL.
    fn get(&self, url: &str) -> Pin<Box<dyn Future<Output = Envelope> + Send + '_>> {
        self.execute(RequestSpec::new(RelayMethod::Get, url))
    }

    /// Executes a POST request to the specified URL with an optional body.
    fn post(
        &self,
        url: &str,
        body: Option<RequestBody>,
    ) -> Pin<Box<dyn Future<Output = Envelope> + Send + '_>> {
        let mut spec = RequestSpec::new(RelayMethod::Post, url);
        spec.body = body;
        self.execute(spec)
    }
}

impl<T: RelayService + ?Sized> RelayServiceExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::types::{ResponseBody, ResponseEnvelope};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingService {
        seen: Mutex<Vec<RequestSpec>>,
    }

    impl RelayService for RecordingService {
        fn execute(
            &self,
            spec: RequestSpec,
        ) -> Pin<Box<dyn Future<Output = Envelope> + Send + '_>> {
            self.seen.lock().unwrap().push(spec);
            Box::pin(async move {
                Envelope::Success(ResponseEnvelope {
                    status: 204,
                    status_text: "No Content".to_string(),
                    headers: HashMap::new(),
                    body: ResponseBody::Text(String::new()),
                })
            })
        }
    }

    #[tokio::test]
    async fn test_ext_helpers_build_specs() {
        let service = RecordingService {
            seen: Mutex::new(Vec::new()),
        };

        let envelope = service.get("https://example.test/a").await;
        assert_eq!(envelope.status(), 204);
        service
            .post("https://example.test/b", Some(RequestBody::from("hi")))
            .await;

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].url, "https://example.test/a");
        assert_eq!(seen[1].method, "POST");
        assert_eq!(seen[1].body, Some(RequestBody::Text("hi".into())));
    }

    #[tokio::test]
    async fn test_http_service_reports_validation_failure() {
        let service = HttpRelayService::new(RelayOptions::default());
        let envelope = service.get("not-a-url").await;
        assert!(!envelope.is_success());
        assert_eq!(envelope.status(), 400);
    }

    #[test]
    fn test_service_is_object_safe() {
        let service: Arc<dyn RelayService> = HttpRelayService::arc(RelayOptions::default());
        assert_eq!(Arc::strong_count(&service), 1);
    }
}

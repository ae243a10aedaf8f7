//! Target URL validation and query construction.

use url::{Host, Position, Url};

use super::types::QueryParams;
use crate::error::RelayError;

/// A validated absolute `http`/`https` URL the relay may call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(Url);

impl TargetUrl {
    /// Parses and validates a caller-supplied URL. Performs no I/O.
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        if raw.trim().is_empty() {
            return Err(RelayError::MissingUrl);
        }

        let url = Url::parse(raw).map_err(|e| RelayError::InvalidUrl(format!("{}: {}", e, raw)))?;
        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self, RelayError> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(RelayError::InvalidUrl(format!(
                    "unsupported scheme '{}'",
                    other
                )))
            }
        }

        if url.host().is_none() {
            return Err(RelayError::InvalidUrl("URL has no host".to_string()));
        }

        Ok(Self(url))
    }

    /// Appends each pair to the query string, keeping whatever query the URL
    /// already had. Repeated keys are appended, never replaced.
    pub fn with_params(mut self, params: &QueryParams) -> Self {
        if !params.is_empty() {
            let mut query = self.0.query_pairs_mut();
            for (key, value) in params.iter() {
                query.append_pair(key, value);
            }
        }
        self
    }

    /// Resolves a `Location` header against this URL.
    pub fn join(&self, location: &str) -> Result<Self, RelayError> {
        let next = self
            .0
            .join(location)
            .map_err(|e| RelayError::InvalidRedirect(format!("{}: {}", e, location)))?;
        Self::from_url(next).map_err(|e| RelayError::InvalidRedirect(e.to_string()))
    }

    pub fn is_https(&self) -> bool {
        self.0.scheme() == "https"
    }

    /// Host name or address, without IPv6 brackets.
    pub fn host(&self) -> String {
        match self.0.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => String::new(),
        }
    }

    pub fn port(&self) -> u16 {
        self.0
            .port_or_known_default()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }

    /// `host[:port]` as it belongs in a `Host` header.
    pub fn authority(&self) -> &str {
        &self.0[Position::BeforeHost..Position::AfterPort]
    }

    /// Path and query, as sent on the request line.
    pub fn request_target(&self) -> &str {
        let target = &self.0[Position::BeforePath..Position::AfterQuery];
        if target.is_empty() {
            "/"
        } else {
            target
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether both URLs share scheme, host and port.
    pub fn same_origin(&self, other: &TargetUrl) -> bool {
        self.0.origin() == other.0.origin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_missing_and_malformed() {
        assert!(matches!(TargetUrl::parse(""), Err(RelayError::MissingUrl)));
        assert!(matches!(TargetUrl::parse("   "), Err(RelayError::MissingUrl)));
        assert!(matches!(
            TargetUrl::parse("not-a-url"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(matches!(
            TargetUrl::parse("/todos/1"),
            Err(RelayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_same_origin() {
        let base = TargetUrl::parse("http://example.test/a").unwrap();
        assert!(base.same_origin(&base.join("/b?c=1").unwrap()));
        assert!(base.same_origin(&TargetUrl::parse("http://example.test:80/").unwrap()));
        assert!(!base.same_origin(&base.join("http://other.test/a").unwrap()));
        assert!(!base.same_origin(&base.join("https://example.test/a").unwrap()));
        assert!(!base.same_origin(&base.join("http://example.test:8080/a").unwrap()));
    }

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(matches!(
            TargetUrl::parse("ftp://example.test/file"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert!(matches!(
            TargetUrl::parse("mailto:someone@example.test"),
            Err(RelayError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_params_are_appended_after_existing_query() {
        let params: QueryParams = vec![("b", "two words"), ("a", "1"), ("a", "2")]
            .into_iter()
            .collect();
        let target = TargetUrl::parse("https://example.test/search?q=rust")
            .unwrap()
            .with_params(&params);
        assert_eq!(
            target.as_str(),
            "https://example.test/search?q=rust&b=two+words&a=1&a=2"
        );
        assert_eq!(target.request_target(), "/search?q=rust&b=two+words&a=1&a=2");
    }

    #[test]
    fn test_empty_params_leave_url_untouched() {
        let target = TargetUrl::parse("https://example.test/todos/1")
            .unwrap()
            .with_params(&QueryParams::default());
        assert_eq!(target.as_str(), "https://example.test/todos/1");
    }

    #[test]
    fn test_connection_details() {
        let target = TargetUrl::parse("http://example.test:8080").unwrap();
        assert!(!target.is_https());
        assert_eq!(target.host(), "example.test");
        assert_eq!(target.port(), 8080);
        assert_eq!(target.authority(), "example.test:8080");
        assert_eq!(target.request_target(), "/");

        let target = TargetUrl::parse("https://[::1]/x#frag").unwrap();
        assert!(target.is_https());
        assert_eq!(target.host(), "::1");
        assert_eq!(target.port(), 443);
        assert_eq!(target.authority(), "[::1]");
        assert_eq!(target.request_target(), "/x");
    }

    #[test]
    fn test_join_redirect_location() {
        let target = TargetUrl::parse("http://example.test:8080/a/b").unwrap();
        assert_eq!(
            target.join("/c").unwrap().as_str(),
            "http://example.test:8080/c"
        );
        assert_eq!(
            target.join("https://other.test/d").unwrap().as_str(),
            "https://other.test/d"
        );
        assert!(matches!(
            target.join("ftp://other.test/"),
            Err(RelayError::InvalidRedirect(_))
        ));
    }
}

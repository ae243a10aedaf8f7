use std::collections::HashMap;

use thiserror::Error;

use crate::relay::types::{ErrorBody, ErrorEnvelope};

/// Coarse failure classes, each with its own synthetic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected before any network I/O.
    Validation,
    /// The outbound exchange could not be completed.
    Transport,
    /// The target answered but its body did not match its content type.
    Decode,
}

impl ErrorClass {
    pub fn status(self) -> u16 {
        match self {
            ErrorClass::Validation => 400,
            ErrorClass::Transport => 500,
            ErrorClass::Decode => 502,
        }
    }

    pub fn status_text(self) -> &'static str {
        match self {
            ErrorClass::Validation => "Bad Request",
            ErrorClass::Transport => "Proxy Fetch Error",
            ErrorClass::Decode => "Proxy Decode Error",
        }
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid body: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("DNS lookup failed: {0}")]
    Dns(String),

    #[error("TCP connection failed: {0}")]
    Connect(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to read body: {0}")]
    BodyRead(String),

    #[error("{0}")]
    Decompression(String),

    #[error("Response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    #[error("Too many redirects (limit {0})")]
    TooManyRedirects(usize),
}

impl RelayError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RelayError::MissingUrl
            | RelayError::InvalidUrl(_)
            | RelayError::InvalidMethod(_)
            | RelayError::InvalidRequest(_)
            | RelayError::InvalidBody(_) => ErrorClass::Validation,
            RelayError::Decode(_) => ErrorClass::Decode,
            _ => ErrorClass::Transport,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayError::MissingUrl | RelayError::InvalidUrl(_) => "INVALID_URL",
            RelayError::InvalidMethod(_) => "INVALID_METHOD",
            RelayError::InvalidRequest(_) => "INVALID_REQUEST",
            RelayError::InvalidBody(_) => "INVALID_BODY",
            RelayError::InvalidHeader(_) => "INVALID_HEADER",
            RelayError::Dns(_) => "DNS_ERROR",
            RelayError::Connect(_) => "CONNECTION_FAILED",
            RelayError::Tls(_) => "TLS_ERROR",
            RelayError::Http(_) => "HTTP_ERROR",
            RelayError::Timeout => "TIMEOUT",
            RelayError::BodyRead(_) => "BODY_READ_ERROR",
            RelayError::Decompression(_) => "DECOMPRESSION_ERROR",
            RelayError::Decode(_) => "DECODE_ERROR",
            RelayError::InvalidRedirect(_) => "INVALID_REDIRECT",
            RelayError::TooManyRedirects(_) => "TOO_MANY_REDIRECTS",
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            RelayError::MissingUrl => "URL is required",
            RelayError::InvalidBody(_) => "Invalid JSON body provided",
            _ => match self.class() {
                ErrorClass::Validation => "Invalid request specification",
                ErrorClass::Transport => "The server-side proxy failed to fetch the request.",
                ErrorClass::Decode => "The target response could not be decoded.",
            },
        }
    }

    /// Converts the failure into the uniform envelope returned to callers.
    pub fn into_envelope(self) -> ErrorEnvelope {
        let class = self.class();
        ErrorEnvelope {
            status: class.status(),
            status_text: class.status_text().to_string(),
            headers: HashMap::new(),
            body: ErrorBody {
                error: self.summary().to_string(),
                message: self.to_string(),
                code: self.code().to_string(),
            },
        }
    }
}

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RelayError;

/// Declarative description of an outbound request, as sent by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestSpec {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub params: QueryParams,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<RequestBody>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RequestSpec {
    pub fn new(method: RelayMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(key, value);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Query parameters in the order the caller listed them.
///
/// Deserializes from a JSON object without collapsing repeated keys, so
/// `{"tag": "a", "tag": "b"}` yields two `tag` parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = QueryParams;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of query parameter names to string values")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(QueryParams::default())
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(QueryParams::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, String>()? {
                    pairs.push((key, value));
                }
                Ok(QueryParams(pairs))
            }
        }

        deserializer.deserialize_any(PairsVisitor)
    }
}

/// Outbound request body: raw text, or a structured value sent as JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Structured(serde_json::Value),
}

impl RequestBody {
    /// Renders the body as the text that goes on the wire.
    ///
    /// Returns `None` for an empty string or a JSON `null`; neither is sent.
    pub fn to_payload(&self) -> Result<Option<String>, RelayError> {
        match self {
            RequestBody::Text(text) if text.is_empty() => Ok(None),
            RequestBody::Text(text) => Ok(Some(text.clone())),
            RequestBody::Structured(serde_json::Value::Null) => Ok(None),
            RequestBody::Structured(value) => serde_json::to_string(value)
                .map(Some)
                .map_err(RelayError::InvalidBody),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => RequestBody::Text(text),
            other => RequestBody::Structured(other),
        }
    }
}

/// Methods the relay accepts. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RelayMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayMethod::Get => "GET",
            RelayMethod::Post => "POST",
            RelayMethod::Put => "PUT",
            RelayMethod::Patch => "PATCH",
            RelayMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE never carry a request body.
    pub fn carries_body(self) -> bool {
        !matches!(self, RelayMethod::Get | RelayMethod::Delete)
    }

    pub fn to_http(self) -> hyper::Method {
        match self {
            RelayMethod::Get => hyper::Method::GET,
            RelayMethod::Post => hyper::Method::POST,
            RelayMethod::Put => hyper::Method::PUT,
            RelayMethod::Patch => hyper::Method::PATCH,
            RelayMethod::Delete => hyper::Method::DELETE,
        }
    }
}

impl FromStr for RelayMethod {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(RelayMethod::Get),
            "POST" => Ok(RelayMethod::Post),
            "PUT" => Ok(RelayMethod::Put),
            "PATCH" => Ok(RelayMethod::Patch),
            "DELETE" => Ok(RelayMethod::Delete),
            "" => Err(RelayError::InvalidMethod("method is required".to_string())),
            other => Err(RelayError::InvalidMethod(format!(
                "'{}' is not one of GET, POST, PUT, PATCH, DELETE",
                other
            ))),
        }
    }
}

impl fmt::Display for RelayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target response body after content-type driven decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Structured(serde_json::Value),
    Text(String),
}

/// What the target answered, whatever its status code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

/// Diagnostic payload of a relay-level failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub code: String,
}

/// A relay-level failure, shaped like a response so callers can render both alike.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: ErrorBody,
}

/// Outcome of a relay call.
///
/// Both variants serialize to the same `{status, statusText, headers, body}`
/// shape; the variant, not the status code, says whether the relay itself failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success(ResponseEnvelope),
    Failure(ErrorEnvelope),
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success(_))
    }

    /// Status carried inside the envelope.
    pub fn status(&self) -> u16 {
        match self {
            Envelope::Success(response) => response.status,
            Envelope::Failure(error) => error.status,
        }
    }

    /// Status the relay's own transport should answer with.
    pub fn relay_status(&self) -> u16 {
        match self {
            Envelope::Success(_) => 200,
            Envelope::Failure(error) => error.status,
        }
    }
}

impl From<RelayError> for Envelope {
    fn from(error: RelayError) -> Self {
        Envelope::Failure(error.into_envelope())
    }
}

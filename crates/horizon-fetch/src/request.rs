//! Per-call request options and their normalization into an outgoing
//! request description.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, header};
use serde::Serialize;
use serde_json::Value;

use crate::cancel::CancelSignal;
use crate::client::ClientConfig;
use crate::trust::should_attach_headers;
use crate::urls::build_url;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP PATCH method.
    Patch,
    /// HTTP DELETE method.
    Delete,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl Method {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }

    /// Whether this is a GET request.
    pub fn is_get(self) -> bool {
        matches!(self, Self::Get)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// Per-call content type setting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    /// Use the client's default content type.
    #[default]
    Default,
    /// Send no Content-Type header and let the transport decide.
    None,
    /// An explicit content type for this call.
    Value(String),
}

/// Data attached to a request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestData {
    /// Structured data: query-encoded into the URL on GET, JSON-encoded
    /// into the body otherwise.
    Value(Value),
    /// Pre-encoded bytes, attached to the body verbatim.
    Raw(Bytes),
}

/// The options hash for a single call.
///
/// Everything is optional; defaults come from the client's
/// [`ClientConfig`]. Options are consumed by the call and never mutated by
/// normalization.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// The HTTP method; defaults to GET.
    pub method: Option<Method>,
    /// Content type handling for this call.
    pub content_type: ContentType,
    /// Per-call headers; these win over client defaults on conflict.
    pub headers: HeaderMap,
    /// Data for the query string or body.
    pub data: Option<RequestData>,
    /// Per-call host override.
    pub host: Option<String>,
    /// Per-call namespace override.
    pub namespace: Option<String>,
    /// Abort the call if no response arrived within this duration.
    pub timeout: Option<Duration>,
    /// Externally supplied cancellation signal for this call.
    pub signal: Option<CancelSignal>,
}

impl RequestOptions {
    /// Create an empty options hash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header to the request.
    pub fn header(
        mut self,
        name: impl TryInto<HeaderName>,
        value: impl TryInto<HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Set an explicit content type for this call.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = ContentType::Value(content_type.into());
        self
    }

    /// Send no Content-Type header and let the transport decide.
    pub fn no_content_type(mut self) -> Self {
        self.content_type = ContentType::None;
        self
    }

    /// Attach structured data.
    pub fn data(mut self, value: Value) -> Self {
        self.data = Some(RequestData::Value(value));
        self
    }

    /// Attach structured data from a serializable value.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.data = Some(RequestData::Value(value)),
            Err(e) => {
                tracing::error!(target: "horizon_fetch::request", "Failed to serialize JSON body: {}", e);
            }
        }
        self
    }

    /// Attach a pre-encoded body without any processing.
    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.data = Some(RequestData::Raw(body.into()));
        self
    }

    /// Override the client host for this call.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Override the client namespace for this call.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Abort the call if no response arrived within `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach an external cancellation signal.
    pub fn signal(mut self, signal: CancelSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// The normalized description of one outgoing request.
///
/// Built exactly once per call and immutable afterwards.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// The fully built URL, including any query string from GET data.
    pub url: String,
    /// The HTTP method.
    pub method: Method,
    /// The complete outgoing header set.
    pub headers: HeaderMap,
    /// The content type applied to the request, if any.
    pub content_type: Option<String>,
    /// The encoded body, if any.
    pub body: Option<Bytes>,
}

/// Merge per-call options with client-level settings into a [`RequestSpec`].
///
/// The URL is built exactly once. Client-default headers are attached only
/// when the host-trust policy allows it for the built URL; per-call headers
/// always survive and win on conflicting names. The Content-Type header is
/// only inserted when the per-call headers do not already carry one and the
/// content type was not explicitly suppressed.
pub(crate) fn normalize(
    path: &str,
    options: &RequestOptions,
    config: &ClientConfig,
) -> RequestSpec {
    let method = options.method.unwrap_or_default();

    let host = options.host.as_deref().or(config.host.as_deref());
    let namespace = options.namespace.as_deref().or(config.namespace.as_deref());
    let mut url = build_url(path, host, namespace);

    let mut headers = if should_attach_headers(&url, host.unwrap_or(""), &config.trusted_hosts) {
        let mut merged = config.default_headers.clone();
        for (name, value) in options.headers.iter() {
            merged.insert(name.clone(), value.clone());
        }
        merged
    } else {
        options.headers.clone()
    };

    let content_type = match &options.content_type {
        ContentType::Default => Some(config.default_content_type.clone()),
        ContentType::None => None,
        ContentType::Value(explicit) => Some(explicit.clone()),
    };

    if let Some(content_type) = &content_type
        && !headers.contains_key(header::CONTENT_TYPE)
    {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                headers.insert(header::CONTENT_TYPE, value);
            }
            Err(e) => {
                tracing::warn!(
                    target: "horizon_fetch::request",
                    "Invalid content type '{}': {}",
                    content_type,
                    e
                );
            }
        }
    }

    let mut body = None;
    match &options.data {
        None => {}
        Some(RequestData::Raw(bytes)) => {
            body = Some(bytes.clone());
        }
        Some(RequestData::Value(value)) => {
            // Defensively re-parse data that arrived pre-stringified.
            let value = match value {
                Value::String(s) if is_json_string(s) => {
                    serde_json::from_str(s).unwrap_or_else(|_| value.clone())
                }
                other => other.clone(),
            };

            if method.is_get() {
                url = format!("{}?{}", url, to_query_string(&value));
            } else {
                body = Some(Bytes::from(value.to_string()));
            }
        }
    }

    RequestSpec {
        url,
        method,
        headers,
        content_type,
        body,
    }
}

/// Whether a string is itself an encoded JSON structure.
fn is_json_string(s: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(s),
        Ok(Value::Object(_) | Value::Array(_) | Value::Null)
    )
}

/// Serialize structured data as a URL query string.
///
/// Nested objects and arrays use bracket notation (`a[b]=c`, `list[]=1`),
/// the convention REST backends expect from browser clients.
pub(crate) fn to_query_string(value: &Value) -> String {
    let mut pairs = Vec::new();
    collect_pairs(None, value, &mut pairs);

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs);
    serializer.finish()
}

fn collect_pairs(prefix: Option<&str>, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                let key = match prefix {
                    Some(prefix) => format!("{prefix}[{key}]"),
                    None => key.clone(),
                };
                collect_pairs(Some(&key), item, out);
            }
        }
        Value::Array(items) => {
            let key = format!("{}[]", prefix.unwrap_or(""));
            for item in items {
                collect_pairs(Some(&key), item, out);
            }
        }
        Value::Null => {
            if let Some(prefix) = prefix {
                out.push((prefix.to_string(), String::new()));
            }
        }
        Value::String(s) => {
            if let Some(prefix) = prefix {
                out.push((prefix.to_string(), s.clone()));
            }
        }
        other => {
            if let Some(prefix) = prefix {
                out.push((prefix.to_string(), other.to_string()));
            }
        }
    }
}

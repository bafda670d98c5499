//! The fetch client: configuration, the request pipeline and the verb
//! convenience surface.

use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, header};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cancel::CancelSignal;
use crate::error::{ClassifiedError, FetchError, Result};
use crate::request::{Method, RequestOptions, RequestSpec, normalize};
use crate::response::{FetchResponse, ParsedResponse, interpret};
use crate::trust::HostMatcher;

/// Long-lived per-client defaults.
///
/// Configured once when the client is built and read-only for the duration
/// of every call; concurrent calls share it freely.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Host prepended to relative paths.
    pub host: Option<String>,
    /// Namespace inserted between host and path.
    pub namespace: Option<String>,
    /// Content type applied when a call does not choose its own.
    pub default_content_type: String,
    /// Headers attached to every request the trust policy allows.
    pub default_headers: HeaderMap,
    /// Hosts beyond the configured one that may receive default headers.
    pub trusted_hosts: Vec<HostMatcher>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: None,
            namespace: None,
            default_content_type: "application/x-www-form-urlencoded; charset=UTF-8".to_string(),
            default_headers: HeaderMap::new(),
            trusted_hosts: Vec::new(),
        }
    }
}

/// Builder for creating a fetch client with custom configuration.
pub struct FetchClientBuilder {
    config: ClientConfig,
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClientBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the host prepended to relative paths.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Set the namespace inserted between host and path.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// Set the content type applied when a call does not choose its own.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.default_content_type = content_type.into();
        self
    }

    /// Add a header sent with every request the trust policy allows.
    pub fn default_header(
        mut self,
        name: impl TryInto<HeaderName>,
        value: impl TryInto<HeaderValue>,
    ) -> Self {
        if let (Ok(name), Ok(value)) = (name.try_into(), value.try_into()) {
            self.config.default_headers.insert(name, value);
        }
        self
    }

    /// Trust a host by exact hostname.
    pub fn trusted_host(mut self, host: impl Into<String>) -> Self {
        self.config.trusted_hosts.push(HostMatcher::exact(host));
        self
    }

    /// Trust hosts matching a pattern. Unusable patterns are skipped.
    pub fn trusted_host_pattern(mut self, pattern: &str) -> Self {
        if let Some(matcher) = HostMatcher::pattern(pattern) {
            self.config.trusted_hosts.push(matcher);
        }
        self
    }

    /// Build the fetch client.
    pub fn build(self) -> Result<FetchClient> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchClient {
            inner: Arc::new(FetchClientInner {
                config: self.config,
                http,
            }),
        })
    }
}

/// Internal state for the fetch client.
struct FetchClientInner {
    config: ClientConfig,
    http: reqwest::Client,
}

/// The result of a low-level [`raw`](FetchClient::raw) call: the transport
/// response with its body still unread, plus the request that produced it.
#[derive(Debug)]
pub struct RawResult {
    /// The transport response; consume the body at most once.
    pub response: FetchResponse,
    /// The normalized request, including the built URL.
    pub request: RequestSpec,
}

/// A client for making HTTP requests against a configured host.
///
/// The client is cheaply cloneable and thread-safe; clones share the same
/// configuration and connection pool.
///
/// # Example
///
/// ```ignore
/// use horizon_fetch::{FetchClient, RequestOptions};
///
/// let client = FetchClient::builder()
///     .host("https://api.example.com")
///     .namespace("api/v1")
///     .default_header("x-api-key", "secret")
///     .build()?;
///
/// // GET https://api.example.com/api/v1/photos
/// let photos = client.request("/photos", RequestOptions::new()).await?;
///
/// // Typed errors for programmatic branching
/// match client.request("/missing", RequestOptions::new()).await {
///     Err(e) if e.classified().is_some_and(|c| c.is_not_found()) => { /* 404 */ }
///     other => { /* ... */ }
/// }
/// ```
#[derive(Clone)]
pub struct FetchClient {
    inner: Arc<FetchClientInner>,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// Create a new fetch client with default configuration.
    pub fn new() -> Self {
        FetchClientBuilder::new()
            .build()
            .expect("Failed to create fetch client with default configuration")
    }

    /// Create a builder for configuring a new fetch client.
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    /// Get the client's configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Make a request, returning the unconsumed transport response.
    ///
    /// Options are normalized exactly once, then the request is dispatched
    /// with cancellation wired up: an `options.timeout` countdown and an
    /// externally supplied `options.signal` both feed a single cancellation
    /// point, and the countdown is torn down when the call settles,
    /// whatever the outcome. A fired timeout surfaces as a classified
    /// timeout (status `-1`), a fired signal as an abort (status `0`).
    pub async fn raw(&self, path: &str, mut options: RequestOptions) -> Result<RawResult> {
        let signal = options.signal.take();
        let timeout = options.timeout;
        let spec = normalize(path, &options, &self.inner.config);

        let response = tokio::select! {
            result = self.dispatch(&spec) => result?,
            _ = maybe_elapsed(timeout) => {
                tracing::debug!(target: "horizon_fetch::client", "request to {} timed out", spec.url);
                return Err(ClassifiedError::timeout().into());
            }
            _ = maybe_fired(signal) => {
                tracing::debug!(target: "horizon_fetch::client", "request to {} was aborted", spec.url);
                return Err(ClassifiedError::aborted().into());
            }
        };

        Ok(RawResult {
            response,
            request: spec,
        })
    }

    /// Make a request and decode the response body.
    ///
    /// Resolves with the decoded payload (JSON bodies parse, text bodies
    /// surface as JSON strings). Any non-success outcome is classified and
    /// returned as a typed error carrying `status` and `payload`.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value> {
        let RawResult { response, request } = self.raw(path, options).await?;

        match interpret(response).await {
            ParsedResponse::Success(success) => Ok(success.body.into_value()),
            ParsedResponse::Failure(failure) => {
                let content_type = request
                    .headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok());
                Err(ClassifiedError::classify(
                    &failure,
                    request.method,
                    &request.url,
                    content_type,
                )
                .into())
            }
        }
    }

    /// Make a request and deserialize the decoded payload.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let payload = self.request(path, options).await?;
        serde_json::from_value(payload).map_err(|e| FetchError::Transport(e.to_string()))
    }

    /// Make a GET request for a single resource.
    ///
    /// Rejects arguments that look like navigation to a nested path; use
    /// [`request`](Self::request) for those.
    pub async fn get(&self, resource: &str) -> Result<Value> {
        if resource.contains('/') {
            return Err(FetchError::Usage(
                "it looks like you tried to use `get` to fetch a nested path; use the `request` method instead"
                    .to_string(),
            ));
        }
        self.request(resource, RequestOptions::new().method(Method::Get))
            .await
    }

    /// Make a request with the method forced to POST.
    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(path, options.method(Method::Post)).await
    }

    /// Make a request with the method forced to PUT.
    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(path, options.method(Method::Put)).await
    }

    /// Make a request with the method forced to PATCH.
    pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(path, options.method(Method::Patch)).await
    }

    /// Make a request with the method forced to DELETE.
    pub async fn del(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request(path, options.method(Method::Delete)).await
    }

    /// Make a request with the method forced to DELETE.
    ///
    /// Alias for [`del`](Self::del).
    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.del(path, options).await
    }

    /// Hand the normalized request to the transport.
    async fn dispatch(&self, spec: &RequestSpec) -> Result<FetchResponse> {
        let mut builder = self
            .inner
            .http
            .request(spec.method.to_reqwest(), &spec.url);

        for (name, value) in spec.headers.iter() {
            builder = builder.header(name, value);
        }

        if let Some(body) = &spec.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchResponse::from_reqwest(response))
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Resolve when the timeout elapses; pend forever without one.
async fn maybe_elapsed(timeout: Option<std::time::Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}

/// Resolve when the external signal fires; pend forever without one.
async fn maybe_fired(signal: Option<CancelSignal>) {
    match signal {
        Some(signal) => signal.fired().await,
        None => std::future::pending::<()>().await,
    }
}

/// Make a one-off request without configuring a client.
///
/// Builds a default [`FetchClient`] per call; prefer holding a client when
/// making more than one request.
pub async fn request(url: &str, options: RequestOptions) -> Result<Value> {
    FetchClient::new().request(url, options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_configures_the_client() {
        let client = FetchClient::builder()
            .host("https://api.example.com")
            .namespace("v2")
            .content_type("application/json; charset=utf-8")
            .default_header("x-api-key", "secret")
            .trusted_host("partner.example.com")
            .trusted_host_pattern(r"\.cdn\.example\.com$")
            .build()
            .expect("Failed to build client");

        let config = client.config();
        assert_eq!(config.host.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.namespace.as_deref(), Some("v2"));
        assert_eq!(config.default_content_type, "application/json; charset=utf-8");
        assert_eq!(config.default_headers.get("x-api-key").unwrap(), "secret");
        assert_eq!(config.trusted_hosts.len(), 2);
    }

    #[test]
    fn unusable_trusted_host_pattern_is_dropped() {
        let client = FetchClient::builder()
            .trusted_host_pattern("(unclosed")
            .build()
            .expect("Failed to build client");
        assert!(client.config().trusted_hosts.is_empty());
    }

    #[tokio::test]
    async fn get_rejects_nested_paths_without_sending() {
        let client = FetchClient::new();
        let error = client.get("users/me").await.unwrap_err();
        assert!(matches!(error, FetchError::Usage(_)));
        assert_eq!(error.status(), None);
    }

    #[test]
    fn clones_share_configuration() {
        let client = FetchClient::builder()
            .host("https://api.example.com")
            .build()
            .expect("Failed to build client");
        let clone = client.clone();
        assert_eq!(clone.config().host, client.config().host);
    }
}

//! Response interpretation: body parsing and success/failure splitting.

use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FetchError, Result};

/// Placeholder used when a response carries no Content-Type header.
pub(crate) const EMPTY_CONTENT_TYPE: &str = "Empty Content-Type";

/// A response from the transport, body not yet consumed.
///
/// Thin wrapper over the transport response for callers of
/// [`raw`](crate::FetchClient::raw) that need headers or the status before
/// deciding how to read the body. The body may be consumed exactly once.
pub struct FetchResponse {
    inner: reqwest::Response,
}

impl FetchResponse {
    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        Self { inner: response }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.inner
            .headers()
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the response body as text.
    pub async fn text(self) -> Result<String> {
        self.inner
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    /// Parse the response body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        self.inner
            .json()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    fn status_text(&self) -> String {
        self.inner
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string()
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status())
            .finish()
    }
}

/// A fully read response, split into its success or failure shape.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedResponse {
    /// The response carried a 2xx status and a readable body.
    Success(ParsedSuccess),
    /// Anything else: error status, undeclared-JSON mismatch or an
    /// unreadable body.
    Failure(ParsedFailure),
}

/// Decoded payload of a successful response.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedSuccess {
    /// The HTTP status code.
    pub status: u16,
    /// The decoded body.
    pub body: ResponseBody,
}

/// A response body decoded according to its declared content type.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    /// The declared type included `json` and the body parsed.
    Json(Value),
    /// Everything else, verbatim.
    Text(String),
}

impl ResponseBody {
    /// Flatten into a JSON value; text bodies become JSON strings.
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Structured failure information for a non-2xx or unreadable response.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedFailure {
    /// The HTTP status code.
    pub status: u16,
    /// The canonical reason phrase for the status, when known.
    pub status_text: String,
    /// The raw body text.
    pub message: String,
    /// The body as structured JSON when recoverable, else the raw text.
    pub payload: Value,
    /// Whether the transport reported a cancellation alongside this
    /// response shape.
    pub(crate) aborted: bool,
}

/// Read and interpret a transport response.
///
/// Suspends until the body is fully buffered; the body is consumed exactly
/// once and never re-read. Malformed bodies are folded into the failure
/// shape rather than raised.
pub(crate) async fn interpret(response: FetchResponse) -> ParsedResponse {
    let status = response.status();
    let status_text = response.status_text();
    let ok = response.is_success();
    let content_type = response.content_type().map(str::to_string);

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            // The body could not be read at all; surface what we know.
            let message = e.to_string();
            return ParsedResponse::Failure(ParsedFailure {
                status,
                status_text,
                payload: Value::String(message.clone()),
                message,
                aborted: false,
            });
        }
    };

    interpret_parts(status, &status_text, content_type.as_deref(), ok, &body)
}

/// Interpret an already-buffered response.
pub(crate) fn interpret_parts(
    status: u16,
    status_text: &str,
    content_type: Option<&str>,
    ok: bool,
    body: &str,
) -> ParsedResponse {
    let declared = content_type.unwrap_or(EMPTY_CONTENT_TYPE);

    if ok {
        if declared.contains("json") {
            match serde_json::from_str(body) {
                Ok(json) => ParsedResponse::Success(ParsedSuccess {
                    status,
                    body: ResponseBody::Json(json),
                }),
                // Declared JSON that does not parse is a failure, not a panic.
                Err(_) => ParsedResponse::Failure(ParsedFailure {
                    status,
                    status_text: status_text.to_string(),
                    message: body.to_string(),
                    payload: Value::String(body.to_string()),
                    aborted: false,
                }),
            }
        } else {
            ParsedResponse::Success(ParsedSuccess {
                status,
                body: ResponseBody::Text(body.to_string()),
            })
        }
    } else {
        // The raw text is always captured first; a structured payload is
        // recovered when the body parses as JSON, whatever type was declared.
        let payload = match serde_json::from_str::<Value>(body) {
            Ok(json) => json,
            Err(_) => Value::String(body.to_string()),
        };

        ParsedResponse::Failure(ParsedFailure {
            status,
            status_text: status_text.to_string(),
            message: body.to_string(),
            payload,
            aborted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_json_body_is_parsed() {
        let parsed = interpret_parts(
            200,
            "OK",
            Some("application/json"),
            true,
            r#"[{"id":10}]"#,
        );
        assert_eq!(
            parsed,
            ParsedResponse::Success(ParsedSuccess {
                status: 200,
                body: ResponseBody::Json(json!([{"id": 10}])),
            })
        );
    }

    #[test]
    fn ok_text_body_stays_text() {
        let parsed = interpret_parts(200, "OK", Some("text/plain"), true, "hello");
        assert_eq!(
            parsed,
            ParsedResponse::Success(ParsedSuccess {
                status: 200,
                body: ResponseBody::Text("hello".to_string()),
            })
        );
    }

    #[test]
    fn missing_content_type_is_treated_as_text() {
        let parsed = interpret_parts(200, "OK", None, true, r#"{"id":1}"#);
        assert_eq!(
            parsed,
            ParsedResponse::Success(ParsedSuccess {
                status: 200,
                body: ResponseBody::Text(r#"{"id":1}"#.to_string()),
            })
        );
    }

    #[test]
    fn ok_declared_json_with_malformed_body_folds_into_failure() {
        let parsed = interpret_parts(200, "OK", Some("application/json"), true, "not json");
        let ParsedResponse::Failure(failure) = parsed else {
            panic!("expected failure");
        };
        assert_eq!(failure.status, 200);
        assert_eq!(failure.message, "not json");
        assert_eq!(failure.payload, Value::String("not json".to_string()));
    }

    #[test]
    fn error_json_payload_is_preserved() {
        let body = r#"{"errors":[{"detail":"missing token"}]}"#;
        let parsed = interpret_parts(401, "Unauthorized", Some("application/json"), false, body);
        let ParsedResponse::Failure(failure) = parsed else {
            panic!("expected failure");
        };
        assert_eq!(failure.status, 401);
        assert_eq!(failure.status_text, "Unauthorized");
        assert_eq!(failure.message, body);
        assert_eq!(failure.payload, json!({"errors": [{"detail": "missing token"}]}));
    }

    #[test]
    fn json_shaped_body_declared_as_text_is_recovered() {
        let body = r#"{"reason":"gone"}"#;
        let parsed = interpret_parts(410, "Gone", Some("text/plain"), false, body);
        let ParsedResponse::Failure(failure) = parsed else {
            panic!("expected failure");
        };
        assert_eq!(failure.payload, json!({"reason": "gone"}));
    }

    #[test]
    fn unparseable_error_body_falls_back_to_raw_text() {
        let parsed = interpret_parts(500, "Internal Server Error", Some("text/html"), false, "<html>boom</html>");
        let ParsedResponse::Failure(failure) = parsed else {
            panic!("expected failure");
        };
        assert_eq!(failure.payload, Value::String("<html>boom</html>".to_string()));
        assert_eq!(failure.message, "<html>boom</html>");
    }

    #[test]
    fn into_value_flattens_text() {
        assert_eq!(
            ResponseBody::Text("abc".to_string()).into_value(),
            Value::String("abc".to_string())
        );
        assert_eq!(ResponseBody::Json(json!(1)).into_value(), json!(1));
    }
}

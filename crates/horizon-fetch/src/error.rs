//! Error taxonomy: usage errors, transport failures and classified HTTP
//! errors.

use serde_json::Value;

use crate::request::Method;
use crate::response::{EMPTY_CONTENT_TYPE, ParsedFailure};

/// A specialized Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors surfaced to callers.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The caller misused the API (for example a nested path passed to
    /// `get`). No request was made.
    #[error("usage error: {0}")]
    Usage(String),

    /// The transport failed before any HTTP status was obtained.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request completed with a classifiable failure, or was cancelled
    /// or timed out in flight.
    #[error(transparent)]
    Response(#[from] ClassifiedError),
}

impl FetchError {
    /// The classified failure, when this error carries one.
    pub fn classified(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Response(classified) => Some(classified),
            _ => None,
        }
    }

    /// The classified status, when this error carries one. `-1` means the
    /// request timed out, `0` that it was aborted.
    pub fn status(&self) -> Option<i32> {
        self.classified().map(|c| c.status)
    }

    /// The failure payload, when this error carries one.
    pub fn payload(&self) -> Option<&Value> {
        self.classified().and_then(|c| c.payload.as_ref())
    }
}

/// The fixed set of failure kinds a response can classify into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400.
    BadRequest,
    /// 401.
    Unauthorized,
    /// 403.
    Forbidden,
    /// 422.
    Invalid,
    /// 404.
    NotFound,
    /// 410.
    Gone,
    /// 409.
    Conflict,
    /// Any 500–599 status.
    ServerError,
    /// The library's own timeout countdown fired.
    Timeout,
    /// An externally supplied cancellation signal fired.
    Aborted,
    /// Any other failure.
    Generic,
}

impl ErrorKind {
    /// Get a human-readable description of the failure kind.
    pub fn description(self) -> &'static str {
        match self {
            Self::BadRequest => "request was formatted incorrectly",
            Self::Unauthorized => "authorization failed",
            Self::Forbidden => "request was rejected because the user is not permitted to perform this operation",
            Self::Invalid => "request was rejected because it was invalid",
            Self::NotFound => "resource was not found",
            Self::Gone => "resource is no longer available",
            Self::Conflict => "the operation failed due to a conflict",
            Self::ServerError => "request was rejected due to a server error",
            Self::Timeout => "the operation timed out",
            Self::Aborted => "the operation was aborted",
            Self::Generic => "the operation failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A failed request, classified into one of the fixed [`ErrorKind`]s.
///
/// Carries the failure payload (the structured body, or `None` for
/// timeouts and aborts) and the status: the HTTP status code, `-1` for a
/// timeout, `0` for an abort.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    /// Which kind of failure this is.
    pub kind: ErrorKind,
    /// HTTP status code; `-1` for a timeout, `0` for an abort.
    pub status: i32,
    /// The failure payload from the response body, when one exists.
    pub payload: Option<Value>,
    message: String,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, status: i32, payload: Option<Value>) -> Self {
        Self {
            kind,
            status,
            payload,
            message: kind.description().to_string(),
        }
    }

    /// The timeout countdown for the call elapsed.
    pub(crate) fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, -1, None)
    }

    /// An external cancellation signal fired.
    pub(crate) fn aborted() -> Self {
        Self::new(ErrorKind::Aborted, 0, None)
    }

    /// Classify a parsed failure into exactly one kind.
    ///
    /// The rules form an ordered cascade; the first match wins even when a
    /// later rule would also apply. The cancellation check deliberately
    /// sits between the 410 and 409 rules, so a transport that reports an
    /// abort together with one of the earlier status codes classifies by
    /// the status.
    pub(crate) fn classify(
        failure: &ParsedFailure,
        method: Method,
        url: &str,
        content_type: Option<&str>,
    ) -> Self {
        let status = failure.status;
        let payload = Some(failure.payload.clone());

        if status == 401 {
            Self::new(ErrorKind::Unauthorized, 401, payload)
        } else if status == 403 {
            Self::new(ErrorKind::Forbidden, 403, payload)
        } else if status == 422 {
            Self::new(ErrorKind::Invalid, 422, payload)
        } else if status == 400 {
            Self::new(ErrorKind::BadRequest, 400, payload)
        } else if status == 404 {
            Self::new(ErrorKind::NotFound, 404, payload)
        } else if status == 410 {
            Self::new(ErrorKind::Gone, 410, payload)
        } else if failure.aborted {
            Self::aborted()
        } else if status == 409 {
            Self::new(ErrorKind::Conflict, 409, payload)
        } else if (500..=599).contains(&status) {
            Self::new(ErrorKind::ServerError, i32::from(status), payload)
        } else {
            let message = detailed_message(failure, method, url, content_type);
            Self {
                kind: ErrorKind::Generic,
                status: i32::from(status),
                payload,
                message,
            }
        }
    }

    /// The message describing this failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check for an authorization failure (401).
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }

    /// Check for a permission failure (403).
    pub fn is_forbidden(&self) -> bool {
        self.kind == ErrorKind::Forbidden
    }

    /// Check for a validation failure (422).
    pub fn is_invalid(&self) -> bool {
        self.kind == ErrorKind::Invalid
    }

    /// Check for a malformed request (400).
    pub fn is_bad_request(&self) -> bool {
        self.kind == ErrorKind::BadRequest
    }

    /// Check for a missing resource (404).
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Check for a resource that is no longer available (410).
    pub fn is_gone(&self) -> bool {
        self.kind == ErrorKind::Gone
    }

    /// Check for a conflict (409).
    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }

    /// Check for a server-side failure (500–599).
    pub fn is_server_error(&self) -> bool {
        self.kind == ErrorKind::ServerError
    }

    /// Check whether the library's timeout countdown fired.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Check whether an external cancellation signal fired.
    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }
}

/// Maximum rendered length for an HTML failure body before it is elided
/// from the detailed message.
const HTML_PAYLOAD_LIMIT: usize = 250;

/// Synthesize the message for an unclassifiable failure, with enough
/// information for debugging.
fn detailed_message(
    failure: &ParsedFailure,
    method: Method,
    url: &str,
    content_type: Option<&str>,
) -> String {
    let content_type = content_type.unwrap_or(EMPTY_CONTENT_TYPE);

    let rendered = if content_type.eq_ignore_ascii_case("text/html")
        && failure.message.len() > HTML_PAYLOAD_LIMIT
    {
        "[Omitted Lengthy HTML]".to_string()
    } else {
        failure.payload.to_string()
    };

    format!(
        "{method} {url} returned a {status}\nPayload ({content_type})\n{rendered}",
        status = failure.status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure(status: u16, payload: Value) -> ParsedFailure {
        ParsedFailure {
            status,
            status_text: String::new(),
            message: payload.to_string(),
            payload,
            aborted: false,
        }
    }

    fn classify(failure: &ParsedFailure) -> ClassifiedError {
        ClassifiedError::classify(failure, Method::Get, "/test", Some("application/json"))
    }

    #[test]
    fn statuses_map_to_their_kinds() {
        let cases = [
            (400, ErrorKind::BadRequest),
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Forbidden),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (410, ErrorKind::Gone),
            (422, ErrorKind::Invalid),
            (500, ErrorKind::ServerError),
            (502, ErrorKind::ServerError),
            (599, ErrorKind::ServerError),
        ];

        for (status, kind) in cases {
            let payload = json!({"errors": [{"status": status}]});
            let error = classify(&failure(status, payload.clone()));
            assert_eq!(error.kind, kind, "status {status}");
            assert_eq!(error.status, i32::from(status));
            assert_eq!(error.payload, Some(payload), "payload preserved for {status}");
        }
    }

    #[test]
    fn statuses_outside_the_server_range_are_generic() {
        assert_eq!(classify(&failure(499, json!(null))).kind, ErrorKind::Generic);
        assert_eq!(classify(&failure(600, json!(null))).kind, ErrorKind::Generic);
        assert_eq!(classify(&failure(302, json!(null))).kind, ErrorKind::Generic);
    }

    #[test]
    fn abort_flag_loses_to_earlier_status_rules() {
        let mut f = failure(404, json!({"detail": "nope"}));
        f.aborted = true;
        assert_eq!(classify(&f).kind, ErrorKind::NotFound);
    }

    #[test]
    fn abort_flag_wins_over_conflict_and_server_errors() {
        let mut f = failure(409, json!({"detail": "raced"}));
        f.aborted = true;
        let error = classify(&f);
        assert_eq!(error.kind, ErrorKind::Aborted);
        assert_eq!(error.status, 0);
        assert_eq!(error.payload, None);

        let mut f = failure(503, json!(null));
        f.aborted = true;
        assert_eq!(classify(&f).kind, ErrorKind::Aborted);
    }

    #[test]
    fn timeout_and_abort_carry_sentinel_statuses() {
        let timeout = ClassifiedError::timeout();
        assert_eq!(timeout.status, -1);
        assert_eq!(timeout.payload, None);
        assert!(timeout.is_timeout());

        let aborted = ClassifiedError::aborted();
        assert_eq!(aborted.status, 0);
        assert_eq!(aborted.payload, None);
        assert!(aborted.is_aborted());
    }

    #[test]
    fn generic_error_synthesizes_a_detailed_message() {
        let f = failure(418, json!({"hint": "teapot"}));
        let error =
            ClassifiedError::classify(&f, Method::Post, "/tea", Some("application/json"));
        assert_eq!(error.kind, ErrorKind::Generic);
        assert_eq!(
            error.message(),
            "POST /tea returned a 418\nPayload (application/json)\n{\"hint\":\"teapot\"}"
        );
    }

    #[test]
    fn lengthy_html_is_omitted_from_the_detailed_message() {
        let html = format!("<html>{}</html>", "x".repeat(300));
        let f = failure(418, Value::String(html));
        let error = ClassifiedError::classify(&f, Method::Get, "/page", Some("text/html"));
        assert!(error.message().ends_with("[Omitted Lengthy HTML]"));

        let short = failure(418, Value::String("<html></html>".to_string()));
        let error = ClassifiedError::classify(&short, Method::Get, "/page", Some("text/html"));
        assert!(error.message().ends_with("\"<html></html>\""));
    }

    #[test]
    fn missing_content_type_is_named_in_the_detailed_message() {
        let f = failure(418, json!(null));
        let error = ClassifiedError::classify(&f, Method::Get, "/x", None);
        assert!(error.message().contains("Payload (Empty Content-Type)"));
    }

    #[test]
    fn fetch_error_accessors() {
        let error = FetchError::from(ClassifiedError::timeout());
        assert_eq!(error.status(), Some(-1));
        assert_eq!(error.payload(), None);

        let usage = FetchError::Usage("bad call".to_string());
        assert_eq!(usage.status(), None);
        assert!(usage.classified().is_none());
    }
}

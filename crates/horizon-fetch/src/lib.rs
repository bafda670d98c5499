//! HTTP request helper for Horizon applications.
//!
//! This crate normalizes per-call and per-client configuration into a
//! single outgoing request, dispatches it over an HTTP transport, and
//! classifies the response into either a decoded payload or a typed error:
//!
//! - **URL composition**: a configured host and namespace combine with
//!   per-call paths under consistent slash handling; complete URLs pass
//!   through untouched.
//! - **Header trust**: client-default headers (typically credentials) are
//!   only attached to the configured host, trusted hosts, and relative
//!   paths — never leaked to arbitrary destinations.
//! - **Error classification**: HTTP failures map onto a fixed set of kinds
//!   (`NotFound`, `Unauthorized`, `ServerError`, ...), each carrying the
//!   response payload and status for programmatic branching; timeouts and
//!   aborts are kinds of their own.
//!
//! # Example
//!
//! ```ignore
//! use horizon_fetch::{FetchClient, Method, RequestOptions};
//! use serde_json::json;
//!
//! let client = FetchClient::builder()
//!     .host("https://api.example.com")
//!     .namespace("api/v1")
//!     .build()?;
//!
//! // GET with query data
//! let photos = client
//!     .request("/photos", RequestOptions::new().data(json!({"album": 7})))
//!     .await?;
//!
//! // POST with a JSON body
//! let created = client
//!     .post("/photos", RequestOptions::new().json(&json!({"title": "sunset"})))
//!     .await?;
//!
//! // Branch on the failure kind
//! match client.request("/photos/999", RequestOptions::new()).await {
//!     Err(e) if e.classified().is_some_and(|c| c.is_not_found()) => println!("no such photo"),
//!     Err(e) => return Err(e.into()),
//!     Ok(photo) => println!("{photo}"),
//! }
//! ```
//!
//! # Cancellation
//!
//! Every call owns a single cancellation point fed by two sources: an
//! optional per-call timeout, and an optional externally supplied signal:
//!
//! ```ignore
//! use horizon_fetch::{cancel_pair, RequestOptions};
//! use std::time::Duration;
//!
//! let (handle, signal) = cancel_pair();
//! let pending = client.request(
//!     "/slow",
//!     RequestOptions::new()
//!         .timeout(Duration::from_secs(5))
//!         .signal(signal),
//! );
//! // elsewhere: handle.cancel();
//! ```

mod cancel;
mod client;
mod error;
mod request;
mod response;
mod trust;
mod urls;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use client::{ClientConfig, FetchClient, FetchClientBuilder, RawResult, request};
pub use error::{ClassifiedError, ErrorKind, FetchError, Result};
pub use request::{ContentType, Method, RequestData, RequestOptions, RequestSpec};
pub use response::{FetchResponse, ParsedFailure, ParsedResponse, ParsedSuccess, ResponseBody};
pub use trust::{HostMatcher, should_attach_headers};
pub use urls::{build_url, is_full_url};

//! Host-trust policy for client-default headers.
//!
//! Client-level headers often carry authentication tokens. Sending them to
//! every destination would leak credentials to third parties, so they are
//! only attached when the target is relative, matches the configured host,
//! or matches an entry in the trusted-hosts list.

use regex::Regex;
use url::Url;

use crate::urls::is_full_url;

/// An entry in the trusted-hosts list.
#[derive(Clone, Debug)]
pub enum HostMatcher {
    /// Matches a hostname by exact equality.
    Exact(String),
    /// Matches hostnames against a pattern.
    Pattern(Regex),
}

impl HostMatcher {
    /// Create an exact-hostname matcher.
    pub fn exact(host: impl Into<String>) -> Self {
        Self::Exact(host.into())
    }

    /// Compile a pattern matcher.
    ///
    /// An unusable pattern is reported and skipped rather than matched.
    pub fn pattern(source: &str) -> Option<Self> {
        match Regex::new(source) {
            Ok(re) => Some(Self::Pattern(re)),
            Err(e) => {
                tracing::warn!(
                    target: "horizon_fetch::trust",
                    "ignoring unusable trusted-host pattern '{}': {}",
                    source,
                    e
                );
                None
            }
        }
    }

    fn matches(&self, hostname: &str) -> bool {
        match self {
            Self::Exact(host) => host == hostname,
            Self::Pattern(re) => re.is_match(hostname),
        }
    }
}

/// Decide whether client-default headers may be attached to `target_url`.
///
/// Relative targets always receive headers; they are assumed same-origin.
/// Complete URLs receive them when the hostname matches a trusted-hosts
/// entry, or when scheme, hostname and port all equal those of
/// `client_host`.
pub fn should_attach_headers(
    target_url: &str,
    client_host: &str,
    trusted_hosts: &[HostMatcher],
) -> bool {
    if !is_full_url(target_url) {
        return true;
    }

    if let Some(hostname) = Url::parse(target_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        && trusted_hosts.iter().any(|m| m.matches(&hostname))
    {
        return true;
    }

    have_same_host(target_url, client_host)
}

/// Compare scheme, hostname and port of two absolute URLs.
pub(crate) fn have_same_host(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

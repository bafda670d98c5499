//! URL assembly from host, namespace and path segments.

use std::sync::LazyLock;

use regex::Regex;

static FULL_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^(http|https)").expect("full-URL pattern is valid"));

/// Check whether a path is already a complete URL.
///
/// A complete URL carries an `http`/`https` scheme and bypasses host and
/// namespace composition entirely.
pub fn is_full_url(url: &str) -> bool {
    FULL_URL.is_match(url)
}

/// Remove at most one leading and one trailing slash.
fn strip_slashes(s: &str) -> &str {
    let s = s.strip_suffix('/').unwrap_or(s);
    s.strip_prefix('/').unwrap_or(s)
}

#[cfg(test)]
thread_local! {
    pub(crate) static BUILD_CALLS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Compose the URL for an outgoing request.
///
/// A `path` that is already a complete URL is returned unchanged, even when
/// `host` or `namespace` conflict with it. Otherwise the present segments of
/// `[host, namespace, path]` are slash-normalized and joined by `/`:
///
/// - a single trailing slash is stripped from `host`;
/// - `namespace` loses both outer slashes when a host precedes it, and only a
///   trailing slash when it stands first (a leading slash is meaningful for
///   relative URLs);
/// - a namespace the path already starts with is not added a second time;
/// - the path keeps its trailing slash, and loses a leading slash only when a
///   prior segment was pushed.
///
/// Total over arbitrary string input; no I/O.
pub fn build_url(path: &str, host: Option<&str>, namespace: Option<&str>) -> String {
    #[cfg(test)]
    BUILD_CALLS.with(|calls| calls.set(calls.get() + 1));

    if is_full_url(path) {
        return path.to_string();
    }

    let mut parts: Vec<&str> = Vec::new();

    if let Some(host) = host.filter(|h| !h.is_empty()) {
        parts.push(host.strip_suffix('/').unwrap_or(host));
    }

    if let Some(namespace) = namespace.filter(|n| !n.is_empty()) {
        let trimmed = if parts.is_empty() {
            namespace.strip_suffix('/').unwrap_or(namespace)
        } else {
            // The join below adds the separating slash back.
            strip_slashes(namespace)
        };

        let already_present = Regex::new(&format!("^(/)?{}/", regex::escape(strip_slashes(namespace))))
            .map(|re| re.is_match(path))
            .unwrap_or(false);
        if !already_present {
            parts.push(trimmed);
        }
    }

    // Only remove a leading slash; a trailing slash stays because APIs may
    // distinguish collection and item endpoints by it.
    let path = if !parts.is_empty() {
        path.strip_prefix('/').unwrap_or(path)
    } else {
        path
    };
    parts.push(path);

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_detection() {
        assert!(is_full_url("http://example.com/users"));
        assert!(is_full_url("https://example.com"));
        assert!(!is_full_url("/users/me"));
        assert!(!is_full_url("users/me"));
        // Protocol-relative addresses are not complete URLs.
        assert!(!is_full_url("//example.com/users"));
    }

    #[test]
    fn full_url_is_returned_unchanged() {
        let url = "https://discuss.example.com/users/me";
        assert_eq!(
            build_url(url, Some("https://other.example.com"), Some("api")),
            url
        );
    }

    #[test]
    fn host_is_prepended() {
        let host = Some("https://discuss.example.com");
        assert_eq!(
            build_url("/users/me", host, None),
            "https://discuss.example.com/users/me"
        );
        assert_eq!(
            build_url("users/me", host, None),
            "https://discuss.example.com/users/me"
        );
    }

    #[test]
    fn host_and_namespace_slash_variants_normalize_to_the_same_url() {
        assert_eq!(
            build_url("baz/", Some("http://foo.com"), Some("/bar/")),
            "http://foo.com/bar/baz/"
        );
        assert_eq!(
            build_url("/baz", Some("http://foo.com/"), Some("bar")),
            "http://foo.com/bar/baz"
        );
    }

    #[test]
    fn relative_namespace_keeps_its_leading_slash() {
        assert_eq!(build_url("users/me", None, Some("/api/v1")), "/api/v1/users/me");
        assert_eq!(build_url("users/me", None, Some("/api/v1/")), "/api/v1/users/me");
        assert_eq!(build_url("users/me", None, Some("api/v1")), "api/v1/users/me");
    }

    #[test]
    fn namespace_is_not_added_twice() {
        assert_eq!(build_url("/api/post", None, Some("api")), "/api/post");
        assert_eq!(build_url("api/post", None, Some("api")), "api/post");
        assert_eq!(
            build_url("/api/v1/users/me", Some("https://example.com"), Some("/api/v1")),
            "https://example.com/api/v1/users/me"
        );
    }

    #[test]
    fn path_with_a_prefix_similar_to_the_namespace_still_gets_it() {
        assert_eq!(build_url("/api-docs/guide", None, Some("api")), "api/api-docs/guide");
    }

    #[test]
    fn double_slash_host() {
        assert_eq!(build_url("users/me", Some("//"), None), "//users/me");
        assert_eq!(build_url("/users/me", Some("//"), None), "//users/me");
    }

    #[test]
    fn trailing_slash_on_the_path_is_preserved() {
        assert_eq!(
            build_url("/posts/", Some("https://example.com"), None),
            "https://example.com/posts/"
        );
    }

    #[test]
    fn no_host_and_no_namespace_leaves_the_path_alone() {
        assert_eq!(build_url("/users/me", None, None), "/users/me");
        assert_eq!(build_url("users/me", None, None), "users/me");
    }

    #[test]
    fn empty_host_and_namespace_are_ignored() {
        assert_eq!(build_url("/users/me", Some(""), Some("")), "/users/me");
    }
}

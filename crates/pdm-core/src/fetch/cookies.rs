//! Cookie scoping: cookies are bound to one domain and can only be rendered
//! into a header for URLs on that domain or its subdomains.

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

#[derive(Clone, Default)]
pub struct CookieScope {
    domain: String,
    cookies: BTreeMap<String, String>,
}

impl fmt::Debug for CookieScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieScope")
            .field("domain", &self.domain)
            .field("names", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// True when `host` equals `domain` or is a subdomain of it (dot boundary).
/// Comparison is case-insensitive and ignores a trailing dot.
pub fn host_matches(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() || host.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

impl CookieScope {
    /// Cookies whose name or value could break the header (`;`, `=` in
    /// names, CR/LF) are dropped.
    pub fn new(domain: impl Into<String>, cookies: BTreeMap<String, String>) -> Self {
        let cookies = cookies
            .into_iter()
            .filter(|(name, value)| {
                let ok = !name.is_empty()
                    && !name.contains(['=', ';', '\r', '\n', ' '])
                    && !value.contains([';', '\r', '\n']);
                if !ok {
                    tracing::warn!(cookie = %name, "dropping malformed cookie");
                }
                ok
            })
            .collect();
        Self {
            domain: domain.into(),
            cookies,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// `Cookie` header value for `url`, or `None` when the host is outside
    /// the scope or there are no cookies.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let host = url.host_str()?;
        if !host_matches(host, &self.domain) {
            return None;
        }
        let value = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> CookieScope {
        let mut c = BTreeMap::new();
        c.insert("session".to_string(), "abc".to_string());
        c.insert("cf_clearance".to_string(), "xyz".to_string());
        CookieScope::new("crotpedia.com", c)
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn domain_and_subdomains_match() {
        assert!(host_matches("crotpedia.com", "crotpedia.com"));
        assert!(host_matches("img.crotpedia.com", "crotpedia.com"));
        assert!(host_matches("A.B.Crotpedia.COM.", "crotpedia.com"));
    }

    #[test]
    fn lookalike_hosts_do_not_match() {
        assert!(!host_matches("evilcrotpedia.com", "crotpedia.com"));
        assert!(!host_matches("crotpedia.com.evil.net", "crotpedia.com"));
        assert!(!host_matches("com", "crotpedia.com"));
        assert!(!host_matches("crotpedia.com", ""));
    }

    #[test]
    fn header_only_for_matching_hosts() {
        let s = scope();
        assert_eq!(
            s.header_for(&url("https://img.crotpedia.com/1.jpg")).as_deref(),
            Some("cf_clearance=xyz; session=abc")
        );
        assert_eq!(s.header_for(&url("https://cdn.other.net/1.jpg")), None);
        assert_eq!(s.header_for(&url("https://evilcrotpedia.com/1.jpg")), None);
        assert_eq!(s.header_for(&url("file:///tmp/x")), None);
    }

    #[test]
    fn malformed_cookies_dropped_and_debug_redacts() {
        let mut c = BTreeMap::new();
        c.insert("ok".to_string(), "secretvalue".to_string());
        c.insert("bad".to_string(), "v\r\nX-Injected: 1".to_string());
        let s = CookieScope::new("crotpedia.com", c);
        assert_eq!(
            s.header_for(&url("https://crotpedia.com/")).as_deref(),
            Some("ok=secretvalue")
        );
        assert!(!format!("{:?}", s).contains("secretvalue"));
    }

    #[test]
    fn empty_scope_sends_nothing() {
        let s = CookieScope::new("crotpedia.com", BTreeMap::new());
        assert!(s.is_empty());
        assert_eq!(s.header_for(&url("https://crotpedia.com/")), None);
    }
}

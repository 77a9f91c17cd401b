//! Outbound destination allow-list.
//!
//! # Design Decisions
//! - Empty list = open mode (explicit operator opt-out)
//! - Subdomains match on a `.` boundary only; `evilexample.com` is not
//!   `example.com`
//! - Unparseable URLs are denied

use std::net::IpAddr;
use std::sync::Arc;

use url::{Host, Url};

/// Read-only set of permitted outbound hosts. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct HostAllowList {
    hosts: Arc<[String]>,
}

impl HostAllowList {
    /// Build from configured entries. Entries are trimmed and lower-cased;
    /// blank ones are dropped.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| normalize_host(h.as_ref()))
            .filter(|h| !h.is_empty())
            .collect();
        Self { hosts: hosts.into() }
    }

    pub fn is_open(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Whether `target_url` may be contacted.
    pub fn is_allowed(&self, target_url: &str) -> bool {
        match Url::parse(target_url) {
            Ok(url) => self.is_url_allowed(&url),
            Err(_) => false,
        }
    }

    pub fn is_url_allowed(&self, url: &Url) -> bool {
        match url.host() {
            Some(Host::Domain(domain)) => self.is_host_allowed(domain),
            Some(Host::Ipv4(addr)) => self.is_host_allowed(&addr.to_string()),
            Some(Host::Ipv6(addr)) => self.is_host_allowed(&addr.to_string()),
            None => false,
        }
    }

    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.is_open() {
            return true;
        }
        let host = normalize_host(host);
        self.hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Lower-cased, without a trailing dot. IP literals lose IPv6 brackets and
/// take their canonical text form.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.');
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    match bare.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => host.to_ascii_lowercase(),
    }
}

/// Free-function form of [`HostAllowList::is_allowed`].
pub fn is_allowed(target_url: &str, allowed_hosts: &HostAllowList) -> bool {
    allowed_hosts.is_allowed(target_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> HostAllowList {
        HostAllowList::new(["example.com", " API.Partner.io "])
    }

    #[test]
    fn test_exact_and_subdomain_match() {
        let allow = list();
        assert!(allow.is_allowed("https://example.com/x"));
        assert!(allow.is_allowed("https://api.example.com/items"));
        assert!(allow.is_allowed("http://a.b.example.com:8443/"));
        assert!(allow.is_allowed("https://api.partner.io"));
    }

    #[test]
    fn test_suffix_without_dot_boundary_denied() {
        let allow = list();
        assert!(!allow.is_allowed("https://evilnotexample.com/"));
        assert!(!allow.is_allowed("https://evilexample.com/"));
        assert!(!allow.is_allowed("https://example.com.evil.org/"));
        assert!(!allow.is_allowed("https://partner.io/"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(list().is_allowed("https://API.EXAMPLE.COM/items"));
    }

    #[test]
    fn test_userinfo_does_not_confuse_host() {
        assert!(!list().is_allowed("https://example.com@evil.com/"));
    }

    #[test]
    fn test_trailing_dot_host() {
        assert!(list().is_allowed("https://api.example.com./"));
    }

    #[test]
    fn test_empty_list_allows_everything() {
        let open = HostAllowList::new(Vec::<String>::new());
        assert!(open.is_open());
        assert!(open.is_allowed("https://anything.test/"));
        assert!(HostAllowList::new([" ", ""]).is_open());
    }

    #[test]
    fn test_unparseable_url_denied() {
        assert!(!list().is_allowed("::not a url::"));
        assert!(!HostAllowList::default().is_allowed("not a url"));
    }

    #[test]
    fn test_free_function() {
        assert!(is_allowed("https://example.com", &list()));
        assert!(!is_allowed("https://evil.com", &list()));
    }

    #[test]
    fn test_ipv6_literal_match() {
        let allow = HostAllowList::new(["[::1]", "2001:db8:0::10"]);
        assert!(allow.is_allowed("http://[::1]:8080/x"));
        assert!(allow.is_allowed("https://[2001:db8::10]/"));
        assert!(!allow.is_allowed("http://[::2]/"));
        assert!(!allow.is_allowed("http://localhost/"));
    }

    #[test]
    fn test_ipv4_literal_match() {
        let allow = HostAllowList::new(["127.0.0.1"]);
        assert!(allow.is_allowed("http://127.0.0.1:3000/"));
        assert!(!allow.is_allowed("http://127.0.0.2/"));
    }
}

// [libs/domain/models/src/proxy.rs]
//! SOCKS5 egress points, grouped by the country they exit through.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single SOCKS5 proxy endpoint available to route bot traffic through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    pub id: i64,
    pub country: String,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Proxy {
    /// Renders the `socks5h://[user:pass@]host:port` connection string
    /// modules hand to their HTTP client. The `h` variant is load-bearing:
    /// DNS resolution happens on the proxy side, which is what lets a
    /// country-routed proxy also control which country's DNS view a C2
    /// lookup sees.
    pub fn connection_string(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("socks5h://{user}:{pass}@{}:{}", self.host, self.port)
            }
            _ => format!("socks5h://{}:{}", self.host, self.port),
        }
    }
}

/// The result of comparing a freshly fetched proxy list against what is
/// currently stored: which endpoints are new and which have disappeared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyDiff {
    pub added: Vec<ProxyDescriptor>,
    pub deleted: Vec<ProxyDescriptor>,
}

/// The natural key of a proxy, used for set comparison independent of its
/// assigned row id. Spec 4.C's identity tuple is `(host, port, country,
/// username, password)` with an unset credential treated as equal to an
/// explicit empty one, so both collapse to `""` here rather than `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyDescriptor {
    pub country: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl From<&Proxy> for ProxyDescriptor {
    fn from(p: &Proxy) -> Self {
        ProxyDescriptor {
            country: p.country.clone(),
            host: p.host.clone(),
            port: p.port,
            username: p.username.clone().unwrap_or_default(),
            password: p.password.clone().unwrap_or_default(),
        }
    }
}

/// Computes the symmetric difference between the proxies already on file
/// and a freshly fetched list, by natural key rather than row id. The
/// repository layer uses this to decide which rows to insert and which to
/// delete without disturbing proxies that are unchanged.
pub fn diff_proxies(current: &[Proxy], fetched: &[ProxyDescriptor]) -> ProxyDiff {
    let current_keys: HashSet<ProxyDescriptor> = current.iter().map(ProxyDescriptor::from).collect();
    let fetched_keys: HashSet<ProxyDescriptor> = fetched.iter().cloned().collect();

    let added = fetched_keys
        .difference(&current_keys)
        .cloned()
        .collect::<Vec<_>>();
    let deleted = current_keys
        .difference(&fetched_keys)
        .cloned()
        .collect::<Vec<_>>();

    ProxyDiff { added, deleted }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(id: i64, country: &str, host: &str, port: u16) -> Proxy {
        Proxy {
            id,
            country: country.to_string(),
            host: host.to_string(),
            port,
            username: None,
            password: None,
        }
    }

    #[test]
    fn connection_string_without_credentials() {
        let p = proxy(1, "pl", "10.0.0.1", 1080);
        assert_eq!(p.connection_string(), "socks5h://10.0.0.1:1080");
    }

    #[test]
    fn connection_string_with_credentials() {
        let mut p = proxy(1, "pl", "10.0.0.1", 1080);
        p.username = Some("u".into());
        p.password = Some("p".into());
        assert_eq!(p.connection_string(), "socks5h://u:p@10.0.0.1:1080");
    }

    fn descriptor(country: &str, host: &str, port: u16) -> ProxyDescriptor {
        ProxyDescriptor {
            country: country.into(),
            host: host.into(),
            port,
            username: String::new(),
            password: String::new(),
        }
    }

    #[test]
    fn diff_finds_added_and_deleted_by_natural_key_not_id() {
        let current = vec![proxy(1, "pl", "1.1.1.1", 1080), proxy(2, "de", "2.2.2.2", 1080)];
        let fetched = vec![descriptor("pl", "1.1.1.1", 1080), descriptor("us", "3.3.3.3", 1080)];
        let diff = diff_proxies(&current, &fetched);
        assert_eq!(diff.added, vec![descriptor("us", "3.3.3.3", 1080)]);
        assert_eq!(diff.deleted, vec![descriptor("de", "2.2.2.2", 1080)]);
    }

    #[test]
    fn unchanged_proxy_list_produces_empty_diff() {
        let current = vec![proxy(1, "pl", "1.1.1.1", 1080)];
        let fetched: Vec<ProxyDescriptor> = current.iter().map(ProxyDescriptor::from).collect();
        let diff = diff_proxies(&current, &fetched);
        assert!(diff.added.is_empty());
        assert!(diff.deleted.is_empty());
    }

    #[test]
    fn credentials_are_part_of_the_identity_tuple() {
        let current = vec![proxy(1, "pl", "1.1.1.1", 1080)];
        let mut with_credentials = descriptor("pl", "1.1.1.1", 1080);
        with_credentials.username = "u".into();
        with_credentials.password = "p".into();
        let diff = diff_proxies(&current, std::slice::from_ref(&with_credentials));
        assert_eq!(diff.added, vec![with_credentials]);
        assert_eq!(diff.deleted, vec![descriptor("pl", "1.1.1.1", 1080)]);
    }

    #[test]
    fn unset_and_empty_credentials_are_treated_as_equal() {
        let mut bare = proxy(1, "pl", "1.1.1.1", 1080);
        bare.username = None;
        bare.password = None;
        let explicit_empty = descriptor("pl", "1.1.1.1", 1080);
        let diff = diff_proxies(std::slice::from_ref(&bare), std::slice::from_ref(&explicit_empty));
        assert!(diff.added.is_empty());
        assert!(diff.deleted.is_empty());
    }
}

use std::fmt;

use anyhow::Result;
use url::{Host, Url};

const SECOND_LEVEL_SUFFIXES: &[&str] = &["ac", "co", "com", "edu", "gov", "ne", "net", "or", "org"];

/// Rejection from [`validate`]; the message is shown to the user as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUrl(String);

impl fmt::Display for InvalidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidUrl {}

fn invalid_url(message: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(InvalidUrl(message.into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Domain,
    Ipv4,
    Ipv6,
    Unknown,
}

/// Structural view of a URL. Never fails to build: text the parser rejects
/// yields an empty host of kind `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTarget {
    pub normalized: String,
    pub scheme: String,
    pub host: String,
    pub host_kind: HostKind,
    pub port: Option<u16>,
    pub path: String,
    pub query_pairs: Vec<(String, String)>,
    pub has_userinfo: bool,
}

impl UrlTarget {
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize(raw);
        let Ok(url) = Url::parse(&normalized) else {
            let scheme = if starts_with_ignore_case(&normalized, "http://") {
                "http"
            } else {
                "https"
            };
            return Self {
                normalized,
                scheme: scheme.to_string(),
                host: String::new(),
                host_kind: HostKind::Unknown,
                port: None,
                path: String::new(),
                query_pairs: vec![],
                has_userinfo: false,
            };
        };

        let (host, host_kind) = match url.host() {
            Some(Host::Domain(d)) if !d.is_empty() => (d.to_ascii_lowercase(), HostKind::Domain),
            Some(Host::Ipv4(ip)) => (ip.to_string(), HostKind::Ipv4),
            Some(Host::Ipv6(ip)) => (ip.to_string(), HostKind::Ipv6),
            _ => (String::new(), HostKind::Unknown),
        };

        Self {
            scheme: url.scheme().to_string(),
            host,
            host_kind,
            port: url.port(),
            path: url.path().to_string(),
            query_pairs: url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            has_userinfo: !url.username().is_empty() || url.password().is_some(),
            normalized,
        }
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    pub fn is_ip_literal(&self) -> bool {
        matches!(self.host_kind, HostKind::Ipv4 | HostKind::Ipv6)
    }

    /// Dot-separated labels of a domain host; empty for IP literals.
    pub fn labels(&self) -> Vec<&str> {
        if self.host_kind != HostKind::Domain {
            return vec![];
        }
        self.host.split('.').filter(|l| !l.is_empty()).collect()
    }

    pub fn tld(&self) -> Option<&str> {
        self.labels().last().copied()
    }

    /// The label that names the domain owner: `example` in `www.example.com`
    /// and in `shop.example.co.uk`.
    pub fn registrable_label(&self) -> Option<&str> {
        let labels = self.labels();
        let n = labels.len();
        match n {
            0 => None,
            1 => Some(labels[0]),
            _ => {
                let tld = labels[n - 1];
                let second = labels[n - 2];
                if n >= 3 && tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(&second) {
                    Some(labels[n - 3])
                } else {
                    Some(second)
                }
            }
        }
    }
}

/// Prepends `https://` unless the input already names http or https.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if starts_with_ignore_case(trimmed, "http://") || starts_with_ignore_case(trimmed, "https://")
    {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Syntax gate run before any scan. Returns the normalized URL.
pub fn validate(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid_url("Please enter a URL"));
    }
    if let Some(scheme) = explicit_scheme(trimmed) {
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            return Err(invalid_url(format!(
                "Please enter a valid URL (unsupported scheme: {scheme})"
            )));
        }
    }

    let normalized = normalize(trimmed);
    let url = Url::parse(&normalized)
        .map_err(|e| invalid_url(format!("Please enter a valid URL ({e})")))?;
    match url.host() {
        Some(Host::Domain(d)) if d.is_empty() => {
            Err(invalid_url("Please enter a valid URL (missing host)"))
        }
        Some(_) => Ok(normalized),
        None => Err(invalid_url("Please enter a valid URL (missing host)")),
    }
}

fn explicit_scheme(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once("://")?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

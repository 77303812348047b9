use std::time::Instant;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::{CheckStatus, RiskLevel, ScanResult, SecurityCheck};
use crate::target::UrlTarget;

pub const MAX_SCORE: u8 = 100;

const LONG_HOST_CHARS: usize = 40;
const MAX_HOST_LABELS: usize = 4;
const MAX_HOST_HYPHENS: usize = 3;

const BASELINE_RECOMMENDATION: &str =
    "No structural risk indicators found; still verify the site before sharing sensitive data";

const BRANDS: &[&str] = &[
    "amazon",
    "bankofamerica",
    "dropbox",
    "facebook",
    "google",
    "instagram",
    "linkedin",
    "microsoft",
    "netflix",
    "paypal",
    "wellsfargo",
    "whatsapp",
];

const PHISHING_KEYWORDS: &[&str] = &[
    "account",
    "banking",
    "confirm",
    "login",
    "password",
    "secure",
    "signin",
    "suspended",
    "unlock",
    "update",
    "verify",
    "wallet",
    "webscr",
];

const SHORTENERS: &[&str] = &[
    "bit.ly",
    "buff.ly",
    "cutt.ly",
    "goo.gl",
    "is.gd",
    "ow.ly",
    "rb.gy",
    "rebrand.ly",
    "shorturl.at",
    "t.co",
    "tiny.cc",
    "tinyurl.com",
];

const SUSPICIOUS_TLDS: &[&str] = &[
    "cf", "click", "country", "ga", "gq", "kim", "loan", "ml", "tk", "top", "work", "xyz", "zip",
];

const REDIRECT_PARAMS: &[&str] = &[
    "continue",
    "dest",
    "destination",
    "goto",
    "next",
    "redirect",
    "redirect_uri",
    "redirect_url",
    "return",
    "returnurl",
    "target",
    "url",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    PlainHttp,
    IpLiteral,
    Shortener,
    Userinfo,
    BrandLookalike,
    DigitSubstitution,
    Punycode,
    SuspiciousTld,
    PhishingKeyword,
    ExcessiveHyphens,
    DeepSubdomains,
    LongHost,
    EmbeddedRedirect,
    NonStandardPort,
}

impl SignalKind {
    pub const fn weight(self) -> u8 {
        match self {
            SignalKind::PlainHttp => 30,
            SignalKind::IpLiteral => 25,
            SignalKind::Shortener | SignalKind::Userinfo => 20,
            SignalKind::BrandLookalike
            | SignalKind::DigitSubstitution
            | SignalKind::Punycode
            | SignalKind::SuspiciousTld => 15,
            SignalKind::PhishingKeyword
            | SignalKind::ExcessiveHyphens
            | SignalKind::DeepSubdomains
            | SignalKind::LongHost
            | SignalKind::EmbeddedRedirect => 10,
            SignalKind::NonStandardPort => 5,
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            SignalKind::PlainHttp => {
                "Avoid entering passwords or payment details on sites without HTTPS"
            }
            SignalKind::IpLiteral => {
                "Be wary of links that point to a raw IP address instead of a named domain"
            }
            SignalKind::Shortener => {
                "Expand shortened links with a preview service before opening them"
            }
            SignalKind::Userinfo => {
                "Ignore the part before '@'; the real destination is the host after it"
            }
            SignalKind::BrandLookalike => {
                "Reach well-known brands by typing their official address yourself"
            }
            SignalKind::DigitSubstitution => {
                "Check the spelling of the domain for digits posing as letters"
            }
            SignalKind::Punycode => {
                "Inspect internationalized domains for characters that imitate Latin letters"
            }
            SignalKind::SuspiciousTld => {
                "Be cautious with domains on top-level domains frequently used for abuse"
            }
            SignalKind::PhishingKeyword => {
                "Do not sign in or confirm account details from links received by email or chat"
            }
            SignalKind::ExcessiveHyphens => {
                "Treat heavily hyphenated domains as possible impersonation attempts"
            }
            SignalKind::DeepSubdomains => {
                "Read the domain right to left; only the last labels identify the owner"
            }
            SignalKind::LongHost => {
                "Double-check unusually long domain names for embedded brand names"
            }
            SignalKind::EmbeddedRedirect => {
                "Check where the embedded redirect target leads before following the link"
            }
            SignalKind::NonStandardPort => {
                "Confirm why the site needs a non-standard port before trusting it"
            }
        }
    }

    /// Signals that feed the "Suspicious Patterns" check.
    pub const fn is_pattern(self) -> bool {
        matches!(
            self,
            SignalKind::BrandLookalike
                | SignalKind::DigitSubstitution
                | SignalKind::Punycode
                | SignalKind::PhishingKeyword
                | SignalKind::ExcessiveHyphens
                | SignalKind::Userinfo
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    pub threat: String,
}

impl Signal {
    fn new(kind: SignalKind, threat: impl Into<String>) -> Self {
        Self {
            kind,
            threat: threat.into(),
        }
    }

    pub fn weight(&self) -> u8 {
        self.kind.weight()
    }
}

/// Signals matched against one URL, plus everything derived from them.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub target: UrlTarget,
    pub signals: Vec<Signal>,
}

impl Assessment {
    pub fn evaluate(target: UrlTarget) -> Self {
        let signals = signals(&target);
        Self { target, signals }
    }

    pub fn score(&self) -> u8 {
        let total: u32 = self.signals.iter().map(|s| u32::from(s.weight())).sum();
        total.min(u32::from(MAX_SCORE)) as u8
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score())
    }

    pub fn has(&self, kind: SignalKind) -> bool {
        self.signals.iter().any(|s| s.kind == kind)
    }

    pub fn threats(&self) -> Vec<String> {
        self.signals.iter().map(|s| s.threat.clone()).collect()
    }

    pub fn recommendations(&self) -> Vec<String> {
        if self.signals.is_empty() {
            return vec![BASELINE_RECOMMENDATION.to_string()];
        }
        let mut out: Vec<String> = Vec::new();
        for signal in &self.signals {
            let rec = signal.kind.recommendation();
            if !out.iter().any(|r| r == rec) {
                out.push(rec.to_string());
            }
        }
        out
    }

    pub fn checks(&self) -> Vec<SecurityCheck> {
        vec![
            self.https_check(),
            self.domain_check(),
            self.pattern_check(),
            self.redirect_check(),
        ]
    }

    fn https_check(&self) -> SecurityCheck {
        const NAME: &str = "HTTPS Encryption";
        if self.has(SignalKind::PlainHttp) {
            SecurityCheck::new(
                NAME,
                CheckStatus::Failed,
                "Connection is not encrypted; data can be read or altered in transit",
            )
        } else {
            SecurityCheck::new(NAME, CheckStatus::Passed, "URL uses the HTTPS scheme")
        }
    }

    fn domain_check(&self) -> SecurityCheck {
        const NAME: &str = "Domain Reputation";
        if self.has(SignalKind::IpLiteral) {
            return SecurityCheck::new(
                NAME,
                CheckStatus::Failed,
                "Host is a bare IP address with no domain identity",
            );
        }
        if self.has(SignalKind::SuspiciousTld) {
            return SecurityCheck::new(
                NAME,
                CheckStatus::Failed,
                format!(
                    "Top-level domain .{} is frequently used for abuse",
                    self.target.tld().unwrap_or_default()
                ),
            );
        }
        if self.target.host.is_empty() {
            return SecurityCheck::new(
                NAME,
                CheckStatus::Warning,
                "Host could not be determined from the URL",
            );
        }
        let mut concerns = Vec::new();
        if self.has(SignalKind::LongHost) {
            concerns.push("unusually long host");
        }
        if self.has(SignalKind::DeepSubdomains) {
            concerns.push("deeply nested subdomains");
        }
        if self.has(SignalKind::NonStandardPort) {
            concerns.push("non-standard port");
        }
        if concerns.is_empty() {
            SecurityCheck::new(
                NAME,
                CheckStatus::Passed,
                "No structural reputation concerns (no reputation database is consulted)",
            )
        } else {
            SecurityCheck::new(
                NAME,
                CheckStatus::Warning,
                format!("Domain structure looks unusual: {}", concerns.join(", ")),
            )
        }
    }

    fn pattern_check(&self) -> SecurityCheck {
        const NAME: &str = "Suspicious Patterns";
        let matched = self.signals.iter().filter(|s| s.kind.is_pattern()).count();
        match matched {
            0 => SecurityCheck::new(
                NAME,
                CheckStatus::Passed,
                "No phishing or impersonation patterns detected",
            ),
            1 => SecurityCheck::new(
                NAME,
                CheckStatus::Warning,
                "One suspicious pattern detected",
            ),
            n => SecurityCheck::new(
                NAME,
                CheckStatus::Failed,
                format!("{n} suspicious patterns detected"),
            ),
        }
    }

    fn redirect_check(&self) -> SecurityCheck {
        const NAME: &str = "Redirect Chain";
        if self.has(SignalKind::Shortener) {
            SecurityCheck::new(
                NAME,
                CheckStatus::Failed,
                "URL shortener hides the final destination",
            )
        } else if self.has(SignalKind::EmbeddedRedirect) {
            SecurityCheck::new(
                NAME,
                CheckStatus::Warning,
                "Query string carries another URL to redirect to",
            )
        } else {
            SecurityCheck::new(
                NAME,
                CheckStatus::Passed,
                "No redirect indicators in the URL (redirects are not followed)",
            )
        }
    }
}

pub fn analyze(raw_url: &str) -> ScanResult {
    analyze_since(raw_url, Instant::now())
}

/// Like [`analyze`], with `scan_duration_ms` measured from `started`.
pub fn analyze_since(raw_url: &str, started: Instant) -> ScanResult {
    let assessment = Assessment::evaluate(UrlTarget::parse(raw_url));
    let scanned_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    ScanResult {
        url: assessment.target.normalized.clone(),
        is_secure: assessment.target.is_https(),
        risk_level: assessment.risk_level(),
        risk_score: assessment.score(),
        threats: assessment.threats(),
        recommendations: assessment.recommendations(),
        scanned_at,
        scan_duration_ms: started.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
    }
}

pub fn checks(raw_url: &str) -> Vec<SecurityCheck> {
    Assessment::evaluate(UrlTarget::parse(raw_url)).checks()
}

pub fn signals(target: &UrlTarget) -> Vec<Signal> {
    let mut out = Vec::new();
    out.extend(plain_http(target));
    out.extend(ip_literal(target));
    out.extend(shortener(target));
    out.extend(userinfo(target));
    out.extend(brand_lookalikes(target));
    out.extend(digit_substitution(target));
    out.extend(punycode(target));
    out.extend(suspicious_tld(target));
    out.extend(phishing_keywords(target));
    out.extend(excessive_hyphens(target));
    out.extend(deep_subdomains(target));
    out.extend(long_host(target));
    out.extend(embedded_redirect(target));
    out.extend(non_standard_port(target));
    out
}

fn plain_http(t: &UrlTarget) -> Option<Signal> {
    if t.is_https() {
        return None;
    }
    Some(Signal::new(
        SignalKind::PlainHttp,
        "Connection is not encrypted (HTTP instead of HTTPS)",
    ))
}

fn ip_literal(t: &UrlTarget) -> Option<Signal> {
    if !t.is_ip_literal() {
        return None;
    }
    Some(Signal::new(
        SignalKind::IpLiteral,
        format!("Uses an IP address ({}) instead of a domain name", t.host),
    ))
}

fn shortener(t: &UrlTarget) -> Option<Signal> {
    let s = SHORTENERS.iter().find(|s| host_is_or_under(&t.host, s))?;
    Some(Signal::new(
        SignalKind::Shortener,
        format!("URL shortener ({s}) hides the final destination"),
    ))
}

fn userinfo(t: &UrlTarget) -> Option<Signal> {
    if !t.has_userinfo {
        return None;
    }
    Some(Signal::new(
        SignalKind::Userinfo,
        "URL embeds credentials or text before '@' to disguise the real host",
    ))
}

fn brand_lookalikes(t: &UrlTarget) -> Vec<Signal> {
    let owner = t.registrable_label();
    BRANDS
        .iter()
        .filter(|brand| t.host.contains(*brand) && owner != Some(**brand))
        .map(|brand| {
            Signal::new(
                SignalKind::BrandLookalike,
                format!("Domain mentions \"{brand}\" but is not operated under {brand}'s own domain"),
            )
        })
        .collect()
}

fn digit_substitution(t: &UrlTarget) -> Option<Signal> {
    let (label, spelled) = t.labels().into_iter().find_map(|label| {
        if !label.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        let read = read_digits_as_letters(label);
        BRANDS
            .iter()
            .chain(PHISHING_KEYWORDS.iter())
            .find(|word| read.contains(*word) && !label.contains(*word))
            .map(|word| (label, *word))
    })?;
    Some(Signal::new(
        SignalKind::DigitSubstitution,
        format!("Domain label \"{label}\" imitates \"{spelled}\" with digits"),
    ))
}

fn punycode(t: &UrlTarget) -> Option<Signal> {
    if !t.labels().iter().any(|l| l.starts_with("xn--")) {
        return None;
    }
    Some(Signal::new(
        SignalKind::Punycode,
        "Domain uses internationalized characters that may imitate another site",
    ))
}

fn suspicious_tld(t: &UrlTarget) -> Option<Signal> {
    let tld = t.tld()?;
    if !SUSPICIOUS_TLDS.contains(&tld) {
        return None;
    }
    Some(Signal::new(
        SignalKind::SuspiciousTld,
        format!("Top-level domain .{tld} is frequently used for abuse"),
    ))
}

fn phishing_keywords(t: &UrlTarget) -> Vec<Signal> {
    let haystack = format!("{}{}", t.host, t.path.to_ascii_lowercase());
    PHISHING_KEYWORDS
        .iter()
        .filter(|kw| haystack.contains(*kw))
        .map(|kw| {
            Signal::new(
                SignalKind::PhishingKeyword,
                format!("Suspicious keyword \"{kw}\" in URL"),
            )
        })
        .collect()
}

fn excessive_hyphens(t: &UrlTarget) -> Option<Signal> {
    let n = t.host.matches('-').count();
    if n < MAX_HOST_HYPHENS {
        return None;
    }
    Some(Signal::new(
        SignalKind::ExcessiveHyphens,
        format!("Domain contains {n} hyphens"),
    ))
}

fn deep_subdomains(t: &UrlTarget) -> Option<Signal> {
    let n = t.labels().len();
    if n <= MAX_HOST_LABELS {
        return None;
    }
    Some(Signal::new(
        SignalKind::DeepSubdomains,
        format!("Domain has {n} levels of nesting"),
    ))
}

fn long_host(t: &UrlTarget) -> Option<Signal> {
    let n = t.host.chars().count();
    if n <= LONG_HOST_CHARS {
        return None;
    }
    Some(Signal::new(
        SignalKind::LongHost,
        format!("Unusually long domain name ({n} characters)"),
    ))
}

fn embedded_redirect(t: &UrlTarget) -> Option<Signal> {
    let (key, _) = t.query_pairs.iter().find(|(k, v)| {
        let k = k.to_ascii_lowercase();
        let v = v.trim().to_ascii_lowercase();
        REDIRECT_PARAMS.contains(&k.as_str())
            && (v.starts_with("http://") || v.starts_with("https://") || v.starts_with("//"))
    })?;
    Some(Signal::new(
        SignalKind::EmbeddedRedirect,
        format!("Query parameter \"{key}\" redirects to another URL"),
    ))
}

fn non_standard_port(t: &UrlTarget) -> Option<Signal> {
    let port = t.port?;
    Some(Signal::new(
        SignalKind::NonStandardPort,
        format!("Uses non-standard port {port}"),
    ))
}

fn host_is_or_under(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn read_digits_as_letters(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '0' => 'o',
            '1' => 'l',
            '3' => 'e',
            '4' => 'a',
            '5' => 's',
            '7' => 't',
            other => other,
        })
        .collect()
}

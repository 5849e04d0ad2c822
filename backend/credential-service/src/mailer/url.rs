/// Confirmation URL composition
///
/// A caller-supplied referrer is only used when it is an absolute http(s) URL
/// whose host is allow-listed; anything else is refused rather than replaced
/// with the site origin.
use crate::error::{CredentialError, Result};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Exact(String),
    /// `*.example.com`: any subdomain, not the apex
    Subdomain(String),
}

/// Hosts a referrer may point to
#[derive(Debug, Clone, Default)]
pub struct RedirectAllowList {
    patterns: Vec<HostPattern>,
}

impl RedirectAllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for host in hosts {
            list.add(host.as_ref());
        }
        list
    }

    pub fn add(&mut self, host: &str) {
        let host = host.trim().to_ascii_lowercase();
        if host.is_empty() {
            return;
        }
        let pattern = match host.strip_prefix("*.") {
            Some(domain) => HostPattern::Subdomain(format!(".{domain}")),
            None => HostPattern::Exact(host),
        };
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Also allow the host of the configured site
    pub fn with_site(mut self, site_url: &Url) -> Self {
        if let Some(host) = site_url.host_str() {
            self.add(host);
        }
        self
    }

    pub fn allows(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.patterns.iter().any(|pattern| match pattern {
            HostPattern::Exact(exact) => *exact == host,
            HostPattern::Subdomain(suffix) => host.ends_with(suffix.as_str()),
        })
    }
}

/// Validate a referrer against the allow-list
pub fn checked_referrer(referrer: &str, allow_list: &RedirectAllowList) -> Result<Url> {
    checked_origin("referrer", referrer, allow_list)
}

/// Validate a template's site origin override against the allow-list
pub fn checked_base_url(base_url: &str, allow_list: &RedirectAllowList) -> Result<Url> {
    checked_origin("base URL", base_url, allow_list)
}

fn checked_origin(what: &str, raw: &str, allow_list: &RedirectAllowList) -> Result<Url> {
    let url = Url::parse(raw).map_err(|_| {
        CredentialError::UnsafeRedirect(format!("{what} is not an absolute URL"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CredentialError::UnsafeRedirect(format!(
            "{what} scheme {} is not allowed",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if allow_list.allows(host) => Ok(url),
        Some(host) => Err(CredentialError::UnsafeRedirect(format!(
            "{what} host {host} is not allow-listed"
        ))),
        None => Err(CredentialError::UnsafeRedirect(format!("{what} has no host"))),
    }
}

/// Build `<origin><callback_path>?<param>=<token>`.
///
/// The origin is the referrer when given (and allowed), otherwise `site_url`.
pub fn confirmation_url(
    referrer: Option<&str>,
    site_url: &Url,
    allow_list: &RedirectAllowList,
    callback_path: &str,
    param: &str,
    token: &str,
) -> Result<Url> {
    let base = match referrer.map(str::trim).filter(|r| !r.is_empty()) {
        Some(referrer) => checked_referrer(referrer, allow_list)?,
        None => site_url.clone(),
    };

    let mut url = base.join(callback_path).map_err(|e| {
        CredentialError::Validation(format!("invalid callback path {callback_path}: {e}"))
    })?;
    if url.origin() != base.origin() {
        return Err(CredentialError::UnsafeRedirect(
            "callback path leaves the site origin".to_string(),
        ));
    }

    url.set_fragment(None);
    url.query_pairs_mut().append_pair(param, token);
    Ok(url)
}

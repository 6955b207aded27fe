//! `Set-Cookie` domain rewriting.
//!
//! Every `Domain` attribute is dropped and one scoped to the client host is
//! appended. No domain is added for IP literals or single-label hosts such
//! as `localhost`; the cookie then defaults to host-only.

use std::net::IpAddr;

/// How widely a rewritten cookie is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieScope {
    /// `Domain=.<host>`: the host and its subdomains.
    Subdomain,
    /// `Domain=<host>`.
    Host,
}

/// Rewrite one `Set-Cookie` value. Returns `None` when nothing is left of
/// the cookie after removing its domain.
pub fn rewrite_set_cookie(value: &str, client_host: &str, scope: CookieScope) -> Option<String> {
    let attributes: Vec<&str> = value
        .split(';')
        .map(str::trim)
        .filter(|attr| !attr.is_empty() && !is_domain_attribute(attr))
        .collect();

    // The first part is the name=value pair; a cookie made only of
    // attributes is dropped
    let first = attributes.first()?;
    if !first.contains('=') {
        return None;
    }

    let mut cookie = attributes.join("; ");
    if let Some(domain) = cookie_domain(client_host, scope) {
        cookie.push_str("; Domain=");
        cookie.push_str(&domain);
    }
    Some(cookie)
}

fn is_domain_attribute(attr: &str) -> bool {
    let name = attr.split('=').next().unwrap_or_default().trim();
    name.eq_ignore_ascii_case("domain")
}

fn cookie_domain(client_host: &str, scope: CookieScope) -> Option<String> {
    let host = client_host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() || host.parse::<IpAddr>().is_ok() || !host.contains('.') {
        return None;
    }
    Some(match scope {
        CookieScope::Subdomain => format!(".{host}"),
        CookieScope::Host => host.to_string(),
    })
}

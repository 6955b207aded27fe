//! HTML body rewriting.
//!
//! A textual heuristic, not an HTML parser: the primary origin's domain is
//! replaced with the client host and `href` links into an aliased segment
//! are pointed at the alias. Malformed markup is rewritten the same way as
//! well-formed markup and never causes an error.

use std::borrow::Cow;

use axum::http::{header, HeaderMap};
use regex::{Captures, NoExpand, Regex};

use crate::rewrite::redirect::PathAlias;

#[derive(Debug, Clone)]
struct HrefRule {
    alias: String,
    double_quoted: Regex,
    single_quoted: Regex,
}

#[derive(Debug, Clone)]
pub struct HtmlRewriter {
    primary_domain: Regex,
    hrefs: Vec<HrefRule>,
}

impl HtmlRewriter {
    pub fn new(primary_domain: &str, aliases: &[PathAlias]) -> Result<Self, regex::Error> {
        let hrefs = aliases
            .iter()
            .map(|a| {
                let segment = regex::escape(&a.canonical);
                Ok(HrefRule {
                    alias: a.alias.clone(),
                    double_quoted: Regex::new(&format!(r#"(?i)href="{segment}([/?"])"#))?,
                    single_quoted: Regex::new(&format!(r#"(?i)href='{segment}([/?'])"#))?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            primary_domain: Regex::new(&regex::escape(primary_domain))?,
            hrefs,
        })
    }

    /// Whether a body with these headers can be rewritten as text.
    pub fn is_rewritable(headers: &HeaderMap) -> bool {
        let is_html = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
        let encoded = headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|enc| !enc.trim().eq_ignore_ascii_case("identity"));
        is_html && !encoded
    }

    /// Replace the primary domain with the client host.
    pub fn replace_domain<'a>(&self, body: &'a str, client_host: &str) -> Cow<'a, str> {
        self.primary_domain.replace_all(body, NoExpand(client_host))
    }

    /// Point `href` links into aliased segments at their alias.
    pub fn rewrite_hrefs(&self, body: &str) -> String {
        let mut out = body.to_string();
        for rule in &self.hrefs {
            out = rule
                .double_quoted
                .replace_all(&out, |caps: &Captures| format!("href=\"{}{}", rule.alias, &caps[1]))
                .into_owned();
            out = rule
                .single_quoted
                .replace_all(&out, |caps: &Captures| format!("href='{}{}", rule.alias, &caps[1]))
                .into_owned();
        }
        out
    }

    /// Rewrite a body. `None` when it is not valid UTF-8.
    pub fn rewrite(&self, body: &[u8], client_host: &str, with_aliases: bool) -> Option<String> {
        let text = std::str::from_utf8(body).ok()?;
        let replaced = self.replace_domain(text, client_host);
        Some(if with_aliases {
            self.rewrite_hrefs(&replaced)
        } else {
            replaced.into_owned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn rewriter() -> HtmlRewriter {
        HtmlRewriter::new("shop.example.myshopify.com", &[PathAlias::new("/account", "-online")]).unwrap()
    }

    #[test]
    fn test_domain_and_hrefs() {
        let html = r#"<a href="https://shop.example.myshopify.com/products/x">x</a>
<a href="/account">a</a><a href='/account/orders'>o</a><a href="/account?tab=1">t</a>
<a href="/accounts">no</a><a href="/account-online/orders">done</a>"#;

        let out = rewriter().rewrite(html.as_bytes(), "www.example.com", true).unwrap();
        assert!(out.contains(r#"href="https://www.example.com/products/x""#));
        assert!(out.contains(r#"href="/account-online""#));
        assert!(out.contains("href='/account-online/orders'"));
        assert!(out.contains(r#"href="/account-online?tab=1""#));
        assert!(out.contains(r#"href="/accounts""#));
        assert!(out.contains(r#"href="/account-online/orders">done"#));
        assert!(!out.contains("myshopify"));
    }

    #[test]
    fn test_domain_only() {
        let out = rewriter()
            .rewrite(b"<a href=\"/account\">shop.example.myshopify.com</a>", "www.example.com", false)
            .unwrap();
        assert_eq!(out, "<a href=\"/account\">www.example.com</a>");
    }

    #[test]
    fn test_malformed_markup_and_binary() {
        let out = rewriter().rewrite(b"<a href=\"/account/x", "h.example.com", true).unwrap();
        assert_eq!(out, "<a href=\"/account-online/x");
        assert_eq!(rewriter().rewrite(&[0xff, 0xfe], "h.example.com", true), None);
    }

    #[test]
    fn test_is_rewritable() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        assert!(HtmlRewriter::is_rewritable(&headers));

        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(!HtmlRewriter::is_rewritable(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.remove(header::CONTENT_ENCODING);
        assert!(!HtmlRewriter::is_rewritable(&headers));
    }
}

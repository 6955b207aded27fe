//! Location header rewriting and path aliases.
//!
//! # Responsibilities
//! - Replace origin hostnames in `Location` with the client host
//! - Make relative locations absolute on the client host
//! - Re-apply path aliases so clients stay on the suffixed paths
//!
//! # Design Decisions
//! - Alias application is segment-aware: `/account/x` gets the suffix,
//!   `/accounts` and an already suffixed path do not
//! - Locations already on the client host pass through untouched

use regex::{NoExpand, Regex};
use url::Url;

use crate::config::AliasConfig;
use crate::rewrite::{RewriteContext, RewriteError, RewriteMode};

/// A primary-origin path segment exposed to clients under a suffixed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAlias {
    /// What the primary origin serves, e.g. `/account`.
    pub canonical: String,
    /// What clients use, e.g. `/account-online`.
    pub alias: String,
}

impl PathAlias {
    pub fn new(canonical: impl Into<String>, suffix: &str) -> Self {
        let canonical = canonical.into();
        let alias = format!("{canonical}{suffix}");
        Self { canonical, alias }
    }

    pub fn from_config(config: &AliasConfig) -> Self {
        Self::new(config.segment.clone(), &config.suffix)
    }

    /// Client path → origin path. `None` when the path is not under the alias.
    pub fn strip(&self, path: &str) -> Option<String> {
        let rest = after_segment(path, &self.alias, &['/'])?;
        Some(format!("{}{}", self.canonical, rest))
    }

    /// Origin path (optionally with query) → client path. `None` when the
    /// path is not under the canonical segment.
    pub fn apply(&self, path: &str) -> Option<String> {
        let rest = after_segment(path, &self.canonical, &['/', '?', '#'])?;
        Some(format!("{}{}", self.alias, rest))
    }
}

/// The remainder of `path` after `segment`, if `path` is exactly the segment
/// or continues with one of `separators`.
fn after_segment<'a>(path: &'a str, segment: &str, separators: &[char]) -> Option<&'a str> {
    let rest = path.strip_prefix(segment)?;
    if rest.is_empty() || rest.starts_with(separators) {
        Some(rest)
    } else {
        None
    }
}

/// Apply the first matching alias, or return the path unchanged.
pub(crate) fn apply_aliases(aliases: &[PathAlias], path: &str) -> String {
    aliases
        .iter()
        .find_map(|a| a.apply(path))
        .unwrap_or_else(|| path.to_string())
}

/// Rewrites `Location` values for one pair of origins.
#[derive(Debug, Clone)]
pub struct LocationRewriter {
    headless_base: String,
    primary_domain: String,
    primary_url: Regex,
    aliases: Vec<PathAlias>,
}

impl LocationRewriter {
    pub fn new(
        headless_base: &str,
        primary_domain: &str,
        aliases: Vec<PathAlias>,
    ) -> Result<Self, regex::Error> {
        let primary_url = Regex::new(&format!("(?i)https?://{}", regex::escape(primary_domain)))?;
        Ok(Self {
            headless_base: headless_base.to_string(),
            primary_domain: primary_domain.to_string(),
            primary_url,
            aliases,
        })
    }

    /// Rewrite one `Location` value for the client.
    pub fn rewrite(&self, location: &str, ctx: &RewriteContext) -> Result<String, RewriteError> {
        let client_base = format!("https://{}", ctx.client_host);
        let with_alias = ctx.mode != RewriteMode::Password;

        if ctx.mode != RewriteMode::Password
            && !self.headless_base.is_empty()
            && location.contains(&self.headless_base)
        {
            return Ok(location.replacen(&self.headless_base, &client_base, 1));
        }

        if location.contains(&self.primary_domain) {
            let replaced = self
                .primary_url
                .replace_all(location, NoExpand(&client_base))
                .into_owned();
            return self.finish(replaced, &client_base, with_alias);
        }

        if is_relative(location) {
            let path = if with_alias && !ctx.is_headless {
                apply_aliases(&self.aliases, location)
            } else {
                location.to_string()
            };
            return Ok(format!("{client_base}{path}"));
        }

        Ok(location.to_string())
    }

    /// Apply aliases to a location whose origin domain has been replaced.
    fn finish(&self, location: String, client_base: &str, with_alias: bool) -> Result<String, RewriteError> {
        if is_relative(&location) {
            let path = if with_alias {
                apply_aliases(&self.aliases, &location)
            } else {
                location
            };
            return Ok(format!("{client_base}{path}"));
        }
        if !with_alias {
            return Ok(location);
        }

        let mut url = Url::parse(&location).map_err(|source| RewriteError::InvalidLocation {
            location: location.clone(),
            source,
        })?;
        if let Some(path) = self.aliases.iter().find_map(|a| a.apply(url.path())) {
            url.set_path(&path);
        }
        Ok(url.to_string())
    }
}

fn is_relative(location: &str) -> bool {
    location.starts_with('/') && !location.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::origin::OriginLabel;

    const HEADLESS: &str = "https://headless.example.myshopify.dev";
    const PRIMARY: &str = "shop.example.myshopify.com";

    fn rewriter() -> LocationRewriter {
        LocationRewriter::new(HEADLESS, PRIMARY, vec![PathAlias::new("/account", "-online")]).unwrap()
    }

    fn ctx(mode: RewriteMode, is_headless: bool) -> RewriteContext {
        RewriteContext {
            original_url: Url::parse("https://www.example.com/").unwrap(),
            client_host: "www.example.com".to_string(),
            origin: if is_headless {
                OriginLabel::Headless
            } else {
                OriginLabel::Primary
            },
            is_bypass: false,
            is_headless,
            mode,
        }
    }

    #[test]
    fn test_alias_segments() {
        let alias = PathAlias::new("/account", "-online");
        assert_eq!(alias.apply("/account").as_deref(), Some("/account-online"));
        assert_eq!(alias.apply("/account/orders").as_deref(), Some("/account-online/orders"));
        assert_eq!(alias.apply("/account?x=1").as_deref(), Some("/account-online?x=1"));
        assert_eq!(alias.apply("/accounts"), None);
        assert_eq!(alias.apply("/account-online/orders"), None);

        assert_eq!(alias.strip("/account-online/orders").as_deref(), Some("/account/orders"));
        assert_eq!(alias.strip("/account-online").as_deref(), Some("/account"));
        assert_eq!(alias.strip("/account-onlinex"), None);
        assert_eq!(alias.strip("/account/orders"), None);
    }

    #[test]
    fn test_headless_absolute_location() {
        let out = rewriter()
            .rewrite(&format!("{HEADLESS}/collections/all"), &ctx(RewriteMode::Routed, true))
            .unwrap();
        assert_eq!(out, "https://www.example.com/collections/all");
    }

    #[test]
    fn test_primary_absolute_location_gets_alias() {
        let r = rewriter();
        let ctx = ctx(RewriteMode::Alias, false);
        assert_eq!(
            r.rewrite("https://shop.example.myshopify.com/account/orders", &ctx).unwrap(),
            "https://www.example.com/account-online/orders"
        );
        assert_eq!(
            r.rewrite("HTTP://shop.example.myshopify.com/account", &ctx).unwrap(),
            "https://www.example.com/account-online"
        );
    }

    #[test]
    fn test_relative_location() {
        let r = rewriter();
        assert_eq!(
            r.rewrite("/account/login", &ctx(RewriteMode::Routed, false)).unwrap(),
            "https://www.example.com/account-online/login"
        );
        assert_eq!(
            r.rewrite("/account/login", &ctx(RewriteMode::Routed, true)).unwrap(),
            "https://www.example.com/account/login"
        );
        assert_eq!(
            r.rewrite("/account/login", &ctx(RewriteMode::Password, false)).unwrap(),
            "https://www.example.com/account/login"
        );
    }

    #[test]
    fn test_password_mode_replaces_domain_without_alias() {
        let out = rewriter()
            .rewrite(
                "http://shop.example.myshopify.com/account",
                &ctx(RewriteMode::Password, false),
            )
            .unwrap();
        assert_eq!(out, "https://www.example.com/account");
    }

    #[test]
    fn test_client_host_location_is_untouched() {
        let r = rewriter();
        for location in [
            "https://www.example.com/account-online/orders",
            "https://www.example.com/account/orders",
            "//cdn.example.com/x.js",
        ] {
            assert_eq!(r.rewrite(location, &ctx(RewriteMode::Routed, false)).unwrap(), location);
        }
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let r = rewriter();
        let ctx = ctx(RewriteMode::Alias, false);
        let once = r.rewrite("/account/orders", &ctx).unwrap();
        assert_eq!(r.rewrite(&once, &ctx).unwrap(), once);
    }

    #[test]
    fn test_embedded_domain_in_relative_location() {
        let out = rewriter()
            .rewrite(
                "/account/login?return_to=https://shop.example.myshopify.com/cart",
                &ctx(RewriteMode::Routed, false),
            )
            .unwrap();
        assert_eq!(
            out,
            "https://www.example.com/account-online/login?return_to=https://www.example.com/cart"
        );
    }
}

//! Origin descriptors.
//!
//! Built once from configuration. The descriptor knows how to turn a
//! client path and query into the URL forwarded to the origin.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::config::{OriginConfig, OriginsConfig};
use crate::error::SetupError;

/// Which of the two backends served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginLabel {
    Headless,
    Primary,
}

impl OriginLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginLabel::Headless => "headless",
            OriginLabel::Primary => "primary",
        }
    }
}

impl fmt::Display for OriginLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable origin: where to send requests and which `Host` to send.
#[derive(Debug, Clone)]
pub struct OriginDescriptor {
    pub label: OriginLabel,
    pub base_url: Url,
    pub host: String,
}

impl OriginDescriptor {
    pub fn from_config(label: OriginLabel, config: &OriginConfig) -> Result<Self, SetupError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| SetupError::InvalidOrigin {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        let authority = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(SetupError::InvalidOrigin {
                    url: config.base_url.clone(),
                    reason: "missing host".to_string(),
                })
            }
        };

        Ok(Self {
            label,
            host: config.host.clone().unwrap_or(authority),
            base_url,
        })
    }

    /// Hostname of the base URL, without port.
    pub fn domain(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    /// The base URL without a trailing slash, e.g. `https://shop.example.com`.
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// The URL a client path and query are forwarded to.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }
}

/// Both origins.
#[derive(Debug, Clone)]
pub struct Origins {
    pub headless: OriginDescriptor,
    pub primary: OriginDescriptor,
}

impl Origins {
    pub fn from_config(config: &OriginsConfig) -> Result<Self, SetupError> {
        Ok(Self {
            headless: OriginDescriptor::from_config(OriginLabel::Headless, &config.headless)?,
            primary: OriginDescriptor::from_config(OriginLabel::Primary, &config.primary)?,
        })
    }

    pub fn get(&self, label: OriginLabel) -> &OriginDescriptor {
        match label {
            OriginLabel::Headless => &self.headless,
            OriginLabel::Primary => &self.primary,
        }
    }
}

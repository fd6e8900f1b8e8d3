// # HTTP IP Source
//
// This crate discovers the caller's public IP by querying an IP echo
// service: a single GET whose entire trimmed response body is the address.
//
// ## Services
//
// Any endpoint that answers with a bare IPv4 text body works. Commonly used:
// - https://api.ipify.org
// - https://ifconfig.me/ip
// - https://icanhazip.com
//
// The lookup is single-shot: no retries, no polling, no failover. A failed
// or malformed lookup aborts the whole invocation.

use sgsync_core::traits::{DottedQuad, IpSource};
use sgsync_core::{Error, Result};

use std::time::Duration;

/// Timeout for the lookup request
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based IP source
pub struct HttpIpSource {
    /// URL to fetch the IP from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL of the IP echo service (e.g. "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// The configured lookup URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<DottedQuad> {
        tracing::debug!(url = %self.url, "looking up current IP");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_lookup(format!("request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_lookup(format!(
                "{} answered {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_lookup(format!("failed to read response body: {}", e)))?;

        let quad = parse_body(&body)?;
        tracing::debug!(ip = %quad, "current IP discovered");
        Ok(quad)
    }
}

/// The entire trimmed body is the candidate address
fn parse_body(body: &str) -> Result<DottedQuad> {
    DottedQuad::parse(body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_keeps_configured_url() {
        let source = HttpIpSource::new("https://api.ipify.org");
        assert_eq!(source.url(), "https://api.ipify.org");
    }

    #[test]
    fn test_body_is_trimmed_before_validation() {
        let quad = parse_body("  203.0.113.5\n").unwrap();
        assert_eq!(quad.as_str(), "203.0.113.5");
    }

    #[test]
    fn test_non_ip_body_rejected() {
        assert!(parse_body("<html>busy</html>").is_err());
        assert!(parse_body("").is_err());
        // Extra tokens around the address are not tolerated; the whole body
        // must be the address.
        assert!(parse_body("your ip is 203.0.113.5").is_err());
    }
}

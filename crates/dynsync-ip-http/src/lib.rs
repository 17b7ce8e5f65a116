//! HTTP-based public IP information sources
//!
//! Each source wraps one plain-text "what is my IP" endpoint (ipify,
//! icanhazip, ifconfig.me and friends). A source performs exactly one GET
//! per `fetch` call, trims the body and parses it as an address; the
//! resolver in dynsync-core owns fallback across the ordered source list.

use async_trait::async_trait;
use dynsync_core::{Error, IpFamily, IpInfoSource};
use std::net::IpAddr;
use tracing::debug;

/// One plain-text HTTP IP endpoint
pub struct HttpIpInfoSource {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpIpInfoSource {
    /// Wrap an endpoint URL. The shared client carries the pool and the
    /// request timeout; clones of it reuse both.
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        let url = url.into();
        Self {
            name: url.clone(),
            url,
            client,
        }
    }
}

#[async_trait]
impl IpInfoSource for HttpIpInfoSource {
    async fn fetch(&self, family: IpFamily) -> Result<IpAddr, Error> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::http(format!("GET {}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http(format!("GET {}: status {}", self.url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("reading {}: {}", self.url, e)))?;

        let ip = parse_ip_body(&body)?;
        debug!(source = %self.url, %ip, %family, "fetched public address");
        Ok(ip)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Parse a plain-text IP response body (single address, surrounding
/// whitespace tolerated). A malformed body is a per-source failure; the
/// resolver decides whether the family as a whole has failed.
fn parse_ip_body(body: &str) -> Result<IpAddr, Error> {
    let trimmed = body.trim();
    trimmed.parse().map_err(|_| {
        Error::http(format!(
            "response is not an IP address: {:?}",
            truncate(trimmed, 64)
        ))
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Build sources from an ordered URL list, all sharing one client
pub fn sources_from_config(urls: &[String], client: &reqwest::Client) -> Vec<Box<dyn IpInfoSource>> {
    urls.iter()
        .map(|url| Box::new(HttpIpInfoSource::new(url.clone(), client.clone())) as Box<dyn IpInfoSource>)
        .collect()
}

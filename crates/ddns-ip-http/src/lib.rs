// # HTTP IP Resolver
//
// This crate provides the HTTP-based public address lookup for the DDNS
// daemon.
//
// ## Purpose
//
// Asks an "echo my IP" service (e.g. https://api.ipify.org) which address
// the request came from. Each zone names its own provider URL, so A and AAAA
// zones can use IPv4-only and IPv6-only services.
//
// ## Contract
//
// - One GET per call, no internal retries (the engine's RetryExecutor owns
//   retries)
// - Only `200 OK` is accepted
// - At most 64 bytes of the body are read; the rest is never buffered
// - The trimmed body must be an IP literal

use ddns_core::traits::IpResolver;
use ddns_core::{Error, Result};

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Largest response body read from an IP provider
pub const MAX_BODY_BYTES: usize = 64;

/// Resolves the public address through plain-text HTTP services
pub struct HttpIpResolver {
    /// HTTP client (carries the client-level timeout)
    client: reqwest::Client,

    /// Identification header, if configured
    user_agent: Option<String>,

    /// Client timeout, reported when a request times out
    timeout: Duration,
}

impl HttpIpResolver {
    /// Create a resolver
    ///
    /// # Parameters
    ///
    /// - `timeout`: client-level timeout for each request
    /// - `user_agent`: `User-Agent` header value; blank disables the header
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport("failed to build HTTP client", e))?;

        let user_agent = user_agent.into();
        let user_agent = user_agent.trim();

        Ok(Self {
            client,
            user_agent: (!user_agent.is_empty()).then(|| user_agent.to_string()),
            timeout,
        })
    }

    fn request_error(&self, context: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::transport(context, err)
        }
    }

    /// Read up to `limit` bytes of the body, chunk by chunk
    async fn read_capped(&self, response: &mut reqwest::Response, limit: usize) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(limit);
        while body.len() < limit {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| self.request_error("failed to read IP provider response", e))?;
            let Some(chunk) = chunk else {
                break;
            };
            let take = chunk.len().min(limit - body.len());
            body.extend_from_slice(&chunk[..take]);
        }
        Ok(body)
    }
}

impl std::fmt::Debug for HttpIpResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIpResolver")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self, provider_url: &str) -> Result<IpAddr> {
        let mut request = self.client.get(provider_url).header(ACCEPT, "text/plain");
        if let Some(user_agent) = &self.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| self.request_error("IP provider request failed", e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::upstream(
                status.as_u16(),
                format!("IP provider {provider_url} returned {status}"),
            ));
        }

        let body = self.read_capped(&mut response, MAX_BODY_BYTES).await?;
        let text = String::from_utf8_lossy(&body);
        let text = text.trim();
        debug!(provider = provider_url, body = text, "IP provider responded");

        text.parse::<IpAddr>()
            .map_err(|_| Error::invalid_address(text))
    }
}

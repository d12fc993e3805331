// # Hetzner Cloud DNS Provider
//
// This crate provides the Hetzner Cloud DNS implementation of the
// `ZoneProvider` trait.
//
// ## Trust Level: Untrusted (Zone Provider)
//
// Providers are single-shot HTTP clients:
//
// - One HTTP request per trait call
// - Full error propagation; retries, backoff and timeouts per call are owned
//   by the engine's RetryExecutor
// - No caching, no background tasks
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Hetzner Cloud API v1: https://docs.hetzner.cloud/
// - List Zones: GET `/zones?name=...`
// - Get RRSet: GET `/zones/:zone/rrsets/:name/:type`
// - Create RRSet: POST `/zones/:zone/rrsets`
// - RRSet actions: POST `/zones/:zone/rrsets/:name/:type/actions/{add_records,set_records,change_ttl}`
//
// Action endpoints answer with an action object, not the record set. The
// provider applies the same mutation to its copy of the record set and
// returns that, so callers always see the state the API will converge to.

mod wire;

use async_trait::async_trait;
use ddns_core::config::RecordType;
use ddns_core::traits::{RRSet, Zone, ZoneProvider};
use ddns_core::{Error, Result};
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use wire::{
    ActionResponse, AddRecordsRequest, ChangeTtlRequest, CreateRRSetRequest, ErrorResponse,
    RRSetResponse, SetRecordsRequest, ZonesResponse,
};

/// Hetzner Cloud API base URL
pub const HETZNER_API_BASE: &str = "https://api.hetzner.cloud/v1";

/// Hetzner Cloud DNS provider
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct HetznerProvider {
    /// Hetzner Cloud API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Client timeout, reported when a request times out
    timeout: Duration,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for HetznerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HetznerProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HetznerProvider {
    /// Create a new Hetzner provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Hetzner Cloud API token with read/write access to DNS zones
    /// - `timeout`: HTTP client timeout for each request
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is blank, `Error::Transport` if the HTTP
    /// client cannot be built.
    pub fn new(api_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Hetzner API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport("failed to build HTTP client", e))?;

        Ok(Self {
            api_token,
            base_url: HETZNER_API_BASE.to_string(),
            client,
            timeout,
        })
    }

    /// Point the provider at another API base URL (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn rrset_url(&self, zone_id: &str, name: &str, record_type: RecordType) -> String {
        format!(
            "{}/zones/{}/rrsets/{}/{}",
            self.base_url, zone_id, name, record_type
        )
    }

    fn action_url(&self, rrset: &RRSet, action: &str) -> String {
        format!(
            "{}/actions/{}",
            self.rrset_url(&rrset.zone_id, &rrset.name, rrset.record_type),
            action
        )
    }

    fn request_error(&self, context: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::transport(context, err)
        }
    }

    /// Send an authenticated request
    ///
    /// Returns the response for any status; callers decide which statuses
    /// are acceptable.
    async fn send(&self, request: reqwest::RequestBuilder, context: &str) -> Result<reqwest::Response> {
        request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| self.request_error(context, e))
    }

    /// Decode a success body, or turn a failure status into `UpstreamStatus`
    async fn decode<T: DeserializeOwned>(&self, response: reqwest::Response, context: &str) -> Result<T> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(context, e))?;

        if !status.is_success() {
            return Err(api_error(status, &body, context));
        }

        Ok(serde_json::from_slice(&body)?)
    }

    async fn post_action<B: Serialize>(&self, rrset: &RRSet, action: &str, body: &B) -> Result<()> {
        let context = format!("{action} {}/{}", rrset.name, rrset.record_type);
        debug!(zone_id = %rrset.zone_id, record = %rrset.name, record_type = %rrset.record_type, action, "POST rrset action");

        let response = self
            .send(self.client.post(self.action_url(rrset, action)).json(body), &context)
            .await?;
        let status = response.status();
        let ActionResponse { action: result } = self.decode(response, &context).await?;

        if result.status == "error" {
            let message = result
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| "action failed".to_string());
            return Err(Error::upstream(
                status.as_u16(),
                format!("{context}: {} {message}", result.command),
            ));
        }

        Ok(())
    }
}

/// Map a failure response to `UpstreamStatus`, keeping the API's own message
fn api_error(status: StatusCode, body: &[u8], context: &str) -> Error {
    let detail = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) if !error.message.is_empty() => {
            format!("{} ({})", error.message, error.code)
        }
        _ => match status.as_u16() {
            401 | 403 => "authentication failed: invalid API token or insufficient permissions"
                .to_string(),
            429 => "rate limit exceeded".to_string(),
            _ => status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        },
    };
    Error::upstream(status.as_u16(), format!("{context}: {detail}"))
}

#[async_trait]
impl ZoneProvider for HetznerProvider {
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        let context = format!("get zone {name}");
        debug!(zone = name, "GET zones");

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", name)]);
        let response = self.send(request, &context).await?;
        let zones: ZonesResponse = self.decode(response, &context).await?;

        Ok(zones.zones.into_iter().next().map(Zone::from))
    }

    async fn get_rrset(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RRSet>> {
        let context = format!("get rrset {name}/{record_type}");
        debug!(zone = %zone.name, record = name, record_type = %record_type, "GET rrset");

        let response = self
            .send(self.client.get(self.rrset_url(&zone.id, name, record_type)), &context)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: RRSetResponse = self.decode(response, &context).await?;
        Ok(Some(body.rrset.into_rrset(&zone.id)))
    }

    async fn create_rrset(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        ttl: Option<u32>,
        values: &[String],
    ) -> Result<RRSet> {
        let context = format!("create rrset {name}/{record_type}");
        debug!(zone = %zone.name, record = name, record_type = %record_type, ttl = ?ttl, "POST rrset");

        let body = CreateRRSetRequest {
            name,
            record_type,
            ttl,
            records: wire::records(values),
        };
        let request = self
            .client
            .post(format!("{}/zones/{}/rrsets", self.base_url, zone.id))
            .json(&body);
        let response = self.send(request, &context).await?;
        let created: RRSetResponse = self.decode(response, &context).await?;

        Ok(created.rrset.into_rrset(&zone.id))
    }

    async fn add_records(&self, rrset: &RRSet, values: &[String], ttl: Option<u32>) -> Result<RRSet> {
        let body = AddRecordsRequest {
            ttl,
            records: wire::records(values),
        };
        self.post_action(rrset, "add_records", &body).await?;

        // The TTL stays as last read; whether the API applied `ttl` to an
        // existing set is not reported, so TTL reconciliation checks it.
        let mut updated = rrset.clone();
        for value in values {
            if !updated.contains(value) {
                updated.values.push(value.clone());
            }
        }
        Ok(updated)
    }

    async fn set_records(&self, rrset: &RRSet, values: &[String]) -> Result<RRSet> {
        let body = SetRecordsRequest {
            records: wire::records(values),
        };
        self.post_action(rrset, "set_records", &body).await?;

        Ok(RRSet {
            values: values.to_vec(),
            ..rrset.clone()
        })
    }

    async fn change_ttl(&self, rrset: &RRSet, ttl: u32) -> Result<RRSet> {
        self.post_action(rrset, "change_ttl", &ChangeTtlRequest { ttl })
            .await?;

        Ok(RRSet {
            ttl: Some(ttl),
            ..rrset.clone()
        })
    }

    fn provider_name(&self) -> &'static str {
        "hetzner"
    }
}

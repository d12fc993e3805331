//! Hetzner Cloud API v1 request and response bodies

use ddns_core::config::RecordType;
use ddns_core::traits::{RRSet, Zone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /zones?name=...`
#[derive(Debug, Deserialize)]
pub(crate) struct ZonesResponse {
    #[serde(default)]
    pub zones: Vec<ApiZone>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiZone {
    /// Numeric in the current API, tolerated as a string
    pub id: Value,
    pub name: String,
}

impl From<ApiZone> for Zone {
    fn from(zone: ApiZone) -> Self {
        let id = match zone.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Zone { id, name: zone.name }
    }
}

/// `GET /zones/{zone}/rrsets/{name}/{type}` and `POST /zones/{zone}/rrsets`
#[derive(Debug, Deserialize)]
pub(crate) struct RRSetResponse {
    pub rrset: ApiRRSet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRRSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub records: Vec<ApiRecord>,
}

impl ApiRRSet {
    pub fn into_rrset(self, zone_id: &str) -> RRSet {
        RRSet {
            zone_id: zone_id.to_string(),
            name: self.name,
            record_type: self.record_type,
            ttl: self.ttl,
            values: self.records.into_iter().map(|r| r.value).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct ApiRecord {
    pub value: String,
}

pub(crate) fn records(values: &[String]) -> Vec<ApiRecord> {
    values
        .iter()
        .map(|value| ApiRecord {
            value: value.clone(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRRSetRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    pub records: Vec<ApiRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddRecordsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    pub records: Vec<ApiRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetRecordsRequest {
    pub records: Vec<ApiRecord>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangeTtlRequest {
    pub ttl: u32,
}

/// Response of every `.../actions/*` endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct ActionResponse {
    pub action: Action,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Action {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<ActionError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

//! Configuration types for the DDNS system
//!
//! A [`DdnsConfig`] is built once at startup (see `ddnsd`) and handed to the
//! engine, which treats it as immutable for its whole lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Zones to keep in sync, processed in this order
    pub zones: Vec<ZoneConfig>,

    /// Time between the starts of two sync cycles
    #[serde(default = "default_interval")]
    pub interval: Duration,

    /// Timeout applied by the HTTP clients themselves
    #[serde(default = "default_http_timeout")]
    pub http_timeout: Duration,

    /// Deadline for every individual remote call
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Retry policy shared by every remote call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Keep extra values of multi-value record sets and append ours
    #[serde(default = "default_preserve_records")]
    pub preserve_records: bool,

    /// User-Agent sent to IP providers (blank = none)
    #[serde(default)]
    pub user_agent: String,
}

impl DdnsConfig {
    /// Create a configuration for the given zones with default settings
    pub fn new(zones: Vec<ZoneConfig>) -> Self {
        Self {
            zones,
            interval: default_interval(),
            http_timeout: default_http_timeout(),
            request_timeout: default_request_timeout(),
            retry: RetryConfig::default(),
            preserve_records: default_preserve_records(),
            user_agent: String::new(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zones.is_empty() {
            return Err(crate::Error::config("No zones configured"));
        }
        if self.interval.is_zero() {
            return Err(crate::Error::config("Interval must be greater than zero"));
        }
        if self.http_timeout.is_zero() || self.request_timeout.is_zero() {
            return Err(crate::Error::config("Timeouts must be greater than zero"));
        }

        self.retry.validate()?;
        for zone in &self.zones {
            zone.validate()?;
        }

        Ok(())
    }

    /// Total number of configured records across all zones
    pub fn record_count(&self) -> usize {
        self.zones.iter().map(|z| z.records.len()).sum()
    }
}

/// One zone and the records managed inside it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Zone name (e.g., "example.com")
    pub name: String,

    /// Record type managed for every record of this zone
    pub record_type: RecordType,

    /// URL returning the public address as plain text
    pub ip_provider_url: String,

    /// Default TTL for records that do not set their own
    #[serde(default)]
    pub ttl: Option<u32>,

    /// Records to manage, processed in this order
    pub records: Vec<RecordConfig>,
}

impl ZoneConfig {
    /// Create a zone configuration
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        ip_provider_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            ip_provider_url: ip_provider_url.into(),
            ttl: None,
            records: Vec::new(),
        }
    }

    /// Set the zone default TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Append a record
    pub fn with_record(mut self, record: RecordConfig) -> Self {
        self.records.push(record);
        self
    }

    /// Effective TTL for a record: record TTL, then zone TTL, then none
    pub fn ttl_for(&self, record: &RecordConfig) -> Option<u32> {
        record.ttl.or(self.ttl)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        if self.ip_provider_url.trim().is_empty() {
            return Err(crate::Error::config(format!(
                "Zone {} has an empty IP provider URL",
                self.name
            )));
        }
        if self.records.is_empty() {
            return Err(crate::Error::config(format!(
                "Zone {} has no records",
                self.name
            )));
        }
        if self.ttl == Some(0) {
            return Err(crate::Error::config(format!(
                "Zone {} TTL must be greater than zero",
                self.name
            )));
        }
        for record in &self.records {
            if record.name.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "Zone {} has a record with an empty name",
                    self.name
                )));
            }
            if record.ttl == Some(0) {
                return Err(crate::Error::config(format!(
                    "Record {} in zone {} has a zero TTL",
                    record.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// DNS record configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Record label relative to the zone ("@" for the apex)
    pub name: String,

    /// Per-record TTL override
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
        }
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(crate::Error::config(format!(
                "Record type must be A or AAAA, got {other:?}"
            ))),
        }
    }
}

/// Retry policy for remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per call (values below 1 behave as 1)
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay after the first failed attempt
    #[serde(default = "default_base_delay")]
    pub base_delay: Duration,

    /// Upper bound for the doubling delay
    #[serde(default = "default_max_delay")]
    pub max_delay: Duration,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.attempts == 0 {
            return Err(crate::Error::config("Retry attempts must be at least 1"));
        }
        if self.max_delay < self.base_delay {
            return Err(crate::Error::config(
                "Retry max delay must be >= retry base delay",
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_preserve_records() -> bool {
    true
}

fn default_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

// # Zone Provider Trait
//
// Defines the interface for reading and mutating record sets in a hosted
// DNS zone.
//
// ## Implementations
//
// - Hetzner Cloud DNS: `ddns-provider-hetzner` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::ZoneProvider;
// use ddns_core::config::RecordType;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* ZoneProvider implementation */;
//
//     let zone = provider.find_zone("example.com").await?.expect("zone exists");
//     match provider.get_rrset(&zone, "vpn", RecordType::A).await? {
//         Some(rrset) => println!("current values: {:?}", rrset.values),
//         None => println!("vpn/A does not exist yet"),
//     }
//
//     Ok(())
// }
// ```

use crate::config::RecordType;
use async_trait::async_trait;

/// Handle to a remote zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Provider-specific identifier
    pub id: String,
    /// Zone name (e.g., "example.com")
    pub name: String,
}

/// A remote record set: every value sharing one (zone, name, type)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RRSet {
    /// Identifier of the zone the set lives in
    pub zone_id: String,
    /// Record label relative to the zone
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// TTL in seconds, `None` when the zone default applies
    pub ttl: Option<u32>,
    /// Record values in remote order
    pub values: Vec<String>,
}

impl RRSet {
    /// Whether `value` is among the set's values (ignoring surrounding whitespace)
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.trim() == value)
    }

    /// Non-blank values, trimmed, for logging
    pub fn trimmed_values(&self) -> Vec<&str> {
        self.values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Trait for hosted zone APIs
///
/// # Trust Level: Untrusted
///
/// Zone providers are **untrusted** components with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the engine handles retry)
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (owned by `RetryExecutor`)
/// - ❌ Decide which mutation a record needs (owned by the reconciler)
/// - ❌ Cache zones or record sets between calls
/// - ❌ Spawn tasks or threads
///
/// Every method performs a single API call. Absence is expressed as
/// `Ok(None)` on the lookup methods, never as an error.
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Look up a zone by name
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>, crate::Error>;

    /// Fetch the record set for (zone, name, type), if it exists
    async fn get_rrset(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RRSet>, crate::Error>;

    /// Create a record set holding `values`
    ///
    /// `ttl = None` leaves the TTL unset so the zone default applies.
    async fn create_rrset(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        ttl: Option<u32>,
        values: &[String],
    ) -> Result<RRSet, crate::Error>;

    /// Add `values` to an existing set, keeping the current ones
    ///
    /// The returned set carries the TTL as last read; `ttl` is sent along
    /// but not assumed applied.
    async fn add_records(
        &self,
        rrset: &RRSet,
        values: &[String],
        ttl: Option<u32>,
    ) -> Result<RRSet, crate::Error>;

    /// Replace every value of an existing set with `values`
    async fn set_records(&self, rrset: &RRSet, values: &[String]) -> Result<RRSet, crate::Error>;

    /// Change the TTL of an existing set
    async fn change_ttl(&self, rrset: &RRSet, ttl: u32) -> Result<RRSet, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

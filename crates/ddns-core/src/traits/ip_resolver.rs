// # IP Resolver Trait
//
// Defines the interface for learning the caller's current public address.
//
// ## Implementations
//
// - HTTP plain-text endpoints (ipify and friends): `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.resolve("https://api.ipify.org").await?;
//     println!("public address: {ip}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public IP lookups
///
/// # Trust Level: Semi-Trusted
///
/// Resolvers talk to third-party endpoints whose answers are not trusted:
///
/// ## Allowed Capabilities
/// - ✅ Issue one request to the given URL per call
/// - ✅ Read a small, bounded amount of the response body
/// - ✅ Parse the body into an address
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by `RetryExecutor`)
/// - ❌ Cache addresses between calls (the engine memoizes per cycle only)
/// - ❌ Decide which address family a record needs (owned by the engine)
/// - ❌ Spawn tasks
///
/// A malformed body must surface as [`crate::Error::InvalidAddress`] and a
/// non-success status as [`crate::Error::UpstreamStatus`], so the engine can
/// tell the two apart.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Fetch the current public address from `provider_url`
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: the parsed address, any family
    /// - `Err(Error)`: transport, status or parse failure
    async fn resolve(&self, provider_url: &str) -> Result<IpAddr, crate::Error>;
}

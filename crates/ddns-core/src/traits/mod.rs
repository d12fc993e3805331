//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpResolver`]: Look up the current public address
//! - [`ZoneProvider`]: Read and mutate record sets in a hosted zone

pub mod ip_resolver;
pub mod zone_provider;

pub use ip_resolver::IpResolver;
pub use zone_provider::{RRSet, Zone, ZoneProvider};

//! Address-family normalization
//!
//! An IP provider may answer with any literal. Before it is written into a
//! record set the address is reduced to the family the zone manages.

use crate::config::RecordType;
use crate::error::{Error, Result};
use std::net::IpAddr;

/// Normalize `ip` for a record of type `record_type`.
///
/// - `A`: the address must have a 4-byte form. IPv4-mapped IPv6 addresses
///   (`::ffff:a.b.c.d`) are reduced to plain IPv4.
/// - `AAAA`: the address must not have a 4-byte form, so IPv4 and
///   IPv4-mapped addresses are both rejected.
pub fn normalize(record_type: RecordType, ip: IpAddr) -> Result<IpAddr> {
    match record_type {
        RecordType::A => match ip {
            IpAddr::V4(v4) => Ok(IpAddr::V4(v4)),
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).ok_or_else(|| {
                Error::validation("IP provider returned non-IPv4 address for A record")
            }),
        },
        RecordType::Aaaa => match ip {
            IpAddr::V6(v6) if v6.to_ipv4_mapped().is_none() => Ok(IpAddr::V6(v6)),
            _ => Err(Error::validation(
                "IP provider returned IPv4 address for AAAA record",
            )),
        },
    }
}

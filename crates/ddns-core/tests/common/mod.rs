//! Test doubles and common utilities for contract tests
//!
//! `FakeZoneProvider` keeps an in-memory zone store and records every call
//! made against it; `StaticIpResolver` answers per URL and counts lookups.

#![allow(dead_code)]

use ddns_core::config::{DdnsConfig, RecordConfig, RecordType, RetryConfig, ZoneConfig};
use ddns_core::error::{Error, Result};
use ddns_core::traits::{IpResolver, RRSet, Zone, ZoneProvider};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A zone-API call as observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindZone(String),
    GetRRSet {
        name: String,
    },
    Create {
        name: String,
        ttl: Option<u32>,
        values: Vec<String>,
    },
    AddRecords {
        name: String,
        values: Vec<String>,
        ttl: Option<u32>,
    },
    SetRecords {
        name: String,
        values: Vec<String>,
    },
    ChangeTtl {
        name: String,
        ttl: u32,
    },
}

impl Call {
    /// Whether the call changes remote state
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::FindZone(_) | Call::GetRRSet { .. })
    }
}

/// Operation names used for failure injection
pub const FIND_ZONE: &str = "find_zone";
pub const GET_RRSET: &str = "get_rrset";
pub const CREATE: &str = "create_rrset";
pub const ADD_RECORDS: &str = "add_records";
pub const SET_RECORDS: &str = "set_records";
pub const CHANGE_TTL: &str = "change_ttl";

#[derive(Default)]
struct ZoneState {
    zones: HashMap<String, Zone>,
    rrsets: HashMap<(String, String, RecordType), RRSet>,
    calls: Vec<Call>,
    /// Remaining injected failures per operation
    failures: HashMap<&'static str, usize>,
    /// Injected failures restricted to one record name
    record_failures: HashMap<String, usize>,
}

/// In-memory zone provider that records calls
#[derive(Clone, Default)]
pub struct FakeZoneProvider {
    state: Arc<Mutex<ZoneState>>,
}

impl FakeZoneProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone
    pub fn with_zone(self, name: &str, id: &str) -> Self {
        self.state.lock().unwrap().zones.insert(
            name.to_string(),
            Zone {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    /// Seed an existing record set
    pub fn with_rrset(
        self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
        ttl: Option<u32>,
        values: &[&str],
    ) -> Self {
        self.state.lock().unwrap().rrsets.insert(
            (zone_id.to_string(), name.to_string(), record_type),
            RRSet {
                zone_id: zone_id.to_string(),
                name: name.to_string(),
                record_type,
                ttl,
                values: values.iter().map(|v| v.to_string()).collect(),
            },
        );
        self
    }

    /// Make the next `times` calls of `op` fail with a 503
    pub fn fail(&self, op: &'static str, times: usize) {
        self.state.lock().unwrap().failures.insert(op, times);
    }

    /// Make the next `times` record-set calls for `name` fail with a 503
    pub fn fail_record(&self, name: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .record_failures
            .insert(name.to_string(), times);
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the calls that changed remote state
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    /// Number of calls matching `pred`
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Current remote record set
    pub fn rrset(&self, zone_id: &str, name: &str, record_type: RecordType) -> Option<RRSet> {
        self.state
            .lock()
            .unwrap()
            .rrsets
            .get(&(zone_id.to_string(), name.to_string(), record_type))
            .cloned()
    }

    fn begin(&self, op: &'static str, record: Option<&str>, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);

        if let Some(remaining) = state.failures.get_mut(op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::upstream(503, format!("injected {op} failure")));
            }
        }
        if let Some(name) = record {
            if let Some(remaining) = state.record_failures.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(Error::upstream(503, format!("injected failure for {name}")));
                }
            }
        }
        Ok(())
    }

    fn update(&self, rrset: &RRSet, apply: impl FnOnce(&mut RRSet)) -> Result<RRSet> {
        let mut state = self.state.lock().unwrap();
        let key = (rrset.zone_id.clone(), rrset.name.clone(), rrset.record_type);
        let stored = state
            .rrsets
            .get_mut(&key)
            .ok_or_else(|| Error::upstream(404, "rrset not found"))?;
        apply(stored);
        Ok(stored.clone())
    }
}

#[async_trait::async_trait]
impl ZoneProvider for FakeZoneProvider {
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        self.begin(FIND_ZONE, None, Call::FindZone(name.to_string()))?;
        Ok(self.state.lock().unwrap().zones.get(name).cloned())
    }

    async fn get_rrset(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RRSet>> {
        self.begin(
            GET_RRSET,
            Some(name),
            Call::GetRRSet {
                name: name.to_string(),
            },
        )?;
        Ok(self.rrset(&zone.id, name, record_type))
    }

    async fn create_rrset(
        &self,
        zone: &Zone,
        name: &str,
        record_type: RecordType,
        ttl: Option<u32>,
        values: &[String],
    ) -> Result<RRSet> {
        self.begin(
            CREATE,
            Some(name),
            Call::Create {
                name: name.to_string(),
                ttl,
                values: values.to_vec(),
            },
        )?;
        let rrset = RRSet {
            zone_id: zone.id.clone(),
            name: name.to_string(),
            record_type,
            ttl,
            values: values.to_vec(),
        };
        self.state.lock().unwrap().rrsets.insert(
            (zone.id.clone(), name.to_string(), record_type),
            rrset.clone(),
        );
        Ok(rrset)
    }

    async fn add_records(&self, rrset: &RRSet, values: &[String], ttl: Option<u32>) -> Result<RRSet> {
        self.begin(
            ADD_RECORDS,
            Some(&rrset.name),
            Call::AddRecords {
                name: rrset.name.clone(),
                values: values.to_vec(),
                ttl,
            },
        )?;
        // An existing set keeps its TTL; only `change_ttl` updates it.
        self.update(rrset, |stored| stored.values.extend(values.iter().cloned()))
    }

    async fn set_records(&self, rrset: &RRSet, values: &[String]) -> Result<RRSet> {
        self.begin(
            SET_RECORDS,
            Some(&rrset.name),
            Call::SetRecords {
                name: rrset.name.clone(),
                values: values.to_vec(),
            },
        )?;
        self.update(rrset, |stored| stored.values = values.to_vec())
    }

    async fn change_ttl(&self, rrset: &RRSet, ttl: u32) -> Result<RRSet> {
        self.begin(
            CHANGE_TTL,
            Some(&rrset.name),
            Call::ChangeTtl {
                name: rrset.name.clone(),
                ttl,
            },
        )?;
        self.update(rrset, |stored| stored.ttl = Some(ttl))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// What the resolver answers for a URL
#[derive(Debug, Clone)]
pub enum Answer {
    Ip(IpAddr),
    /// Upstream status failure (retryable)
    Unavailable,
    /// Body that is not an address (not retryable)
    Garbage,
}

#[derive(Default)]
struct ResolverState {
    answers: HashMap<String, Answer>,
    calls: HashMap<String, usize>,
}

/// IP resolver with fixed per-URL answers
#[derive(Clone, Default)]
pub struct StaticIpResolver {
    state: Arc<Mutex<ResolverState>>,
}

impl StaticIpResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `ip` for `url`
    pub fn with_ip(self, url: &str, ip: &str) -> Self {
        self.set(url, Answer::Ip(ip.parse().expect("valid test IP")));
        self
    }

    /// Change the answer for `url`
    pub fn set(&self, url: &str, answer: Answer) {
        self.state
            .lock()
            .unwrap()
            .answers
            .insert(url.to_string(), answer);
    }

    /// Number of lookups made for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl IpResolver for StaticIpResolver {
    async fn resolve(&self, provider_url: &str) -> Result<IpAddr> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(provider_url.to_string()).or_default() += 1;
        match state.answers.get(provider_url) {
            Some(Answer::Ip(ip)) => Ok(*ip),
            Some(Answer::Unavailable) => Err(Error::upstream(503, "unavailable")),
            Some(Answer::Garbage) => Err(Error::invalid_address("<html>")),
            None => Err(Error::upstream(404, "no answer configured")),
        }
    }
}

pub const IPIFY: &str = "https://api.ipify.org";
pub const IPIFY6: &str = "https://api6.ipify.org";

/// Zone config with the given records
pub fn zone(name: &str, record_type: RecordType, url: &str, records: &[&str]) -> ZoneConfig {
    records.iter().fold(
        ZoneConfig::new(name, record_type, url),
        |zone, record| zone.with_record(RecordConfig::new(*record)),
    )
}

/// Config with fast retries suitable for paused-clock tests
pub fn test_config(zones: Vec<ZoneConfig>) -> DdnsConfig {
    let mut config = DdnsConfig::new(zones);
    config.interval = Duration::from_secs(60);
    config.request_timeout = Duration::from_secs(5);
    config.retry = RetryConfig {
        attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
    };
    config
}

//! Per-cycle result aggregation

use crate::error::Error;
use crate::reconcile::{RecordAction, TtlChange};
use std::fmt;
use std::sync::Arc;

/// Where in the cycle an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The zone's IP provider could not be queried
    IpFetch,
    /// The fetched address has the wrong family for the zone
    IpValidation,
    /// The zone could not be found or looked up
    ZoneLookup,
    /// A record-set call failed
    Record,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::IpFetch => "ip fetch",
            FailureStage::IpValidation => "ip validation",
            FailureStage::ZoneLookup => "zone lookup",
            FailureStage::Record => "record",
        })
    }
}

/// A record that could not be reconciled this cycle
#[derive(Debug)]
pub struct ItemFailure {
    /// Zone name
    pub zone: String,
    /// Record name
    pub record: String,
    /// Stage that failed
    pub stage: FailureStage,
    /// The error as returned by the failing call, shared by every record of
    /// a zone that failed as a whole
    pub error: Arc<Error>,
}

/// A record that was reconciled this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordResult {
    /// Zone name
    pub zone: String,
    /// Record name
    pub record: String,
    /// Value mutation applied
    pub action: RecordAction,
    /// TTL change applied, if any
    pub ttl_change: Option<TtlChange>,
}

/// Everything that happened to the configured records in one cycle
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Records reconciled successfully, in processing order
    pub results: Vec<RecordResult>,
    /// Records that failed, in processing order
    pub failures: Vec<ItemFailure>,
}

impl SyncOutcome {
    /// Whether every configured record was reconciled
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of records reconciled successfully
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    /// Number of records that failed
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Find the failure recorded for (zone, record)
    pub fn failure(&self, zone: &str, record: &str) -> Option<&ItemFailure> {
        self.failures
            .iter()
            .find(|f| f.zone == zone && f.record == record)
    }

    /// Find the result recorded for (zone, record)
    pub fn result(&self, zone: &str, record: &str) -> Option<&RecordResult> {
        self.results
            .iter()
            .find(|r| r.zone == zone && r.record == record)
    }
}
